//! The cross-layer eviction priority queue.
//!
//! The mirror image of the raster queue: pops tiles holding resources across
//! every layer pair, least important first, so the manager can free memory
//! from the tiles the next frame is least likely to miss.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::rc::Rc;

use tile_model::{TileHandle, TileId, TreePriority, WhichTree};
use tiled_layer::{LayerCollection, LayerEvictionTileIterator, LayerPair};

struct PeekedLayer<'a> {
    iter: Option<LayerEvictionTileIterator<'a>>,
    peeked: Option<TileHandle>,
}

impl<'a> PeekedLayer<'a> {
    fn new(iter: Option<LayerEvictionTileIterator<'a>>) -> Self {
        let mut layer = Self { iter, peeked: None };
        layer.advance();
        layer
    }

    fn advance(&mut self) {
        self.peeked = self.iter.as_mut().and_then(Iterator::next);
    }

    fn peek(&self) -> Option<&TileHandle> {
        self.peeked.as_ref()
    }

    fn take_and_advance(&mut self) -> Option<TileHandle> {
        let tile = self.peeked.take();
        self.advance();
        tile
    }
}

struct PairedEvictionQueue<'a> {
    tree_priority: TreePriority,
    active: PeekedLayer<'a>,
    pending: PeekedLayer<'a>,
    returned_shared: Vec<TileId>,
}

impl<'a> PairedEvictionQueue<'a> {
    fn new(pair: LayerPair<'a>, tree_priority: TreePriority) -> Self {
        let active = pair
            .active
            .map(|layer| layer.eviction_tile_iterator(pair.pending, tree_priority));
        let pending = pair
            .pending
            .map(|layer| layer.eviction_tile_iterator(pair.active, tree_priority));
        Self {
            tree_priority,
            active: PeekedLayer::new(active),
            pending: PeekedLayer::new(pending),
            returned_shared: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.active.peek().is_none() && self.pending.peek().is_none()
    }

    /// Which tree gives up its next tile first: the one whose candidate is
    /// lower priority.
    fn next_tree(&self) -> Option<WhichTree> {
        let tree = match (self.active.peek(), self.pending.peek()) {
            (None, None) => return None,
            (Some(_), None) => WhichTree::Active,
            (None, Some(_)) => WhichTree::Pending,
            (Some(active_tile), Some(pending_tile)) => {
                if Rc::ptr_eq(active_tile, pending_tile) {
                    WhichTree::Active
                } else {
                    let active_priority =
                        active_tile.priority_for_tree_priority(self.tree_priority);
                    let pending_priority =
                        pending_tile.priority_for_tree_priority(self.tree_priority);
                    if pending_priority.is_higher_priority_than(&active_priority) {
                        WhichTree::Active
                    } else {
                        WhichTree::Pending
                    }
                }
            }
        };
        Some(tree)
    }

    fn side_mut(&mut self, tree: WhichTree) -> &mut PeekedLayer<'a> {
        match tree {
            WhichTree::Active => &mut self.active,
            WhichTree::Pending => &mut self.pending,
        }
    }

    fn top(&self) -> Option<&TileHandle> {
        match self.next_tree()? {
            WhichTree::Active => self.active.peek(),
            WhichTree::Pending => self.pending.peek(),
        }
    }

    fn pop(&mut self) -> Option<TileHandle> {
        let tree = self.next_tree()?;
        let tile = self.side_mut(tree).take_and_advance()?;
        if tile.is_shared() {
            self.returned_shared.push(tile.id());
        }
        self.skip_tiles_returned_by_twin();
        Some(tile)
    }

    fn skip_tiles_returned_by_twin(&mut self) {
        loop {
            let Some(tree) = self.next_tree() else { return };
            let id = match tree {
                WhichTree::Active => self.active.peek(),
                WhichTree::Pending => self.pending.peek(),
            }
            .map(|tile| tile.id());
            let Some(id) = id else { return };
            if !self.returned_shared.contains(&id) {
                return;
            }
            self.side_mut(tree).take_and_advance();
        }
    }
}

/// Orders two tiles for eviction. `Greater` means `a` is freed first: less
/// urgent bin, then not required for activation, then further from the
/// viewport.
pub(crate) fn eviction_order(
    a: &TileHandle,
    b: &TileHandle,
    tree_priority: TreePriority,
) -> Ordering {
    let a_priority = a.priority_for_tree_priority(tree_priority);
    let b_priority = b.priority_for_tree_priority(tree_priority);
    a_priority
        .priority_bin
        .cmp(&b_priority.priority_bin)
        .then_with(|| b.required_for_activation().cmp(&a.required_for_activation()))
        .then_with(|| {
            a_priority
                .distance_to_visible
                .total_cmp(&b_priority.distance_to_visible)
        })
}

impl Ord for PairedEvictionQueue<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.top(), other.top()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => eviction_order(a, b, self.tree_priority),
        }
    }
}

impl PartialOrd for PairedEvictionQueue<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PairedEvictionQueue<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PairedEvictionQueue<'_> {}

/// Built on demand when a scheduling pass needs to free memory; pops tiles
/// holding resources across every layer pair, least important first.
pub struct EvictionQueue<'a> {
    heap: BinaryHeap<PairedEvictionQueue<'a>>,
    returned: HashSet<TileId>,
}

impl<'a> EvictionQueue<'a> {
    pub fn new(layers: &'a LayerCollection, tree_priority: TreePriority) -> Self {
        let heap: BinaryHeap<_> = layers
            .pairs()
            .map(|pair| PairedEvictionQueue::new(pair, tree_priority))
            .collect();
        Self {
            heap,
            returned: HashSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.peek().is_none_or(PairedEvictionQueue::is_empty)
    }

    pub fn top(&self) -> Option<&TileHandle> {
        self.heap.peek().and_then(PairedEvictionQueue::top)
    }

    pub fn pop(&mut self) -> Option<TileHandle> {
        let mut pair = self.heap.pop()?;
        let tile = pair.pop();
        self.heap.push(pair);
        if let Some(tile) = &tile {
            debug_assert!(
                self.returned.insert(tile.id()),
                "eviction queue returned tile {:?} twice",
                tile.id()
            );
        }
        tile
    }
}
