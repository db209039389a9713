//! The cross-layer raster priority queue.
//!
//! One sub-queue per layer pair wraps that pair's two ordered layer
//! iterators; a binary heap across the sub-queues picks the globally most
//! urgent tile. A tile shared between the trees is returned exactly once,
//! by whichever tree the current policy prefers.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::rc::Rc;

use tile_model::{PriorityBin, TileHandle, TileId, TileResolution, TreePriority, WhichTree};
use tiled_layer::{LayerCollection, LayerPair, LayerRasterTileIterator};

/// Advisory counters for one built queue instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterQueueStats {
    pub num_pairs: usize,
    pub tiles_returned: usize,
}

struct PeekedLayer<'a> {
    iter: Option<LayerRasterTileIterator<'a>>,
    peeked: Option<TileHandle>,
}

impl<'a> PeekedLayer<'a> {
    fn new(iter: Option<LayerRasterTileIterator<'a>>) -> Self {
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

struct PairedRasterQueue<'a> {
    tree_priority: TreePriority,
    active: PeekedLayer<'a>,
    pending: PeekedLayer<'a>,
    returned_shared: Vec<TileId>,
}

impl<'a> PairedRasterQueue<'a> {
    fn new(pair: LayerPair<'a>, tree_priority: TreePriority) -> Self {
        let prioritize_low_res = tree_priority == TreePriority::SmoothnessTakesPriority;
        let active = pair
            .active
            .map(|layer| layer.raster_tile_iterator(pair.pending, prioritize_low_res));
        let pending = pair
            .pending
            .map(|layer| layer.raster_tile_iterator(pair.active, prioritize_low_res));
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

    /// Which tree the next tile comes from under the current policy.
    fn next_tree(&self) -> Option<WhichTree> {
        let tree = match (self.active.peek(), self.pending.peek()) {
            (None, None) => return None,
            (Some(_), None) => WhichTree::Active,
            (None, Some(_)) => WhichTree::Pending,
            (Some(active_tile), Some(pending_tile)) => match self.tree_priority {
                TreePriority::SmoothnessTakesPriority => {
                    // An active tree down to idle prefetch must not starve a
                    // pending tree still rastering visible content.
                    let active_bin = active_tile.priority(WhichTree::Active).priority_bin;
                    let pending_bin = pending_tile.priority(WhichTree::Pending).priority_bin;
                    if active_bin == PriorityBin::Eventually && pending_bin == PriorityBin::Now {
                        WhichTree::Pending
                    } else {
                        WhichTree::Active
                    }
                }
                TreePriority::NewContentTakesPriority => WhichTree::Pending,
                TreePriority::SamePriorityForBothTrees => {
                    if Rc::ptr_eq(active_tile, pending_tile) {
                        WhichTree::Active
                    } else {
                        let active_priority = active_tile.priority(WhichTree::Active);
                        let pending_priority = pending_tile.priority(WhichTree::Pending);
                        if pending_priority.is_higher_priority_than(&active_priority) {
                            WhichTree::Pending
                        } else {
                            WhichTree::Active
                        }
                    }
                }
            },
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

    /// The twin iterator also walks shared tiles; drop from the preferred
    /// iterator any tile this pair already returned.
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

/// Orders two tiles for raster. `Greater` means `a` rasters first.
pub(crate) fn raster_order(
    a: &TileHandle,
    b: &TileHandle,
    tree_priority: TreePriority,
) -> Ordering {
    let a_priority = a.priority_for_tree_priority(tree_priority);
    let b_priority = b.priority_for_tree_priority(tree_priority);

    // Same bin, different resolution: a non-ideal tiling always loses, and
    // between the real resolutions smoothness mode wants low-res on screen
    // fastest while every other mode wants high-res.
    if a_priority.priority_bin == b_priority.priority_bin
        && a_priority.resolution != b_priority.resolution
    {
        if a_priority.resolution == TileResolution::NonIdealResolution {
            return Ordering::Less;
        }
        if b_priority.resolution == TileResolution::NonIdealResolution {
            return Ordering::Greater;
        }
        let prefer_low_res = tree_priority == TreePriority::SmoothnessTakesPriority;
        let a_preferred = if prefer_low_res {
            a_priority.resolution == TileResolution::LowResolution
        } else {
            a_priority.resolution == TileResolution::HighResolution
        };
        return if a_preferred {
            Ordering::Greater
        } else {
            Ordering::Less
        };
    }

    if a_priority.is_higher_priority_than(&b_priority) {
        Ordering::Greater
    } else if b_priority.is_higher_priority_than(&a_priority) {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

impl Ord for PairedRasterQueue<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.top(), other.top()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => raster_order(a, b, self.tree_priority),
        }
    }
}

impl PartialOrd for PairedRasterQueue<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PairedRasterQueue<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PairedRasterQueue<'_> {}

/// Built once per scheduling pass; pops tiles needing raster across every
/// registered layer pair, most urgent first.
pub struct RasterQueue<'a> {
    heap: BinaryHeap<PairedRasterQueue<'a>>,
    stats: RasterQueueStats,
    returned: HashSet<TileId>,
}

impl<'a> RasterQueue<'a> {
    pub fn new(layers: &'a LayerCollection, tree_priority: TreePriority) -> Self {
        let heap: BinaryHeap<_> = layers
            .pairs()
            .map(|pair| PairedRasterQueue::new(pair, tree_priority))
            .collect();
        let stats = RasterQueueStats {
            num_pairs: heap.len(),
            tiles_returned: 0,
        };
        Self {
            heap,
            stats,
            returned: HashSet::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.heap.peek().is_none_or(PairedRasterQueue::is_empty)
    }

    pub fn top(&self) -> Option<&TileHandle> {
        self.heap.peek().and_then(PairedRasterQueue::top)
    }

    pub fn pop(&mut self) -> Option<TileHandle> {
        let mut pair = self.heap.pop()?;
        let tile = pair.pop();
        self.heap.push(pair);
        if let Some(tile) = &tile {
            self.stats.tiles_returned += 1;
            debug_assert!(
                self.returned.insert(tile.id()),
                "raster queue returned tile {:?} twice",
                tile.id()
            );
        }
        tile
    }

    pub fn stats(&self) -> RasterQueueStats {
        self.stats
    }
}
