//! Layer-level raster and eviction orderings over a whole tiling set.

use layer_tiling::{EVICTION_ORDER, EvictionCategory, TilingRasterTileIterator, TilingRange};
use tile_model::{PriorityBin, TileHandle, TreePriority, WhichTree};

use crate::layer::TiledLayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TilingKind {
    HighRes,
    LowRes,
}

struct PeekedIterator<'a> {
    iter: Option<TilingRasterTileIterator<'a>>,
    peeked: Option<TileHandle>,
}

impl<'a> PeekedIterator<'a> {
    fn new(iter: Option<TilingRasterTileIterator<'a>>) -> Self {
        let mut peeked = Self { iter, peeked: None };
        peeked.advance();
        peeked
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

/// Yields one layer's tiles needing raster in scheduling order: NOW tiles of
/// the high- and low-res tilings (low first when low-res is prioritized),
/// then SOON and EVENTUALLY tiles of the high-res tiling.
pub struct LayerRasterTileIterator<'a> {
    stages: [(TilingKind, PriorityBin); 4],
    stage: usize,
    high_res: PeekedIterator<'a>,
    low_res: PeekedIterator<'a>,
    tree: WhichTree,
}

impl<'a> LayerRasterTileIterator<'a> {
    pub(crate) fn new(
        layer: &'a TiledLayer,
        twin: Option<&'a TiledLayer>,
        prioritize_low_res: bool,
    ) -> Self {
        let requires_high_res = layer.requires_high_res_to_draw();
        let tiling_iter = |range: TilingRange| {
            let index = layer.tilings().tiling_range(range).next()?;
            let tiling = layer.tilings().tiling_at(index)?;
            let twin_tiling = layer.twin_tiling(twin, tiling.contents_scale());
            Some(tiling.raster_tile_iterator(twin_tiling, requires_high_res))
        };
        let high_res = PeekedIterator::new(tiling_iter(TilingRange::HighRes));
        let low_res = PeekedIterator::new(tiling_iter(TilingRange::LowRes));

        let stages = if prioritize_low_res {
            [
                (TilingKind::LowRes, PriorityBin::Now),
                (TilingKind::HighRes, PriorityBin::Now),
                (TilingKind::HighRes, PriorityBin::Soon),
                (TilingKind::HighRes, PriorityBin::Eventually),
            ]
        } else {
            [
                (TilingKind::HighRes, PriorityBin::Now),
                (TilingKind::LowRes, PriorityBin::Now),
                (TilingKind::HighRes, PriorityBin::Soon),
                (TilingKind::HighRes, PriorityBin::Eventually),
            ]
        };
        Self {
            stages,
            stage: 0,
            high_res,
            low_res,
            tree: layer.tree(),
        }
    }
}

impl Iterator for LayerRasterTileIterator<'_> {
    type Item = TileHandle;

    fn next(&mut self) -> Option<TileHandle> {
        while self.stage < self.stages.len() {
            let (kind, bin) = self.stages[self.stage];
            let iter = match kind {
                TilingKind::HighRes => &mut self.high_res,
                TilingKind::LowRes => &mut self.low_res,
            };
            // A tile more urgent than the stage still belongs to it; only a
            // less urgent one pushes the walk to the next stage.
            let matches = iter
                .peek()
                .is_some_and(|tile| tile.priority(self.tree).priority_bin <= bin);
            if matches {
                return iter.take_and_advance();
            }
            self.stage += 1;
        }
        None
    }
}

/// Scale bands in decreasing order of evictability. The high-res tiling is
/// touched last.
const RANGE_ORDER: [TilingRange; 5] = [
    TilingRange::HigherThanHighRes,
    TilingRange::LowerThanLowRes,
    TilingRange::BetweenHighAndLowRes,
    TilingRange::LowRes,
    TilingRange::HighRes,
];

/// Yields one layer's tiles holding resources, least important first: by
/// eviction category, then by scale band, then furthest from the viewport.
pub struct LayerEvictionTileIterator<'a> {
    layer: &'a TiledLayer,
    twin: Option<&'a TiledLayer>,
    tree_priority: TreePriority,
    category_index: usize,
    range_index: usize,
    tiling_offset: usize,
    current: std::vec::IntoIter<TileHandle>,
}

impl<'a> LayerEvictionTileIterator<'a> {
    pub(crate) fn new(
        layer: &'a TiledLayer,
        twin: Option<&'a TiledLayer>,
        tree_priority: TreePriority,
    ) -> Self {
        Self {
            layer,
            twin,
            tree_priority,
            category_index: 0,
            range_index: 0,
            tiling_offset: 0,
            current: Vec::new().into_iter(),
        }
    }

    fn current_category(&self) -> EvictionCategory {
        EVICTION_ORDER[self.category_index]
    }

    /// Loads the next tiling's bucket for the current category, walking the
    /// ranges and then the categories. False once everything is exhausted.
    fn advance_tiling(&mut self) -> bool {
        loop {
            if self.category_index >= EVICTION_ORDER.len() {
                return false;
            }
            if self.range_index >= RANGE_ORDER.len() {
                self.category_index += 1;
                self.range_index = 0;
                self.tiling_offset = 0;
                continue;
            }
            let range = self.layer.tilings().tiling_range(RANGE_ORDER[self.range_index]);
            let index = range.start + self.tiling_offset;
            if index >= range.end {
                self.range_index += 1;
                self.tiling_offset = 0;
                continue;
            }
            self.tiling_offset += 1;
            let tiling = self
                .layer
                .tilings()
                .tiling_at(index)
                .unwrap_or_else(|| unreachable!());
            let twin_tiling = self.layer.twin_tiling(self.twin, tiling.contents_scale());
            let tiles = tiling.eviction_tiles(
                self.tree_priority,
                self.current_category(),
                twin_tiling,
                self.layer.requires_high_res_to_draw(),
            );
            self.current = tiles.into_iter();
            return true;
        }
    }
}

impl Iterator for LayerEvictionTileIterator<'_> {
    type Item = TileHandle;

    fn next(&mut self) -> Option<TileHandle> {
        loop {
            for tile in self.current.by_ref() {
                if tile.has_resource() {
                    return Some(tile);
                }
            }
            if !self.advance_tiling() {
                return None;
            }
        }
    }
}
