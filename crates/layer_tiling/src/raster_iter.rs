//! Rasterization-order walk over one tiling's tiles that still need pixels.
//!
//! Yields visible tiles row-major first, then spirals outward through the
//! skewport, the soon border, and finally the eventually rect. Priorities on
//! each yielded tile (and its twin record) are refreshed at yield time.

use tiling_grid::{GridIndexIterator, SpiralGridIterator};

use tile_model::TileHandle;

use crate::tiling::Tiling;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Visible,
    Skewport,
    SoonBorder,
    Eventually,
    Done,
}

pub struct TilingRasterTileIterator<'a> {
    tiling: &'a Tiling,
    twin: Option<&'a Tiling>,
    requires_high_res_to_draw: bool,
    phase: Phase,
    visible: GridIndexIterator,
    spiral: Option<SpiralGridIterator>,
}

impl<'a> TilingRasterTileIterator<'a> {
    pub(crate) fn new(
        tiling: &'a Tiling,
        twin: Option<&'a Tiling>,
        requires_high_res_to_draw: bool,
    ) -> Self {
        let mut iter = Self {
            tiling,
            twin,
            requires_high_res_to_draw,
            phase: Phase::Visible,
            visible: tiling
                .grid()
                .index_iter(tiling.current_visible_rect(), false),
            spiral: None,
        };
        if !tiling.has_visible_rect_tiles() {
            iter.advance_phase();
        }
        iter
    }

    fn advance_phase(&mut self) {
        loop {
            self.phase = match self.phase {
                Phase::Visible => Phase::Skewport,
                Phase::Skewport => Phase::SoonBorder,
                Phase::SoonBorder => Phase::Eventually,
                Phase::Eventually | Phase::Done => {
                    self.phase = Phase::Done;
                    self.spiral = None;
                    return;
                }
            };
            let tiling = self.tiling;
            match self.phase {
                Phase::Skewport if tiling.has_skewport_rect_tiles() => {
                    self.spiral = Some(tiling.grid().spiral_iter(
                        tiling.current_skewport_rect(),
                        &[tiling.current_visible_rect()],
                        tiling.current_visible_rect(),
                    ));
                    return;
                }
                Phase::SoonBorder if tiling.has_soon_border_rect_tiles() => {
                    self.spiral = Some(tiling.grid().spiral_iter(
                        tiling.current_soon_border_rect(),
                        &[tiling.current_skewport_rect()],
                        tiling.current_visible_rect(),
                    ));
                    return;
                }
                Phase::Eventually if tiling.has_eventually_rect_tiles() => {
                    self.spiral = Some(tiling.grid().spiral_iter(
                        tiling.current_eventually_rect(),
                        &[tiling.current_skewport_rect()],
                        tiling.current_soon_border_rect(),
                    ));
                    return;
                }
                _ => {}
            }
        }
    }

    fn next_index(&mut self) -> Option<(i32, i32)> {
        loop {
            let index = match self.phase {
                Phase::Visible => self.visible.next(),
                Phase::Skewport | Phase::SoonBorder | Phase::Eventually => {
                    self.spiral.as_mut().and_then(Iterator::next)
                }
                Phase::Done => return None,
            };
            match index {
                Some(index) => return Some(index),
                None => self.advance_phase(),
            }
        }
    }
}

impl Iterator for TilingRasterTileIterator<'_> {
    type Item = TileHandle;

    fn next(&mut self) -> Option<TileHandle> {
        while let Some((i, j)) = self.next_index() {
            let Some(tile) = self.tiling.tile_at(i, j) else {
                continue;
            };
            if !tile.needs_raster() || self.tiling.is_tile_occluded(&tile) {
                continue;
            }
            self.tiling
                .update_tile_and_twin_priority(&tile, self.twin, self.requires_high_res_to_draw);
            return Some(tile);
        }
        None
    }
}
