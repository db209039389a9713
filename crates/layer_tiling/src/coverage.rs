//! Walks a destination-space rect and yields, per tile cell it overlaps, the
//! destination geometry that cell is responsible for. Geometry rects tile the
//! destination rect exactly, with no overlap and no gaps; cells with no tile
//! yield `None` so the caller can checkerboard them.

use geometry::{FloatRect, IntRect};
use tile_model::TileHandle;

use crate::tiling::Tiling;

/// One cell's worth of coverage in destination space.
#[derive(Debug, Clone)]
pub struct TileCoverage {
    pub tile: Option<TileHandle>,
    /// Destination-space rect this entry covers.
    pub geometry_rect: IntRect,
    /// Texel rect within the tile's texture corresponding to `geometry_rect`.
    pub texture_rect: FloatRect,
    pub index: (i32, i32),
}

pub struct CoverageIterator<'a> {
    tiling: &'a Tiling,
    dest_rect: IntRect,
    dest_to_content_scale: f32,

    left: i32,
    top: i32,
    right: i32,
    bottom: i32,
    tile_i: i32,
    tile_j: i32,
    current_geometry_rect: IntRect,
    started: bool,
    done: bool,
}

impl<'a> CoverageIterator<'a> {
    pub(crate) fn new(tiling: &'a Tiling, dest_scale: f32, dest_rect: IntRect) -> Self {
        let dest_to_content_scale = tiling.contents_scale() / dest_scale;
        let content_rect = dest_rect
            .scale_to_enclosing(dest_to_content_scale)
            .intersection(tiling.grid().tiling_rect());

        let mut iter = Self {
            tiling,
            dest_rect,
            dest_to_content_scale,
            left: 0,
            top: 0,
            right: -1,
            bottom: -1,
            tile_i: 0,
            tile_j: 0,
            current_geometry_rect: IntRect::default(),
            started: false,
            done: content_rect.is_empty(),
        };
        if iter.done {
            return iter;
        }

        let grid = tiling.grid();
        iter.left = grid.tile_x_index_from_src_coord(content_rect.x);
        iter.top = grid.tile_y_index_from_src_coord(content_rect.y);
        iter.right = grid.tile_x_index_from_src_coord(content_rect.right() - 1);
        iter.bottom = grid.tile_y_index_from_src_coord(content_rect.bottom() - 1);
        iter.tile_i = iter.left - 1;
        iter.tile_j = iter.top;
        iter
    }
}

impl Iterator for CoverageIterator<'_> {
    type Item = TileCoverage;

    fn next(&mut self) -> Option<TileCoverage> {
        if self.done {
            return None;
        }

        self.tile_i += 1;
        let new_row = self.tile_i > self.right;
        if new_row {
            self.tile_i = self.left;
            self.tile_j += 1;
            if self.tile_j > self.bottom {
                self.done = true;
                return None;
            }
        }

        let content_bounds = self.tiling.grid().tile_bounds(self.tile_i, self.tile_j);
        let mut geometry_rect = content_bounds
            .scale_to_enclosing(1.0 / self.dest_to_content_scale)
            .intersection(self.dest_rect);

        // Scaling rounds outward, so neighboring cells can claim the same
        // destination pixels. Trim each cell against the previous one in its
        // row and against the row above.
        if self.started {
            let (min_left, min_top) = if new_row {
                (self.dest_rect.x, self.current_geometry_rect.bottom())
            } else {
                (self.current_geometry_rect.right(), self.current_geometry_rect.y)
            };
            let inset_left = (min_left - geometry_rect.x).max(0);
            let inset_top = (min_top - geometry_rect.y).max(0);
            geometry_rect = geometry_rect.inset(inset_left, inset_top, 0, 0);
        }
        self.started = true;
        self.current_geometry_rect = geometry_rect;
        debug_assert!(self.dest_rect.contains_rect(geometry_rect));

        let texture_origin = self
            .tiling
            .grid()
            .tile_bounds_with_border(self.tile_i, self.tile_j);
        let texture_rect = FloatRect::from_int(geometry_rect)
            .scale(self.dest_to_content_scale)
            .offset(-(texture_origin.x as f32), -(texture_origin.y as f32));

        Some(TileCoverage {
            tile: self.tiling.tile_at(self.tile_i, self.tile_j),
            geometry_rect,
            texture_rect,
            index: (self.tile_i, self.tile_j),
        })
    }
}
