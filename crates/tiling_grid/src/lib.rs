//! Half-open tile-grid math over a scaled content rectangle.
//!
//! A [`TilingGrid`] divides a pixel area into bordered tiles: each tile
//! repeats `border_texels` pixels of its interior neighbors so that bilinear
//! sampling at tile seams never reads outside the tile's texture. Interior
//! tile coordinates tile the area exactly; bounds-with-border overlap by one
//! border width per shared edge.

mod expand;
mod iterators;

pub use expand::{RectExpansionCache, expand_rect_equally_to_area_bounded_by};
pub use iterators::{GridIndexIterator, IndexBox, SpiralGridIterator};

use geometry::{IntRect, IntSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilingGrid {
    max_texture_size: IntSize,
    tiling_size: IntSize,
    border_texels: i32,
    num_tiles_x: i32,
    num_tiles_y: i32,
}

fn compute_num_tiles(max_texture_size: i32, total_size: i32, border_texels: i32) -> i32 {
    if max_texture_size - 2 * border_texels <= 0 {
        return if total_size > 0 && max_texture_size >= total_size {
            1
        } else {
            0
        };
    }
    let num_tiles = 1.max(1 + (total_size - 1 - 2 * border_texels) / (max_texture_size - 2 * border_texels));
    if total_size > 0 { num_tiles } else { 0 }
}

impl TilingGrid {
    pub fn new(max_texture_size: IntSize, tiling_size: IntSize, border_texels: i32) -> Self {
        assert!(border_texels >= 0, "border texel count must be non-negative");
        let mut grid = Self {
            max_texture_size,
            tiling_size,
            border_texels,
            num_tiles_x: 0,
            num_tiles_y: 0,
        };
        grid.recompute_num_tiles();
        grid
    }

    pub fn set_tiling_size(&mut self, tiling_size: IntSize) {
        self.tiling_size = tiling_size;
        self.recompute_num_tiles();
    }

    fn recompute_num_tiles(&mut self) {
        self.num_tiles_x = compute_num_tiles(
            self.max_texture_size.width,
            self.tiling_size.width,
            self.border_texels,
        );
        self.num_tiles_y = compute_num_tiles(
            self.max_texture_size.height,
            self.tiling_size.height,
            self.border_texels,
        );
    }

    pub fn max_texture_size(&self) -> IntSize {
        self.max_texture_size
    }

    pub fn tiling_size(&self) -> IntSize {
        self.tiling_size
    }

    pub fn tiling_rect(&self) -> IntRect {
        IntRect::from_size(self.tiling_size)
    }

    pub fn border_texels(&self) -> i32 {
        self.border_texels
    }

    pub fn num_tiles_x(&self) -> i32 {
        self.num_tiles_x
    }

    pub fn num_tiles_y(&self) -> i32 {
        self.num_tiles_y
    }

    pub fn has_valid_index(&self, i: i32, j: i32) -> bool {
        i >= 0 && i < self.num_tiles_x && j >= 0 && j < self.num_tiles_y
    }

    fn inner_tile_width(&self) -> i32 {
        self.max_texture_size.width - 2 * self.border_texels
    }

    fn inner_tile_height(&self) -> i32 {
        self.max_texture_size.height - 2 * self.border_texels
    }

    pub fn tile_position_x(&self, i: i32) -> i32 {
        if i == 0 {
            0
        } else {
            self.inner_tile_width() * i + self.border_texels
        }
    }

    pub fn tile_position_y(&self, j: i32) -> i32 {
        if j == 0 {
            0
        } else {
            self.inner_tile_height() * j + self.border_texels
        }
    }

    pub fn tile_size_x(&self, i: i32) -> i32 {
        if i == 0 && self.num_tiles_x == 1 {
            return self.tiling_size.width;
        }
        if i == 0 {
            return self.max_texture_size.width - self.border_texels;
        }
        if i < self.num_tiles_x - 1 {
            return self.inner_tile_width();
        }
        self.tiling_size.width - self.tile_position_x(i)
    }

    pub fn tile_size_y(&self, j: i32) -> i32 {
        if j == 0 && self.num_tiles_y == 1 {
            return self.tiling_size.height;
        }
        if j == 0 {
            return self.max_texture_size.height - self.border_texels;
        }
        if j < self.num_tiles_y - 1 {
            return self.inner_tile_height();
        }
        self.tiling_size.height - self.tile_position_y(j)
    }

    /// The tile's interior rect. Interiors tile the grid area exactly.
    pub fn tile_bounds(&self, i: i32, j: i32) -> IntRect {
        assert!(self.has_valid_index(i, j), "tile index ({i}, {j}) out of range");
        IntRect::new(
            self.tile_position_x(i),
            self.tile_position_y(j),
            self.tile_size_x(i),
            self.tile_size_y(j),
        )
    }

    /// The tile's full rect including border texels shared with interior
    /// neighbors. Edge tiles have no border on the outside of the grid.
    pub fn tile_bounds_with_border(&self, i: i32, j: i32) -> IntRect {
        let bounds = self.tile_bounds(i, j);
        if self.border_texels == 0 {
            return bounds;
        }
        let mut left = bounds.x;
        let mut top = bounds.y;
        let mut right = bounds.right();
        let mut bottom = bounds.bottom();
        if i > 0 {
            left -= self.border_texels;
        }
        if i < self.num_tiles_x - 1 {
            right += self.border_texels;
        }
        if j > 0 {
            top -= self.border_texels;
        }
        if j < self.num_tiles_y - 1 {
            bottom += self.border_texels;
        }
        IntRect::from_edges(left, top, right, bottom)
    }

    pub fn tile_x_index_from_src_coord(&self, src: i32) -> i32 {
        if self.num_tiles_x <= 1 {
            return 0;
        }
        let x = (src - self.border_texels) / self.inner_tile_width();
        x.clamp(0, self.num_tiles_x - 1)
    }

    pub fn tile_y_index_from_src_coord(&self, src: i32) -> i32 {
        if self.num_tiles_y <= 1 {
            return 0;
        }
        let y = (src - self.border_texels) / self.inner_tile_height();
        y.clamp(0, self.num_tiles_y - 1)
    }

    /// First tile index whose bounds-with-border contain `src`.
    pub fn first_border_tile_x_index_from_src_coord(&self, src: i32) -> i32 {
        if self.num_tiles_x <= 1 {
            return 0;
        }
        let x = (src - 2 * self.border_texels) / self.inner_tile_width();
        x.clamp(0, self.num_tiles_x - 1)
    }

    pub fn first_border_tile_y_index_from_src_coord(&self, src: i32) -> i32 {
        if self.num_tiles_y <= 1 {
            return 0;
        }
        let y = (src - 2 * self.border_texels) / self.inner_tile_height();
        y.clamp(0, self.num_tiles_y - 1)
    }

    /// Last tile index whose bounds-with-border contain `src`.
    pub fn last_border_tile_x_index_from_src_coord(&self, src: i32) -> i32 {
        if self.num_tiles_x <= 1 {
            return 0;
        }
        let x = src / self.inner_tile_width();
        x.clamp(0, self.num_tiles_x - 1)
    }

    pub fn last_border_tile_y_index_from_src_coord(&self, src: i32) -> i32 {
        if self.num_tiles_y <= 1 {
            return 0;
        }
        let y = src / self.inner_tile_height();
        y.clamp(0, self.num_tiles_y - 1)
    }

    /// Inclusive index range of interior tiles touching `rect`, or `None`
    /// when `rect` misses the grid entirely.
    pub fn index_box(&self, rect: IntRect) -> Option<IndexBox> {
        let rect = rect.intersection(self.tiling_rect());
        if rect.is_empty() || self.num_tiles_x == 0 || self.num_tiles_y == 0 {
            return None;
        }
        Some(IndexBox {
            left: self.tile_x_index_from_src_coord(rect.x),
            top: self.tile_y_index_from_src_coord(rect.y),
            right: self.tile_x_index_from_src_coord(rect.right() - 1),
            bottom: self.tile_y_index_from_src_coord(rect.bottom() - 1),
        })
    }

    /// Like [`index_box`](Self::index_box) but extended to tiles whose
    /// borders touch `rect`.
    pub fn index_box_with_borders(&self, rect: IntRect) -> Option<IndexBox> {
        let rect = rect.intersection(self.tiling_rect());
        if rect.is_empty() || self.num_tiles_x == 0 || self.num_tiles_y == 0 {
            return None;
        }
        Some(IndexBox {
            left: self.first_border_tile_x_index_from_src_coord(rect.x),
            top: self.first_border_tile_y_index_from_src_coord(rect.y),
            right: self.last_border_tile_x_index_from_src_coord(rect.right() - 1),
            bottom: self.last_border_tile_y_index_from_src_coord(rect.bottom() - 1),
        })
    }

    /// Row-major iteration over interior tile indices touching `rect`.
    pub fn index_iter(&self, rect: IntRect, include_borders: bool) -> GridIndexIterator {
        let index_box = if include_borders {
            self.index_box_with_borders(rect)
        } else {
            self.index_box(rect)
        };
        GridIndexIterator::new(index_box)
    }

    /// Expanding ring iteration over `consider` minus the `ignore` rects,
    /// ordered outward from `center`. See [`SpiralGridIterator`].
    pub fn spiral_iter(
        &self,
        consider: IntRect,
        ignore: &[IntRect],
        center: IntRect,
    ) -> SpiralGridIterator {
        SpiralGridIterator::new(self, consider, ignore, center)
    }
}
