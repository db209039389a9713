//! Lazy index iterators over a tiling grid.

use geometry::IntRect;

use crate::TilingGrid;

/// Inclusive tile-index range on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl IndexBox {
    pub fn contains(&self, i: i32, j: i32) -> bool {
        i >= self.left && i <= self.right && j >= self.top && j <= self.bottom
    }
}

/// Row-major walk over an index box.
#[derive(Debug, Clone)]
pub struct GridIndexIterator {
    index_box: Option<IndexBox>,
    next_i: i32,
    next_j: i32,
}

impl GridIndexIterator {
    pub(crate) fn new(index_box: Option<IndexBox>) -> Self {
        let (next_i, next_j) = match index_box {
            Some(b) => (b.left, b.top),
            None => (0, 0),
        };
        Self {
            index_box,
            next_i,
            next_j,
        }
    }
}

impl Iterator for GridIndexIterator {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        let b = self.index_box?;
        if self.next_j > b.bottom {
            return None;
        }
        let current = (self.next_i, self.next_j);
        self.next_i += 1;
        if self.next_i > b.right {
            self.next_i = b.left;
            self.next_j += 1;
        }
        Some(current)
    }
}

/// Walks tile indices in expanding rings around a center rect.
///
/// Ring `r` is the perimeter of the center's index box grown by `r` on every
/// side; each ring is walked bottom edge west-to-east, east edge
/// south-to-north, top edge east-to-west, west edge north-to-south. Indices
/// outside `consider` or inside any `ignore` rect are skipped. Nothing is
/// materialized up front; each ring position is produced on demand.
///
/// Callers are expected to arrange the ignore rects so that they cover the
/// center rect; ring zero (the center box itself) is never produced.
#[derive(Debug, Clone)]
pub struct SpiralGridIterator {
    consider: Option<IndexBox>,
    ignore: [Option<IndexBox>; 2],
    center_left: i32,
    center_top: i32,
    center_right: i32,
    center_bottom: i32,
    ring: i32,
    max_ring: i32,
    step: i32,
}

impl SpiralGridIterator {
    pub(crate) fn new(
        grid: &TilingGrid,
        consider: IntRect,
        ignore: &[IntRect],
        center: IntRect,
    ) -> Self {
        assert!(ignore.len() <= 2, "at most two ignore rects are supported");
        let consider_box = grid.index_box(consider);
        let mut ignore_boxes = [None, None];
        for (slot, rect) in ignore_boxes.iter_mut().zip(ignore.iter()) {
            *slot = grid.index_box(*rect);
        }

        // The center may lie partly or fully outside the grid; extend the
        // index space past the grid edges so rings still expand outward from
        // the correct side.
        let (center_left, center_top, center_right, center_bottom) =
            unclamped_center_box(grid, center);

        let max_ring = match consider_box {
            Some(c) => [
                center_left - c.left,
                c.right - center_right,
                center_top - c.top,
                c.bottom - center_bottom,
            ]
            .into_iter()
            .max()
            .unwrap_or(0)
            .max(0),
            None => 0,
        };

        Self {
            consider: consider_box,
            ignore: ignore_boxes,
            center_left,
            center_top,
            center_right,
            center_bottom,
            ring: 1,
            max_ring,
            step: 0,
        }
    }

    fn ring_position(&self, step: i32) -> Option<(i32, i32)> {
        let left = self.center_left - self.ring;
        let top = self.center_top - self.ring;
        let right = self.center_right + self.ring;
        let bottom = self.center_bottom + self.ring;
        let w = right - left + 1;
        let h = bottom - top + 1;
        debug_assert!(w >= 3 && h >= 3);

        // Perimeter parameterization: bottom, east, top, west edges.
        let east_start = w;
        let top_start = w + (h - 1);
        let west_start = w + (h - 1) + (w - 1);
        let perimeter = 2 * w + 2 * h - 4;
        if step >= perimeter {
            return None;
        }
        let position = if step < east_start {
            (left + step, bottom)
        } else if step < top_start {
            (right, bottom - (step - east_start + 1))
        } else if step < west_start {
            (right - (step - top_start + 1), top)
        } else {
            (left, top + (step - west_start + 1))
        };
        Some(position)
    }
}

fn unclamped_center_box(grid: &TilingGrid, center: IntRect) -> (i32, i32, i32, i32) {
    if center.is_empty() || grid.num_tiles_x() == 0 || grid.num_tiles_y() == 0 {
        return (-1, -1, -1, -1);
    }
    let index_or_edge = |src: i32, limit: i32, index: fn(&TilingGrid, i32) -> i32| -> i32 {
        if src < 0 {
            -1
        } else if src >= limit {
            // One past the last valid index.
            i32::MAX
        } else {
            index(grid, src)
        }
    };
    let size = grid.tiling_size();
    let left = index_or_edge(center.x, size.width, TilingGrid::tile_x_index_from_src_coord);
    let right = index_or_edge(
        center.right() - 1,
        size.width,
        TilingGrid::tile_x_index_from_src_coord,
    );
    let top = index_or_edge(center.y, size.height, TilingGrid::tile_y_index_from_src_coord);
    let bottom = index_or_edge(
        center.bottom() - 1,
        size.height,
        TilingGrid::tile_y_index_from_src_coord,
    );
    let clamp_past_end_x = |v: i32| if v == i32::MAX { grid.num_tiles_x() } else { v };
    let clamp_past_end_y = |v: i32| if v == i32::MAX { grid.num_tiles_y() } else { v };
    (
        clamp_past_end_x(left),
        clamp_past_end_y(top),
        clamp_past_end_x(right),
        clamp_past_end_y(bottom),
    )
}

impl Iterator for SpiralGridIterator {
    type Item = (i32, i32);

    fn next(&mut self) -> Option<(i32, i32)> {
        let consider = self.consider?;
        while self.ring <= self.max_ring {
            match self.ring_position(self.step) {
                None => {
                    self.ring += 1;
                    self.step = 0;
                }
                Some((i, j)) => {
                    self.step += 1;
                    if !consider.contains(i, j) {
                        continue;
                    }
                    if self
                        .ignore
                        .iter()
                        .flatten()
                        .any(|ignore| ignore.contains(i, j))
                    {
                        continue;
                    }
                    return Some((i, j));
                }
            }
        }
        None
    }
}
