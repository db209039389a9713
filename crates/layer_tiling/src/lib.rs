//! Per-layer tilings: one scale's tile grid, and the ordered set of them.
//!
//! A [`Tiling`] owns the tiles for one layer at one contents scale on one
//! tree. It computes the four priority rects each frame, materializes tiles
//! lazily inside the live-tiles rect, and shares unchanged tiles with its
//! twin-tree counterpart. A [`TilingSet`] keeps a layer's tilings ordered
//! from largest to smallest scale and tracks which carry the high- and
//! low-res tags.

mod coverage;
mod raster_iter;
mod set;
mod tiling;

pub use coverage::{CoverageIterator, TileCoverage};
pub use raster_iter::TilingRasterTileIterator;
pub use set::{SetCoverage, SetCoverageIterator, TilingRange, TilingSet};
pub use tiling::{EvictionCategory, Tiling, TilingContext, EVICTION_ORDER};

use geometry::{IntRect, Region};

/// Snapshot of what occludes this layer, in layer space, taken when priority
/// rects were last computed.
#[derive(Debug, Clone, Default)]
pub struct Occlusion {
    region: Region,
}

impl Occlusion {
    pub fn new(region: Region) -> Self {
        Self { region }
    }

    pub fn has_occlusion(&self) -> bool {
        !self.region.is_empty()
    }

    pub fn is_occluded(&self, layer_rect: IntRect) -> bool {
        self.region.contains_rect(layer_rect)
    }
}

#[cfg(test)]
mod tests;
