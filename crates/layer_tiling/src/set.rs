//! The ordered collection of one layer's tilings, largest scale first.

use std::mem;
use std::rc::Rc;

use smallvec::SmallVec;

use geometry::{FloatRect, IntRect, IntSize, Region};
use tile_model::{RasterSource, TileHandle, TileResolution};

use crate::coverage::CoverageIterator;
use crate::tiling::{Tiling, TilingContext};

/// Which band of the scale-ordered tiling list to address, relative to the
/// high- and low-res tilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TilingRange {
    HigherThanHighRes,
    HighRes,
    BetweenHighAndLowRes,
    LowRes,
    LowerThanLowRes,
}

#[derive(Debug, Default)]
pub struct TilingSet {
    tilings: SmallVec<[Tiling; 4]>,
}

impl TilingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of the tiling and returns a reference to it at its
    /// sorted position.
    pub fn add_tiling(&mut self, tiling: Tiling) -> &mut Tiling {
        let scale = tiling.contents_scale();
        assert!(
            self.tiling_with_scale(scale).is_none(),
            "tiling set already has a tiling at scale {scale}"
        );
        self.tilings.push(tiling);
        self.tilings
            .sort_by(|a, b| b.contents_scale().total_cmp(&a.contents_scale()));
        self.tiling_with_scale_mut(scale)
            .unwrap_or_else(|| unreachable!())
    }

    pub fn num_tilings(&self) -> usize {
        self.tilings.len()
    }

    pub fn tiling_at(&self, index: usize) -> Option<&Tiling> {
        self.tilings.get(index)
    }

    pub fn tiling_at_mut(&mut self, index: usize) -> Option<&mut Tiling> {
        self.tilings.get_mut(index)
    }

    pub fn tiling_with_scale(&self, scale: f32) -> Option<&Tiling> {
        self.tilings.iter().find(|t| t.contents_scale() == scale)
    }

    pub fn tiling_with_scale_mut(&mut self, scale: f32) -> Option<&mut Tiling> {
        self.tilings.iter_mut().find(|t| t.contents_scale() == scale)
    }

    pub fn tilings(&self) -> impl Iterator<Item = &Tiling> {
        self.tilings.iter()
    }

    pub fn tilings_mut(&mut self) -> impl Iterator<Item = &mut Tiling> {
        self.tilings.iter_mut()
    }

    /// Drops tilings failing the predicate. Order is preserved.
    pub fn retain(&mut self, keep: impl FnMut(&Tiling) -> bool) {
        let mut keep = keep;
        self.tilings.retain(|t| keep(t));
    }

    pub fn remove_all_tilings(&mut self) {
        self.tilings.clear();
    }

    pub fn remove_all_tiles(&mut self) {
        for tiling in &mut self.tilings {
            tiling.reset();
        }
    }

    pub fn did_become_active(&mut self) {
        for tiling in &mut self.tilings {
            tiling.did_become_active();
        }
    }

    pub fn mark_all_non_ideal(&mut self) {
        for tiling in &mut self.tilings {
            tiling.set_resolution(TileResolution::NonIdealResolution);
        }
    }

    pub fn num_high_res(&self) -> usize {
        self.tilings
            .iter()
            .filter(|t| t.resolution() == TileResolution::HighResolution)
            .count()
    }

    /// Index range of the tilings in the given band. The list is sorted
    /// largest scale first, so `HigherThanHighRes` addresses the front.
    pub fn tiling_range(&self, range: TilingRange) -> std::ops::Range<usize> {
        let mut high_res = 0..0;
        let mut low_res = self.tilings.len()..self.tilings.len();
        for (i, tiling) in self.tilings.iter().enumerate() {
            match tiling.resolution() {
                TileResolution::HighResolution => high_res = i..i + 1,
                TileResolution::LowResolution => low_res = i..i + 1,
                TileResolution::NonIdealResolution => {}
            }
        }
        let range = match range {
            TilingRange::HigherThanHighRes => 0..high_res.start,
            TilingRange::HighRes => high_res.clone(),
            TilingRange::BetweenHighAndLowRes => {
                // A low-res tiling sorted before the high-res one would make
                // this band inverted; return empty in that case.
                if high_res.start <= low_res.start && high_res.end <= low_res.end {
                    high_res.end..low_res.start
                } else {
                    0..0
                }
            }
            TilingRange::LowRes => low_res.clone(),
            TilingRange::LowerThanLowRes => low_res.end..self.tilings.len(),
        };
        debug_assert!(range.start <= range.end);
        range
    }

    /// The scale of the existing tiling closest to `start_scale` when that
    /// tiling is within `snap_ratio` of it, otherwise `start_scale` itself.
    pub fn snapped_contents_scale(&self, start_scale: f32, snap_ratio: f32) -> f32 {
        let mut snapped = start_scale;
        let mut best_ratio = snap_ratio;
        for tiling in &self.tilings {
            let scale = tiling.contents_scale();
            let ratio = (scale / start_scale).max(start_scale / scale);
            if ratio < best_ratio {
                snapped = scale;
                best_ratio = ratio;
            }
        }
        snapped
    }

    pub fn gpu_memory_usage_bytes(&self) -> i64 {
        self.tilings.iter().map(Tiling::gpu_memory_usage_bytes).sum()
    }

    /// Brings this set's tilings into correspondence with `other` after a
    /// commit: drops tilings the other set no longer has or that fall below
    /// the minimum scale, updates survivors to the new recording and
    /// invalidation, and creates tilings the other set has that this one
    /// lacks. Returns whether a high-res tiling survived.
    pub fn sync_tilings(
        &mut self,
        other: &TilingSet,
        raster_source: Rc<dyn RasterSource>,
        new_layer_bounds: IntSize,
        invalidation: &Region,
        minimum_scale: f32,
        mut make_tiling: impl FnMut(f32) -> Tiling,
    ) -> bool {
        if new_layer_bounds.is_empty() {
            self.remove_all_tilings();
            return false;
        }

        self.tilings.retain(|tiling| {
            let scale = tiling.contents_scale();
            scale >= minimum_scale && other.tiling_with_scale(scale).is_some()
        });

        let mut have_high_res_tiling = false;
        for other_tiling in other.tilings() {
            let scale = other_tiling.contents_scale();
            if scale < minimum_scale {
                continue;
            }
            if other_tiling.resolution() == TileResolution::HighResolution {
                have_high_res_tiling = true;
            }
            if let Some(this_tiling) = self.tiling_with_scale_mut(scale) {
                this_tiling.set_resolution(other_tiling.resolution());
                this_tiling.update_tiles_to_current_source(
                    raster_source.clone(),
                    invalidation,
                    new_layer_bounds,
                );
                let ctx = TilingContext {
                    twin: Some(other_tiling),
                    invalidation: Some(invalidation),
                    requires_high_res_to_draw: false,
                };
                this_tiling.create_missing_tiles_in_live_tiles_rect(&ctx);
            } else {
                let mut new_tiling = make_tiling(scale);
                new_tiling.set_resolution(other_tiling.resolution());
                self.tilings.push(new_tiling);
            }
        }
        self.tilings
            .sort_by(|a, b| b.contents_scale().total_cmp(&a.contents_scale()));
        have_high_res_tiling
    }

    pub fn coverage(
        &self,
        dest_scale: f32,
        dest_rect: IntRect,
        ideal_contents_scale: f32,
    ) -> SetCoverageIterator<'_> {
        SetCoverageIterator::new(self, dest_scale, dest_rect, ideal_contents_scale)
    }
}

/// One coverage entry from a whole tiling set. A `None` tile means no tiling
/// had ready content for the rect and the caller should checkerboard it.
#[derive(Debug, Clone)]
pub struct SetCoverage {
    pub tile: Option<TileHandle>,
    pub geometry_rect: IntRect,
    pub texture_rect: FloatRect,
    pub resolution: Option<TileResolution>,
}

/// Covers a destination rect using ready tiles from as close to the ideal
/// scale as possible. Holes left by one tiling are retried against the next
/// tiling in an alternating near-ideal order; whatever is left after the last
/// tiling comes out as checkerboard entries.
pub struct SetCoverageIterator<'a> {
    set: &'a TilingSet,
    dest_scale: f32,
    ideal_tiling: isize,
    current_tiling: isize,
    tiling_iter: Option<CoverageIterator<'a>>,
    region_rects: std::vec::IntoIter<IntRect>,
    missing_region: Region,
}

impl<'a> SetCoverageIterator<'a> {
    fn new(
        set: &'a TilingSet,
        dest_scale: f32,
        dest_rect: IntRect,
        ideal_contents_scale: f32,
    ) -> Self {
        let num_tilings = set.num_tilings() as isize;
        let mut ideal_tiling = num_tilings;
        for (i, tiling) in set.tilings().enumerate() {
            if tiling.contents_scale() < ideal_contents_scale {
                ideal_tiling = (i as isize - 1).max(0);
                break;
            }
        }
        if ideal_tiling == num_tilings && ideal_tiling > 0 {
            ideal_tiling -= 1;
        }

        Self {
            set,
            dest_scale,
            ideal_tiling,
            current_tiling: -1,
            tiling_iter: None,
            region_rects: Vec::new().into_iter(),
            missing_region: Region::from_rect(dest_rect),
        }
    }

    /// Alternates outward from the ideal tiling: ideal, then each smaller
    /// scale down to the largest, then the scales below ideal in order.
    fn next_tiling(&self) -> isize {
        if self.current_tiling < 0 {
            self.ideal_tiling
        } else if self.current_tiling > self.ideal_tiling {
            self.current_tiling + 1
        } else if self.current_tiling > 0 {
            self.current_tiling - 1
        } else {
            self.ideal_tiling + 1
        }
    }
}

impl Iterator for SetCoverageIterator<'_> {
    type Item = SetCoverage;

    fn next(&mut self) -> Option<SetCoverage> {
        let num_tilings = self.set.num_tilings() as isize;
        loop {
            while let Some(cov) = self.tiling_iter.as_mut().and_then(Iterator::next) {
                let ready = cov
                    .tile
                    .as_ref()
                    .is_some_and(|tile| tile.is_ready_to_draw());
                if ready {
                    let resolution = self
                        .set
                        .tiling_at(self.current_tiling as usize)
                        .map(Tiling::resolution);
                    return Some(SetCoverage {
                        tile: cov.tile,
                        geometry_rect: cov.geometry_rect,
                        texture_rect: cov.texture_rect,
                        resolution,
                    });
                }
                self.missing_region.union_rect(cov.geometry_rect);
            }
            self.tiling_iter = None;

            let rect = match self.region_rects.next() {
                Some(rect) => rect,
                None => {
                    // This tiling's holes become the next tiling's work list.
                    self.current_tiling = self.next_tiling();
                    let mut region = mem::take(&mut self.missing_region);
                    self.region_rects = region.take_rects().into_iter();
                    match self.region_rects.next() {
                        Some(rect) => rect,
                        None => return None,
                    }
                }
            };

            if self.current_tiling >= num_tilings {
                return Some(SetCoverage {
                    tile: None,
                    geometry_rect: rect,
                    texture_rect: FloatRect::default(),
                    resolution: None,
                });
            }
            let tiling = self
                .set
                .tiling_at(self.current_tiling as usize)
                .unwrap_or_else(|| unreachable!());
            self.tiling_iter = Some(tiling.coverage(self.dest_scale, rect));
        }
    }
}
