//! One tree's tile state for one layer, and its raster-scale state machine.

use std::rc::Rc;

use geometry::{IntRect, IntSize, Region, scale_size_ceil};
use layer_tiling::{Tiling, TilingContext, TilingRange, TilingSet};
use tile_model::{
    LayerId, RasterSource, ResourceKey, TileDrawInfo, TileFactory, TileResolution, TileSettings,
    TreePriority, WhichTree,
};

use crate::inputs::DrawInputs;
use crate::iterators::{LayerEvictionTileIterator, LayerRasterTileIterator};

/// The per-layer manager over a [`TilingSet`]: picks the raster scale, keeps
/// the high- and low-res tilings in place, and feeds per-frame priority
/// updates down to every tiling.
#[derive(Debug)]
pub struct TiledLayer {
    id: LayerId,
    tree: WhichTree,
    bounds: IntSize,
    raster_source: Rc<dyn RasterSource>,
    invalidation: Region,
    tilings: TilingSet,
    settings: Rc<TileSettings>,
    factory: Rc<TileFactory>,
    is_mask: bool,
    draws_content: bool,
    can_require_tiles_for_activation: bool,
    requires_high_res_to_draw: bool,

    ideal_page_scale: f32,
    ideal_device_scale: f32,
    ideal_source_scale: f32,
    ideal_contents_scale: f32,

    raster_page_scale: f32,
    raster_device_scale: f32,
    raster_source_scale: f32,
    raster_contents_scale: f32,
    low_res_raster_contents_scale: f32,
    raster_source_scale_is_fixed: bool,
    was_animating: bool,

    tile_state_changes: u64,
}

impl TiledLayer {
    pub fn new(
        id: LayerId,
        tree: WhichTree,
        raster_source: Rc<dyn RasterSource>,
        settings: Rc<TileSettings>,
        factory: Rc<TileFactory>,
    ) -> Self {
        Self {
            id,
            tree,
            bounds: raster_source.size(),
            raster_source,
            invalidation: Region::new(),
            tilings: TilingSet::new(),
            settings,
            factory,
            is_mask: false,
            draws_content: true,
            can_require_tiles_for_activation: true,
            requires_high_res_to_draw: false,
            ideal_page_scale: 0.0,
            ideal_device_scale: 0.0,
            ideal_source_scale: 0.0,
            ideal_contents_scale: 0.0,
            raster_page_scale: 0.0,
            raster_device_scale: 0.0,
            raster_source_scale: 0.0,
            raster_contents_scale: 0.0,
            low_res_raster_contents_scale: 0.0,
            raster_source_scale_is_fixed: false,
            was_animating: false,
            tile_state_changes: 0,
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn tree(&self) -> WhichTree {
        self.tree
    }

    pub fn bounds(&self) -> IntSize {
        self.bounds
    }

    pub fn tilings(&self) -> &TilingSet {
        &self.tilings
    }

    pub fn tilings_mut(&mut self) -> &mut TilingSet {
        &mut self.tilings
    }

    pub fn raster_source(&self) -> Rc<dyn RasterSource> {
        self.raster_source.clone()
    }

    pub fn invalidation(&self) -> &Region {
        &self.invalidation
    }

    pub fn raster_contents_scale(&self) -> f32 {
        self.raster_contents_scale
    }

    pub fn low_res_raster_contents_scale(&self) -> f32 {
        self.low_res_raster_contents_scale
    }

    pub fn ideal_contents_scale(&self) -> f32 {
        self.ideal_contents_scale
    }

    pub fn set_is_mask(&mut self, is_mask: bool) {
        self.is_mask = is_mask;
    }

    pub fn set_draws_content(&mut self, draws_content: bool) {
        self.draws_content = draws_content;
    }

    pub fn set_can_require_tiles_for_activation(&mut self, can_require: bool) {
        self.can_require_tiles_for_activation = can_require;
    }

    pub(crate) fn requires_high_res_to_draw(&self) -> bool {
        self.requires_high_res_to_draw
    }

    /// New recorded content arriving with a commit. Bounds follow the
    /// recording; the tilings pick the change up at the next sync or update.
    pub fn update_raster_source(&mut self, raster_source: Rc<dyn RasterSource>, invalidation: Region) {
        self.bounds = raster_source.size();
        self.raster_source = raster_source;
        self.invalidation = invalidation;
    }

    fn minimum_contents_scale(&self) -> f32 {
        let setting_min = self.settings.minimum_contents_scale;
        let min_dimension = self.bounds.width.min(self.bounds.height);
        if min_dimension == 0 {
            return setting_min;
        }
        // Below this the layer has less than one content pixel per axis.
        setting_min.max(1.0 / min_dimension as f32)
    }

    pub fn can_have_tilings(&self, max_texture_size: i32) -> bool {
        if !self.draws_content || self.bounds.is_empty() {
            return false;
        }
        if self.raster_source.is_solid_color() {
            return false;
        }
        // Masks draw through a single texture; one that cannot fit has no
        // usable tiling at all.
        if self.is_mask
            && (self.bounds.width > max_texture_size || self.bounds.height > max_texture_size)
        {
            return false;
        }
        true
    }

    /// Per-frame entry point: runs the raster-scale state machine when
    /// needed, then recomputes every tiling's priority rects. `twin` is this
    /// layer's counterpart on the other tree.
    pub fn update_tiles(&mut self, inputs: &DrawInputs, twin: Option<&TiledLayer>) {
        self.requires_high_res_to_draw = inputs.requires_high_res_to_draw;
        if !self.can_have_tilings(inputs.max_texture_size) {
            self.tilings.remove_all_tilings();
            self.reset_raster_scale();
            self.was_animating = inputs.is_animating;
            return;
        }
        self.update_ideal_scales(inputs);

        if self.tilings.num_tilings() == 0 || self.should_adjust_raster_scale(inputs) {
            self.recalculate_raster_scales(inputs);
            self.add_tilings_for_raster_scale(inputs);
        }
        debug_assert!(self.tilings.num_high_res() == 1);
        self.was_animating = inputs.is_animating;

        let tree = self.tree;
        let can_require = self.can_require_tiles_for_activation;
        let ideal_contents_scale = self.ideal_contents_scale;
        let own_invalidation = &self.invalidation;
        for tiling in self.tilings.tilings_mut() {
            tiling.set_can_require_tiles_for_activation(can_require);
            let twin_tiling =
                twin.and_then(|layer| layer.tilings.tiling_with_scale(tiling.contents_scale()));
            let invalidation = match tree {
                WhichTree::Pending => Some(own_invalidation),
                WhichTree::Active => twin.map(|layer| &layer.invalidation),
            };
            let ctx = TilingContext {
                twin: twin_tiling,
                invalidation,
                requires_high_res_to_draw: inputs.requires_high_res_to_draw,
            };
            tiling.compute_tile_priority_rects(
                inputs.viewport_rect_in_layer_space,
                ideal_contents_scale,
                inputs.frame_time_in_seconds,
                inputs.occlusion_in_layer_space.clone(),
                &ctx,
            );
        }
    }

    fn update_ideal_scales(&mut self, inputs: &DrawInputs) {
        let min_contents_scale = self.minimum_contents_scale();
        debug_assert!(min_contents_scale > 0.0);
        self.ideal_device_scale = inputs.ideal_device_scale;
        self.ideal_page_scale = inputs.ideal_page_scale;
        self.ideal_contents_scale = inputs.ideal_contents_scale.max(min_contents_scale);
        self.ideal_source_scale =
            self.ideal_contents_scale / self.ideal_page_scale / self.ideal_device_scale;
    }

    fn reset_raster_scale(&mut self) {
        self.raster_page_scale = 0.0;
        self.raster_device_scale = 0.0;
        self.raster_source_scale = 0.0;
        self.raster_contents_scale = 0.0;
        self.low_res_raster_contents_scale = 0.0;
        self.raster_source_scale_is_fixed = false;
    }

    fn should_adjust_raster_scale(&self, inputs: &DrawInputs) -> bool {
        if self.was_animating != inputs.is_animating {
            return true;
        }

        if inputs.is_animating
            && self.raster_contents_scale != self.ideal_contents_scale
            && inputs.use_gpu_rasterization
        {
            return true;
        }

        if inputs.pinch_gesture_active && self.raster_page_scale > 0.0 {
            // Zooming out needs a lower-res tiling ready; zooming in tracks
            // the ideal in bounded multiplicative steps.
            let ratio = self.ideal_page_scale / self.raster_page_scale;
            if self.raster_page_scale > self.ideal_page_scale
                || ratio > self.settings.max_scale_ratio_during_pinch
            {
                return true;
            }
        } else if !inputs.pinch_gesture_active && self.raster_page_scale != self.ideal_page_scale {
            return true;
        }

        if self.raster_device_scale != self.ideal_device_scale {
            return true;
        }

        if !inputs.is_animating
            && !self.raster_source_scale_is_fixed
            && self.raster_source_scale != self.ideal_source_scale
        {
            return true;
        }

        false
    }

    fn recalculate_raster_scales(&mut self, inputs: &DrawInputs) {
        let old_raster_contents_scale = self.raster_contents_scale;
        let old_raster_page_scale = self.raster_page_scale;
        let old_raster_source_scale = self.raster_source_scale;

        self.raster_device_scale = self.ideal_device_scale;
        self.raster_page_scale = self.ideal_page_scale;
        self.raster_source_scale = self.ideal_source_scale;
        self.raster_contents_scale = self.ideal_contents_scale;

        // A source-scale change before the first high-res tiling exists is
        // transient churn; pin the source scale at 1.0 until content is up.
        if !inputs.is_animating
            && !self.was_animating
            && self.raster_source_scale != old_raster_source_scale
        {
            self.raster_source_scale_is_fixed = self.tilings.num_high_res() == 0;
        }
        if self.raster_source_scale_is_fixed {
            self.raster_contents_scale /= self.raster_source_scale;
            self.raster_source_scale = 1.0;
        }

        // During a pinch the ideal is ignored; step multiplicatively from
        // the previous raster scale and snap to an existing tiling.
        if inputs.pinch_gesture_active && old_raster_contents_scale > 0.0 {
            let zooming_out = old_raster_page_scale > self.ideal_page_scale;
            let step = self.settings.max_scale_ratio_during_pinch;
            let desired_contents_scale = if zooming_out {
                old_raster_contents_scale / step
            } else {
                old_raster_contents_scale * step
            };
            self.raster_contents_scale = self.tilings.snapped_contents_scale(
                desired_contents_scale,
                self.settings.snap_to_existing_tiling_ratio,
            );
            self.raster_page_scale =
                self.raster_contents_scale / self.raster_device_scale / self.raster_source_scale;
        }

        self.raster_contents_scale =
            self.raster_contents_scale.max(self.minimum_contents_scale());

        // While animating on a CPU-bound rasterizer, pin to the animation's
        // maximum scale when known and affordable, else to page x device.
        if inputs.is_animating && !inputs.use_gpu_rasterization {
            let maximum_scale = inputs.maximum_animation_contents_scale;
            let can_raster_at_maximum = maximum_scale > 0.0 && {
                let bounds_at_maximum = scale_size_ceil(self.bounds, maximum_scale);
                bounds_at_maximum.area() <= inputs.device_viewport_size.area()
            };
            self.raster_contents_scale = if can_raster_at_maximum {
                maximum_scale
            } else {
                self.ideal_page_scale * self.ideal_device_scale
            };
        }

        // No low-res tiling when one tile already covers the layer.
        let raster_bounds = scale_size_ceil(self.bounds, self.raster_contents_scale);
        let tile_size = self.tile_size_for_content_bounds(raster_bounds);
        let tile_covers_bounds =
            tile_size.width >= raster_bounds.width && tile_size.height >= raster_bounds.height;
        if tile_size.is_empty() || tile_covers_bounds {
            self.low_res_raster_contents_scale = self.raster_contents_scale;
        } else {
            self.low_res_raster_contents_scale = (self.raster_contents_scale
                * self.settings.low_res_contents_scale_factor)
                .max(self.minimum_contents_scale());
        }
    }

    fn tile_size_for_content_bounds(&self, content_bounds: IntSize) -> IntSize {
        if self.is_mask {
            content_bounds
        } else {
            self.settings.default_tile_size
        }
    }

    fn add_tilings_for_raster_scale(&mut self, inputs: &DrawInputs) {
        self.tilings.mark_all_non_ideal();

        let high_scale = self.raster_contents_scale;
        if self.tilings.tiling_with_scale(high_scale).is_none() {
            self.add_tiling(high_scale);
        }

        let low_scale = self.low_res_raster_contents_scale;
        // Low-res creation waits for a static transform; promoting an
        // existing tiling is still allowed during pinch or animation.
        let wants_low_res = self.settings.create_low_res_tiling
            && !self.is_mask
            && !inputs.pinch_gesture_active
            && !inputs.is_animating
            && low_scale != high_scale;
        if wants_low_res && self.tilings.tiling_with_scale(low_scale).is_none() {
            self.add_tiling(low_scale);
        }

        if low_scale != high_scale {
            if let Some(low) = self.tilings.tiling_with_scale_mut(low_scale) {
                low.set_resolution(TileResolution::LowResolution);
            }
        }
        if let Some(high) = self.tilings.tiling_with_scale_mut(high_scale) {
            high.set_resolution(TileResolution::HighResolution);
        }
    }

    fn add_tiling(&mut self, contents_scale: f32) -> &mut Tiling {
        let content_bounds = scale_size_ceil(self.bounds, contents_scale);
        let tiling = Tiling::new(
            self.tree,
            self.id,
            contents_scale,
            self.tile_size_for_content_bounds(content_bounds),
            self.bounds,
            self.raster_source.clone(),
            self.settings.clone(),
            self.factory.clone(),
        );
        self.tilings.add_tiling(tiling)
    }

    /// Active-tree retention pass. Keeps tilings bridging between the ideal
    /// and raster scales on either tree, the low-res tilings, and anything
    /// in `used_scales`. Returns the scales the pending twin should also
    /// drop (only its non-ideal tilings follow removals here).
    pub fn cleanup_tilings(
        &mut self,
        used_scales: &[f32],
        twin: Option<&TiledLayer>,
    ) -> Vec<f32> {
        debug_assert_eq!(self.tree, WhichTree::Active);
        if self.tilings.num_tilings() == 0 {
            return Vec::new();
        }

        let mut min_acceptable = self.raster_contents_scale.min(self.ideal_contents_scale);
        let mut max_acceptable = self.raster_contents_scale.max(self.ideal_contents_scale);
        let mut twin_low_res_scale = 0.0;
        if let Some(twin) = twin {
            min_acceptable = min_acceptable
                .min(twin.raster_contents_scale.min(twin.ideal_contents_scale));
            max_acceptable = max_acceptable
                .max(twin.raster_contents_scale.max(twin.ideal_contents_scale));
            let low_range = twin.tilings.tiling_range(TilingRange::LowRes);
            if let Some(low) = low_range.clone().next().and_then(|i| twin.tilings.tiling_at(i)) {
                twin_low_res_scale = low.contents_scale();
            }
        }

        let mut to_remove = Vec::new();
        for tiling in self.tilings.tilings() {
            let scale = tiling.contents_scale();
            if scale >= min_acceptable && scale <= max_acceptable {
                continue;
            }
            if self.settings.create_low_res_tiling
                && (tiling.resolution() == TileResolution::LowResolution
                    || scale == twin_low_res_scale)
            {
                continue;
            }
            if used_scales.contains(&scale) {
                continue;
            }
            to_remove.push(scale);
        }

        let mut twin_removals = Vec::new();
        for &scale in &to_remove {
            let twin_is_non_ideal = twin
                .and_then(|layer| layer.tilings.tiling_with_scale(scale))
                .is_some_and(|tiling| tiling.resolution() == TileResolution::NonIdealResolution);
            if twin_is_non_ideal {
                twin_removals.push(scale);
            }
            self.tilings.retain(|tiling| tiling.contents_scale() != scale);
        }
        debug_assert!(self.tilings.num_tilings() > 0);
        twin_removals
    }

    pub fn remove_tiling(&mut self, contents_scale: f32) {
        self.tilings
            .retain(|tiling| tiling.contents_scale() != contents_scale);
    }

    /// Post-commit initialization of a pending layer: adopt the active
    /// twin's scales and resolutions, re-apply this tree's invalidation, and
    /// share every tile the invalidation does not touch.
    pub fn sync_from_active(&mut self, active: &TiledLayer) {
        debug_assert_eq!(self.tree, WhichTree::Pending);
        self.raster_page_scale = active.raster_page_scale;
        self.raster_device_scale = active.raster_device_scale;
        self.raster_source_scale = active.raster_source_scale;
        self.raster_contents_scale = active.raster_contents_scale;
        self.low_res_raster_contents_scale = active.low_res_raster_contents_scale;
        self.raster_source_scale_is_fixed = active.raster_source_scale_is_fixed;

        let synced_high_res = if self.can_have_tilings(i32::MAX) {
            let tree = self.tree;
            let id = self.id;
            let bounds = self.bounds;
            let is_mask = self.is_mask;
            let source = self.raster_source.clone();
            let settings = self.settings.clone();
            let factory = self.factory.clone();
            let minimum_scale = self.minimum_contents_scale();
            self.tilings.sync_tilings(
                &active.tilings,
                source.clone(),
                bounds,
                &self.invalidation,
                minimum_scale,
                |scale| {
                    let content_bounds = scale_size_ceil(bounds, scale);
                    let tile_size = if is_mask {
                        content_bounds
                    } else {
                        settings.default_tile_size
                    };
                    Tiling::new(
                        tree,
                        id,
                        scale,
                        tile_size,
                        bounds,
                        source.clone(),
                        settings.clone(),
                        factory.clone(),
                    )
                },
            )
        } else {
            self.tilings.remove_all_tilings();
            false
        };

        // Without a surviving high-res tiling the scales are meaningless;
        // force a full recalculation at the next update.
        if !synced_high_res {
            self.reset_raster_scale();
        }
    }

    /// Flips this layer onto the active tree after its commit activates.
    pub fn did_become_active(&mut self) {
        debug_assert_eq!(self.tree, WhichTree::Pending);
        self.tree = WhichTree::Active;
        self.tilings.did_become_active();
        self.invalidation.clear();
    }

    pub fn all_tiles_required_for_activation_are_ready_to_draw(&self) -> bool {
        for tiling in self.tilings.tilings() {
            for tile in tiling.all_tiles() {
                if tile.required_for_activation() && !tile.is_ready_to_draw() {
                    return false;
                }
            }
        }
        true
    }

    /// The single texture a mask layer contributes, when its one tile is
    /// ready. `None` while raster is outstanding or the mask is oversized.
    pub fn mask_resource_key(&self) -> Option<ResourceKey> {
        debug_assert!(self.is_mask);
        let content_bounds = scale_size_ceil(self.bounds, self.raster_contents_scale);
        let content_rect = IntRect::from_size(content_bounds);
        if content_rect.is_empty() {
            return None;
        }
        let coverage = self
            .tilings
            .coverage(self.raster_contents_scale, content_rect, self.ideal_contents_scale);
        let mut key = None;
        for entry in coverage {
            let tile = entry.tile?;
            if entry.geometry_rect != content_rect {
                return None;
            }
            match &*tile.draw_info() {
                TileDrawInfo::Resource(resource) => key = Some(resource.key()),
                _ => return None,
            }
        }
        key
    }

    pub fn raster_tile_iterator<'a>(
        &'a self,
        twin: Option<&'a TiledLayer>,
        prioritize_low_res: bool,
    ) -> LayerRasterTileIterator<'a> {
        LayerRasterTileIterator::new(self, twin, prioritize_low_res)
    }

    pub fn eviction_tile_iterator<'a>(
        &'a self,
        twin: Option<&'a TiledLayer>,
        tree_priority: TreePriority,
    ) -> LayerEvictionTileIterator<'a> {
        LayerEvictionTileIterator::new(self, twin, tree_priority)
    }

    pub(crate) fn twin_tiling<'a>(&self, twin: Option<&'a TiledLayer>, scale: f32) -> Option<&'a Tiling> {
        twin.and_then(|layer| layer.tilings.tiling_with_scale(scale))
    }

    pub fn on_tile_state_changed(&mut self) {
        self.tile_state_changes += 1;
    }

    pub fn tile_state_changes(&self) -> u64 {
        self.tile_state_changes
    }

    pub fn gpu_memory_usage_bytes(&self) -> i64 {
        self.tilings.gpu_memory_usage_bytes()
    }
}
