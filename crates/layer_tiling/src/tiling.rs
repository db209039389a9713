//! One scale's tile grid for one layer on one tree.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use geometry::{IntRect, IntSize, Region, scale_size_ceil};
use tile_model::{
    LayerId, PriorityBin, RasterSource, Tile, TileFactory, TileHandle, TilePriority,
    TileResolution, TileSettings, TreePriority, WhichTree,
};
use tiling_grid::{RectExpansionCache, TilingGrid, expand_rect_equally_to_area_bounded_by};

use crate::Occlusion;
use crate::coverage::CoverageIterator;
use crate::raster_iter::TilingRasterTileIterator;

/// Per-call collaborator state a tiling cannot own: the twin tree's tiling at
/// the same scale, the pending invalidation that limits tile sharing, and
/// whether the embedder refuses to activate without high-res content.
#[derive(Debug, Clone, Copy, Default)]
pub struct TilingContext<'a> {
    pub twin: Option<&'a Tiling>,
    pub invalidation: Option<&'a Region>,
    pub requires_high_res_to_draw: bool,
}

/// Eviction buckets, least important first. Tiles are freed starting from
/// the first non-empty bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionCategory {
    Eventually,
    EventuallyAndRequiredForActivation,
    Soon,
    SoonAndRequiredForActivation,
    Now,
    NowAndRequiredForActivation,
}

pub const EVICTION_ORDER: [EvictionCategory; 6] = [
    EvictionCategory::Eventually,
    EvictionCategory::EventuallyAndRequiredForActivation,
    EvictionCategory::Soon,
    EvictionCategory::SoonAndRequiredForActivation,
    EvictionCategory::Now,
    EvictionCategory::NowAndRequiredForActivation,
];

impl EvictionCategory {
    fn index(self) -> usize {
        match self {
            EvictionCategory::Eventually => 0,
            EvictionCategory::EventuallyAndRequiredForActivation => 1,
            EvictionCategory::Soon => 2,
            EvictionCategory::SoonAndRequiredForActivation => 3,
            EvictionCategory::Now => 4,
            EvictionCategory::NowAndRequiredForActivation => 5,
        }
    }
}

#[derive(Debug, Default)]
struct EvictionCache {
    valid: bool,
    tree_priority: TreePriority,
    categories: [Vec<TileHandle>; 6],
}

#[derive(Debug)]
pub struct Tiling {
    tree: WhichTree,
    layer_id: LayerId,
    contents_scale: f32,
    layer_bounds: IntSize,
    resolution: TileResolution,
    can_require_tiles_for_activation: bool,
    raster_source: Rc<dyn RasterSource>,
    settings: Rc<TileSettings>,
    factory: Rc<TileFactory>,
    grid: TilingGrid,
    tiles: HashMap<(i32, i32), TileHandle>,
    live_tiles_rect: IntRect,

    // Finite-difference state for the skewport.
    last_impl_frame_time_in_seconds: f64,
    last_viewport_in_layer_space: IntRect,
    last_visible_rect_in_content_space: IntRect,
    content_to_screen_scale: f32,

    // Priority rects, in content space.
    current_visible_rect: IntRect,
    current_skewport_rect: IntRect,
    current_soon_border_rect: IntRect,
    current_eventually_rect: IntRect,
    has_visible_rect_tiles: bool,
    has_skewport_rect_tiles: bool,
    has_soon_border_rect_tiles: bool,
    has_eventually_rect_tiles: bool,
    current_occlusion_in_layer_space: Occlusion,

    eviction_cache: RefCell<EvictionCache>,
    soon_expansion_cache: RectExpansionCache,
    eventually_expansion_cache: RectExpansionCache,
}

impl Tiling {
    pub fn new(
        tree: WhichTree,
        layer_id: LayerId,
        contents_scale: f32,
        tile_size: IntSize,
        layer_bounds: IntSize,
        raster_source: Rc<dyn RasterSource>,
        settings: Rc<TileSettings>,
        factory: Rc<TileFactory>,
    ) -> Self {
        assert!(contents_scale > 0.0, "contents scale must be positive");
        let content_bounds = scale_size_ceil(layer_bounds, contents_scale);
        let grid = TilingGrid::new(tile_size, content_bounds, settings.tile_border_texels);
        Self {
            tree,
            layer_id,
            contents_scale,
            layer_bounds,
            resolution: TileResolution::NonIdealResolution,
            can_require_tiles_for_activation: false,
            raster_source,
            settings,
            factory,
            grid,
            tiles: HashMap::new(),
            live_tiles_rect: IntRect::default(),
            last_impl_frame_time_in_seconds: 0.0,
            last_viewport_in_layer_space: IntRect::default(),
            last_visible_rect_in_content_space: IntRect::default(),
            content_to_screen_scale: 0.0,
            current_visible_rect: IntRect::default(),
            current_skewport_rect: IntRect::default(),
            current_soon_border_rect: IntRect::default(),
            current_eventually_rect: IntRect::default(),
            has_visible_rect_tiles: false,
            has_skewport_rect_tiles: false,
            has_soon_border_rect_tiles: false,
            has_eventually_rect_tiles: false,
            current_occlusion_in_layer_space: Occlusion::default(),
            eviction_cache: RefCell::new(EvictionCache::default()),
            soon_expansion_cache: RectExpansionCache::default(),
            eventually_expansion_cache: RectExpansionCache::default(),
        }
    }

    pub fn tree(&self) -> WhichTree {
        self.tree
    }

    pub fn layer_id(&self) -> LayerId {
        self.layer_id
    }

    pub fn contents_scale(&self) -> f32 {
        self.contents_scale
    }

    pub fn layer_bounds(&self) -> IntSize {
        self.layer_bounds
    }

    pub fn tiling_size(&self) -> IntSize {
        self.grid.tiling_size()
    }

    pub fn tile_size(&self) -> IntSize {
        self.grid.max_texture_size()
    }

    pub fn live_tiles_rect(&self) -> IntRect {
        self.live_tiles_rect
    }

    pub fn resolution(&self) -> TileResolution {
        self.resolution
    }

    pub fn set_resolution(&mut self, resolution: TileResolution) {
        self.resolution = resolution;
    }

    pub fn set_can_require_tiles_for_activation(&mut self, can_require: bool) {
        self.can_require_tiles_for_activation = can_require;
    }

    pub fn grid(&self) -> &TilingGrid {
        &self.grid
    }

    pub fn raster_source(&self) -> Rc<dyn RasterSource> {
        self.raster_source.clone()
    }

    pub fn tile_at(&self, i: i32, j: i32) -> Option<TileHandle> {
        self.tiles.get(&(i, j)).cloned()
    }

    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn all_tiles(&self) -> Vec<TileHandle> {
        self.tiles.values().cloned().collect()
    }

    pub fn current_visible_rect(&self) -> IntRect {
        self.current_visible_rect
    }

    pub fn current_skewport_rect(&self) -> IntRect {
        self.current_skewport_rect
    }

    pub fn current_soon_border_rect(&self) -> IntRect {
        self.current_soon_border_rect
    }

    pub fn current_eventually_rect(&self) -> IntRect {
        self.current_eventually_rect
    }

    pub(crate) fn has_visible_rect_tiles(&self) -> bool {
        self.has_visible_rect_tiles
    }

    pub(crate) fn has_skewport_rect_tiles(&self) -> bool {
        self.has_skewport_rect_tiles
    }

    pub(crate) fn has_soon_border_rect_tiles(&self) -> bool {
        self.has_soon_border_rect_tiles
    }

    pub(crate) fn has_eventually_rect_tiles(&self) -> bool {
        self.has_eventually_rect_tiles
    }

    pub fn has_ever_been_updated(&self) -> bool {
        self.last_impl_frame_time_in_seconds != 0.0
    }

    pub fn needs_update_for_frame_at_time_and_viewport(
        &self,
        frame_time_in_seconds: f64,
        viewport_in_layer_space: IntRect,
    ) -> bool {
        frame_time_in_seconds != self.last_impl_frame_time_in_seconds
            || viewport_in_layer_space != self.last_viewport_in_layer_space
    }

    /// Recomputes the visible/skewport/soon-border/eventually rects and
    /// re-materializes the live-tiles rect to match. A no-op when neither the
    /// frame time nor the viewport changed since the last call.
    pub fn compute_tile_priority_rects(
        &mut self,
        viewport_in_layer_space: IntRect,
        ideal_contents_scale: f32,
        current_frame_time_in_seconds: f64,
        occlusion_in_layer_space: Occlusion,
        ctx: &TilingContext,
    ) {
        if !self.needs_update_for_frame_at_time_and_viewport(
            current_frame_time_in_seconds,
            viewport_in_layer_space,
        ) {
            return;
        }

        let visible_rect_in_content_space =
            viewport_in_layer_space.scale_to_enclosing(self.contents_scale);
        let skewport =
            self.compute_skewport(current_frame_time_in_seconds, visible_rect_in_content_space);
        debug_assert!(skewport.contains_rect(visible_rect_in_content_space));

        let tiling_rect = self.grid.tiling_rect();
        let tile_area = self.grid.max_texture_size().area();
        let soon_border_rect = expand_rect_equally_to_area_bounded_by(
            visible_rect_in_content_space,
            self.settings.max_tiles_for_soon_border * tile_area,
            tiling_rect,
            &mut self.soon_expansion_cache,
        );
        let eventually_rect = expand_rect_equally_to_area_bounded_by(
            soon_border_rect,
            self.settings.max_tiles_for_interest_area * tile_area,
            tiling_rect,
            &mut self.eventually_expansion_cache,
        );
        debug_assert!(eventually_rect.is_empty() || tiling_rect.contains_rect(eventually_rect));

        self.content_to_screen_scale = ideal_contents_scale / self.contents_scale;
        self.last_impl_frame_time_in_seconds = current_frame_time_in_seconds;
        self.last_viewport_in_layer_space = viewport_in_layer_space;
        self.last_visible_rect_in_content_space = visible_rect_in_content_space;

        self.current_visible_rect = visible_rect_in_content_space;
        self.current_skewport_rect = skewport;
        self.current_soon_border_rect = soon_border_rect;
        self.current_eventually_rect = eventually_rect;
        self.current_occlusion_in_layer_space = occlusion_in_layer_space;

        self.has_visible_rect_tiles = tiling_rect.intersects(self.current_visible_rect);
        self.has_skewport_rect_tiles = tiling_rect.intersects(self.current_skewport_rect);
        self.has_soon_border_rect_tiles = tiling_rect.intersects(self.current_soon_border_rect);
        self.has_eventually_rect_tiles = tiling_rect.intersects(self.current_eventually_rect);

        self.set_live_tiles_rect(eventually_rect, ctx, None);
        self.invalidate_eviction_cache();
    }

    /// Extrapolates the visible rect along its finite-difference velocity.
    /// The result always contains the current visible rect.
    fn compute_skewport(
        &self,
        current_frame_time_in_seconds: f64,
        visible_rect_in_content_space: IntRect,
    ) -> IntRect {
        let visible = visible_rect_in_content_space;
        if self.last_impl_frame_time_in_seconds == 0.0 {
            return visible;
        }
        let time_delta = current_frame_time_in_seconds - self.last_impl_frame_time_in_seconds;
        if time_delta == 0.0 {
            return visible;
        }
        let multiplier = f64::from(self.settings.skewport_target_time_in_seconds) / time_delta;
        let limit = i64::from(self.settings.skewport_extrapolation_limit_in_content_pixels);
        let old = self.last_visible_rect_in_content_space;

        let extrapolate =
            |new: i32, old: i32| i64::from(new) + (f64::from(new - old) * multiplier) as i64;
        let new_x = extrapolate(visible.x, old.x).max(i64::from(visible.x) - limit);
        let new_y = extrapolate(visible.y, old.y).max(i64::from(visible.y) - limit);
        let new_right =
            extrapolate(visible.right(), old.right()).min(i64::from(visible.right()) + limit);
        let new_bottom =
            extrapolate(visible.bottom(), old.bottom()).min(i64::from(visible.bottom()) + limit);

        IntRect::from_edges(
            new_x as i32,
            new_y as i32,
            new_right as i32,
            new_bottom as i32,
        )
        .union(visible)
    }

    /// Grows or shrinks the materialized tile region. Tiles leaving the rect
    /// are dropped, or handed to `recycle` when it can legally hold them;
    /// cells entering the rect get tiles, shared with the twin where the
    /// pending invalidation allows.
    pub fn set_live_tiles_rect(
        &mut self,
        new_live_tiles_rect: IntRect,
        ctx: &TilingContext,
        mut recycle: Option<&mut Tiling>,
    ) {
        debug_assert!(
            new_live_tiles_rect.is_empty()
                || self.grid.tiling_rect().contains_rect(new_live_tiles_rect)
        );
        if self.live_tiles_rect == new_live_tiles_rect {
            return;
        }

        let old_box = self.grid.index_box(self.live_tiles_rect);
        let new_box = self.grid.index_box(new_live_tiles_rect);

        for (i, j) in self.grid.index_iter(self.live_tiles_rect, false) {
            if new_box.is_none_or(|b| !b.contains(i, j)) {
                self.remove_tile_at(i, j, recycle.as_deref_mut());
            }
        }
        for (i, j) in self.grid.index_iter(new_live_tiles_rect, false) {
            if old_box.is_none_or(|b| !b.contains(i, j)) {
                self.create_tile(i, j, ctx);
            }
        }

        self.live_tiles_rect = new_live_tiles_rect;
        self.invalidate_eviction_cache();
        self.verify_live_tiles_rect();
    }

    /// Fills any holes in the live-tiles rect, sharing with the twin where
    /// possible. Used after a post-commit sync re-applies invalidation.
    pub fn create_missing_tiles_in_live_tiles_rect(&mut self, ctx: &TilingContext) {
        for (i, j) in self.grid.index_iter(self.live_tiles_rect, false) {
            if !self.tiles.contains_key(&(i, j)) {
                self.create_tile(i, j, ctx);
            }
        }
        self.invalidate_eviction_cache();
    }

    /// Swaps in a new recording: applies the invalidation (destroy and
    /// recreate, breaking sharing), resizes the grid when the layer bounds
    /// changed, and repoints every surviving tile at the new source.
    pub fn update_tiles_to_current_source(
        &mut self,
        raster_source: Rc<dyn RasterSource>,
        layer_invalidation: &Region,
        new_layer_bounds: IntSize,
    ) {
        assert!(!new_layer_bounds.is_empty(), "tiling cannot cover an empty layer");
        let content_bounds = scale_size_ceil(new_layer_bounds, self.contents_scale);
        if self.layer_bounds != new_layer_bounds {
            self.layer_bounds = new_layer_bounds;
            // Drop tiles outside the new bounds using the old grid, then
            // resize.
            let clipped = self
                .live_tiles_rect
                .intersection(IntRect::from_size(content_bounds));
            self.set_live_tiles_rect(clipped, &TilingContext::default(), None);
            self.grid.set_tiling_size(content_bounds);
        }
        self.invalidate(layer_invalidation);
        self.raster_source = raster_source.clone();
        for tile in self.tiles.values() {
            tile.set_raster_source(raster_source.clone());
        }
        self.invalidate_eviction_cache();
        self.verify_live_tiles_rect();
    }

    fn invalidate(&mut self, layer_invalidation: &Region) {
        let mut recreate = Vec::new();
        for layer_rect in layer_invalidation.rects() {
            let content_rect = layer_rect.scale_to_enclosing(self.contents_scale);
            if content_rect.is_empty() {
                continue;
            }
            for (i, j) in self.grid.index_iter(content_rect, true) {
                if self.remove_tile_at(i, j, None) {
                    recreate.push((i, j));
                }
            }
        }
        // Recreate without a twin so the new tiles are never shared.
        for (i, j) in recreate {
            self.create_tile(i, j, &TilingContext::default());
        }
        self.invalidate_eviction_cache();
    }

    fn create_tile(&mut self, i: i32, j: i32, ctx: &TilingContext) -> Option<TileHandle> {
        debug_assert!(!self.tiles.contains_key(&(i, j)));
        let paint_rect = self.grid.tile_bounds_with_border(i, j);
        let texture_size = self.grid.max_texture_size();
        let content_rect = IntRect::new(
            paint_rect.x,
            paint_rect.y,
            texture_size.width,
            texture_size.height,
        );

        // Check the twin for a tile we can share outright.
        if let Some(twin) = ctx.twin {
            if twin.grid.max_texture_size() == texture_size {
                if let Some(candidate) = twin.tile_at(i, j) {
                    let layer_rect = paint_rect.scale_to_enclosing(1.0 / self.contents_scale);
                    let invalidated = ctx
                        .invalidation
                        .is_some_and(|region| region.intersects(layer_rect));
                    if !invalidated {
                        debug_assert!(!candidate.is_shared());
                        candidate.set_is_shared(true);
                        self.tiles.insert((i, j), candidate.clone());
                        return Some(candidate);
                    }
                }
            }
        }

        if !self.raster_source.can_raster(self.contents_scale, content_rect) {
            return None;
        }
        let tile = self.factory.create_tile(
            self.layer_id,
            self.raster_source.clone(),
            self.contents_scale,
            content_rect,
            texture_size,
            i,
            j,
        );
        self.tiles.insert((i, j), tile.clone());
        Some(tile)
    }

    fn remove_tile_at(&mut self, i: i32, j: i32, recycle: Option<&mut Tiling>) -> bool {
        let Some(tile) = self.tiles.remove(&(i, j)) else {
            return false;
        };
        // Whichever holder remains is now the sole owner.
        tile.set_is_shared(false);
        if let Some(recycle) = recycle {
            let fits = recycle.grid == self.grid
                && recycle
                    .grid
                    .index_box(recycle.live_tiles_rect)
                    .is_some_and(|b| b.contains(i, j))
                && !recycle.tiles.contains_key(&(i, j));
            if fits {
                recycle.tiles.insert((i, j), tile);
                recycle.invalidate_eviction_cache();
            }
        }
        true
    }

    /// Called when this tiling's tree is activated in place of the old
    /// active tree. Each tile's pending-tree record becomes its active-tree
    /// record, and sharing ends because the old holder is going away.
    pub fn did_become_active(&mut self) {
        self.tree = WhichTree::Active;
        for tile in self.tiles.values() {
            tile.set_priority(WhichTree::Active, tile.priority(WhichTree::Pending));
            tile.set_priority(WhichTree::Pending, TilePriority::default());
            tile.set_is_occluded(WhichTree::Active, tile.is_occluded(WhichTree::Pending));
            tile.set_is_occluded(WhichTree::Pending, false);
            tile.set_is_shared(false);
            tile.set_required_for_activation(false);
        }
        self.invalidate_eviction_cache();
    }

    /// Drops every tile but keeps the grid and priority state.
    pub fn reset(&mut self) {
        self.tiles.clear();
        self.live_tiles_rect = IntRect::default();
        self.invalidate_eviction_cache();
    }

    fn verify_live_tiles_rect(&self) {
        if !cfg!(debug_assertions) {
            return;
        }
        let index_box = self.grid.index_box(self.live_tiles_rect);
        for &(i, j) in self.tiles.keys() {
            assert!(
                index_box.is_some_and(|b| b.contains(i, j)),
                "tile ({i}, {j}) lies outside the live tiles rect {:?}",
                self.live_tiles_rect
            );
        }
    }

    pub fn is_tile_occluded(&self, tile: &Tile) -> bool {
        if !self.current_occlusion_in_layer_space.has_occlusion() {
            return false;
        }
        let query_rect = tile.content_rect().intersection(self.current_visible_rect);
        if query_rect.is_empty() {
            // Tiles outside the viewport are not considered occluded.
            return false;
        }
        let layer_rect = query_rect.scale_to_enclosing(1.0 / self.contents_scale);
        self.current_occlusion_in_layer_space.is_occluded(layer_rect)
    }

    /// Assumes the tile is visible; callers check that first.
    pub fn is_tile_required_for_activation(
        &self,
        tile: &Tile,
        twin: Option<&Tiling>,
        requires_high_res_to_draw: bool,
    ) -> bool {
        debug_assert_eq!(self.tree, WhichTree::Pending);
        if !self.can_require_tiles_for_activation {
            return false;
        }
        if self.resolution != TileResolution::HighResolution {
            return false;
        }
        if self.is_tile_occluded(tile) {
            return false;
        }
        if requires_high_res_to_draw {
            return true;
        }
        let Some(twin) = twin else {
            return true;
        };
        if twin.layer_bounds != self.layer_bounds {
            return true;
        }
        if twin.current_visible_rect != self.current_visible_rect {
            return true;
        }
        // A missing twin tile means the area may have no recording, in which
        // case nothing is lost by activating without this tile.
        let (i, j) = tile.grid_index();
        twin.tile_at(i, j).is_some()
    }

    fn update_tile_priority(
        &self,
        tile: &Tile,
        twin: Option<&Tiling>,
        requires_high_res_to_draw: bool,
    ) {
        let (i, j) = tile.grid_index();
        let tile_bounds = self.grid.tile_bounds(i, j);

        if self.current_visible_rect.intersects(tile_bounds) {
            tile.set_priority(
                self.tree,
                TilePriority::new(self.resolution, PriorityBin::Now, 0.0),
            );
            if self.tree == WhichTree::Pending {
                tile.set_required_for_activation(self.is_tile_required_for_activation(
                    tile,
                    twin,
                    requires_high_res_to_draw,
                ));
            }
            tile.set_is_occluded(self.tree, self.is_tile_occluded(tile));
            return;
        }

        debug_assert!(self.content_to_screen_scale > 0.0);
        let distance_to_visible = self
            .current_visible_rect
            .manhattan_internal_distance(tile_bounds) as f32
            * self.content_to_screen_scale;
        let bin = if self.current_skewport_rect.intersects(tile_bounds)
            || self.current_soon_border_rect.intersects(tile_bounds)
        {
            PriorityBin::Soon
        } else {
            PriorityBin::Eventually
        };
        tile.set_priority(
            self.tree,
            TilePriority::new(self.resolution, bin, distance_to_visible),
        );
        if self.tree == WhichTree::Pending {
            tile.set_required_for_activation(false);
        }
        tile.set_is_occluded(self.tree, false);
    }

    /// Refreshes both trees' priority records on the tile: this tiling's own
    /// record always, and the twin's through the twin tiling when the tile is
    /// shared, otherwise resetting the twin record to lowest priority.
    pub fn update_tile_and_twin_priority(
        &self,
        tile: &Tile,
        twin: Option<&Tiling>,
        requires_high_res_to_draw: bool,
    ) {
        self.update_tile_priority(tile, twin, requires_high_res_to_draw);
        match twin {
            Some(twin_tiling) if tile.is_shared() => {
                twin_tiling.update_tile_priority(tile, Some(self), requires_high_res_to_draw);
            }
            _ => {
                let twin_tree = self.tree.twin();
                tile.set_priority(twin_tree, TilePriority::default());
                tile.set_is_occluded(twin_tree, false);
                if twin_tree == WhichTree::Pending {
                    tile.set_required_for_activation(false);
                }
            }
        }
    }

    pub fn raster_tile_iterator<'a>(
        &'a self,
        twin: Option<&'a Tiling>,
        requires_high_res_to_draw: bool,
    ) -> TilingRasterTileIterator<'a> {
        TilingRasterTileIterator::new(self, twin, requires_high_res_to_draw)
    }

    pub fn coverage(&self, dest_scale: f32, dest_rect: IntRect) -> CoverageIterator<'_> {
        CoverageIterator::new(self, dest_scale, dest_rect)
    }

    /// Tiles holding a resource in the given eviction bucket, furthest from
    /// the viewport first. The underlying cache is rebuilt when the tree
    /// priority changes or tiles were added or removed.
    pub fn eviction_tiles(
        &self,
        tree_priority: TreePriority,
        category: EvictionCategory,
        twin: Option<&Tiling>,
        requires_high_res_to_draw: bool,
    ) -> Vec<TileHandle> {
        self.update_eviction_cache_if_needed(tree_priority, twin, requires_high_res_to_draw);
        self.eviction_cache.borrow().categories[category.index()].clone()
    }

    fn update_eviction_cache_if_needed(
        &self,
        tree_priority: TreePriority,
        twin: Option<&Tiling>,
        requires_high_res_to_draw: bool,
    ) {
        {
            let cache = self.eviction_cache.borrow();
            if cache.valid && cache.tree_priority == tree_priority {
                return;
            }
        }
        let mut categories: [Vec<TileHandle>; 6] = Default::default();
        for tile in self.tiles.values() {
            self.update_tile_and_twin_priority(tile, twin, requires_high_res_to_draw);
            let priority = tile.priority_for_tree_priority(tree_priority);
            let required = tile.required_for_activation();
            let category = match (priority.priority_bin, required) {
                (PriorityBin::Eventually, false) => EvictionCategory::Eventually,
                (PriorityBin::Eventually, true) => {
                    EvictionCategory::EventuallyAndRequiredForActivation
                }
                (PriorityBin::Soon, false) => EvictionCategory::Soon,
                (PriorityBin::Soon, true) => EvictionCategory::SoonAndRequiredForActivation,
                (PriorityBin::Now, false) => EvictionCategory::Now,
                (PriorityBin::Now, true) => EvictionCategory::NowAndRequiredForActivation,
            };
            categories[category.index()].push(tile.clone());
        }
        for bucket in &mut categories {
            bucket.sort_by(|a, b| {
                let da = a.priority_for_tree_priority(tree_priority).distance_to_visible;
                let db = b.priority_for_tree_priority(tree_priority).distance_to_visible;
                db.total_cmp(&da)
            });
        }
        *self.eviction_cache.borrow_mut() = EvictionCache {
            valid: true,
            tree_priority,
            categories,
        };
    }

    fn invalidate_eviction_cache(&self) {
        self.eviction_cache.borrow_mut().valid = false;
    }

    pub fn gpu_memory_usage_bytes(&self) -> i64 {
        self.tiles
            .values()
            .map(|tile| {
                let info = tile.draw_info();
                if info.has_resource() { tile.bytes_if_allocated() } else { 0 }
            })
            .sum()
    }
}
