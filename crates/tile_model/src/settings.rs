//! Policy knobs and the frame-global budget state.

use geometry::IntSize;

use crate::priority::{PriorityBin, TreePriority};

/// Tunables shared by every layer's tilings. One instance per compositor.
#[derive(Debug, Clone)]
pub struct TileSettings {
    pub default_tile_size: IntSize,
    pub tile_border_texels: i32,
    /// Budget, in whole tiles, for the eventually rect around the viewport.
    pub max_tiles_for_interest_area: i64,
    /// Budget, in whole tiles, for the soon border around the skewport.
    pub max_tiles_for_soon_border: i64,
    pub skewport_target_time_in_seconds: f32,
    pub skewport_extrapolation_limit_in_content_pixels: i32,
    pub low_res_contents_scale_factor: f32,
    /// Floor under which the contents of any layer fit one tile.
    pub minimum_contents_scale: f32,
    /// Largest multiplicative step the raster scale may take per pinch
    /// update.
    pub max_scale_ratio_during_pinch: f32,
    /// How close the ideal scale must get to an existing tiling's scale for
    /// that tiling to be promoted instead of creating a new one.
    pub snap_to_existing_tiling_ratio: f32,
    pub scheduled_raster_task_limit: usize,
    pub create_low_res_tiling: bool,
    pub use_gpu_rasterization: bool,
}

impl Default for TileSettings {
    fn default() -> Self {
        Self {
            default_tile_size: IntSize::new(256, 256),
            tile_border_texels: 1,
            max_tiles_for_interest_area: 512,
            max_tiles_for_soon_border: 128,
            skewport_target_time_in_seconds: 1.0,
            skewport_extrapolation_limit_in_content_pixels: 2000,
            low_res_contents_scale_factor: 0.25,
            minimum_contents_scale: 0.0625,
            max_scale_ratio_during_pinch: 2.0,
            snap_to_existing_tiling_ratio: 1.2,
            scheduled_raster_task_limit: 32,
            create_low_res_tiling: true,
            use_gpu_rasterization: false,
        }
    }
}

/// Cutoff applied before any byte accounting: bins past the cutoff are never
/// scheduled no matter how much memory is free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryLimitPolicy {
    AllowNothing,
    AllowAbsoluteMinimum,
    AllowPrepaintOnly,
    #[default]
    AllowAnything,
}

impl MemoryLimitPolicy {
    pub fn allows(self, bin: PriorityBin) -> bool {
        match self {
            MemoryLimitPolicy::AllowNothing => false,
            MemoryLimitPolicy::AllowAbsoluteMinimum => bin <= PriorityBin::Now,
            MemoryLimitPolicy::AllowPrepaintOnly => bin <= PriorityBin::Soon,
            MemoryLimitPolicy::AllowAnything => true,
        }
    }
}

/// Frame-global budget read by the tile manager on every scheduling pass.
#[derive(Debug, Clone)]
pub struct GlobalTileState {
    pub soft_memory_limit_bytes: i64,
    pub hard_memory_limit_bytes: i64,
    pub num_resources_limit: usize,
    pub memory_limit_policy: MemoryLimitPolicy,
    pub tree_priority: TreePriority,
}

impl Default for GlobalTileState {
    fn default() -> Self {
        Self {
            soft_memory_limit_bytes: 128 * 1024 * 1024,
            hard_memory_limit_bytes: 192 * 1024 * 1024,
            num_resources_limit: 10_000,
            memory_limit_policy: MemoryLimitPolicy::AllowAnything,
            tree_priority: TreePriority::SamePriorityForBothTrees,
        }
    }
}
