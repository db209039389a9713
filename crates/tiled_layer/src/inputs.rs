//! Per-frame inputs handed down from the scene graph.

use geometry::{IntRect, IntSize};
use layer_tiling::Occlusion;

/// Snapshot of everything outside this core that tile management reads in
/// one frame. Produced by the draw-properties pass of the embedder.
#[derive(Debug, Clone)]
pub struct DrawInputs {
    pub ideal_contents_scale: f32,
    pub ideal_page_scale: f32,
    pub ideal_device_scale: f32,
    /// Largest contents scale an in-flight transform animation will reach,
    /// or 0.0 when unknown.
    pub maximum_animation_contents_scale: f32,
    pub is_animating: bool,
    pub pinch_gesture_active: bool,
    pub use_gpu_rasterization: bool,
    pub viewport_rect_in_layer_space: IntRect,
    pub device_viewport_size: IntSize,
    pub frame_time_in_seconds: f64,
    pub occlusion_in_layer_space: Occlusion,
    pub requires_high_res_to_draw: bool,
    pub max_texture_size: i32,
}

impl Default for DrawInputs {
    fn default() -> Self {
        Self {
            ideal_contents_scale: 1.0,
            ideal_page_scale: 1.0,
            ideal_device_scale: 1.0,
            maximum_animation_contents_scale: 0.0,
            is_animating: false,
            pinch_gesture_active: false,
            use_gpu_rasterization: false,
            viewport_rect_in_layer_space: IntRect::new(0, 0, 1000, 1000),
            device_viewport_size: IntSize::new(1000, 1000),
            frame_time_in_seconds: 1.0,
            occlusion_in_layer_space: Occlusion::default(),
            requires_high_res_to_draw: false,
            max_texture_size: 2048,
        }
    }
}
