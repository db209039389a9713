//! Per-layer tile management: raster scale selection, tiling lifecycle, and
//! the active/pending layer registry.
//!
//! A [`TiledLayer`] owns one tree's tiling set for one layer and runs the
//! raster-scale state machine each frame: snap to the ideal scale when
//! static, pin to the maximum animation scale while animating, step
//! multiplicatively while pinching. [`LayerCollection`] pairs each layer's
//! active and pending halves so the scheduler can walk both trees together.

mod collection;
mod inputs;
mod iterators;
mod layer;

pub use collection::{LayerCollection, LayerPair};
pub use inputs::DrawInputs;
pub use iterators::{LayerEvictionTileIterator, LayerRasterTileIterator};
pub use layer::TiledLayer;
