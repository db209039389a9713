//! Cross-layer tile scheduling: the raster and eviction priority queues, the
//! raster worker contract, and the tile manager that drives both against the
//! frame-global memory budget.
//!
//! Everything here runs on the compositing thread. The only asynchrony is
//! the raster task pool behind [`RasterWorker`]; its completions come back
//! over a channel that [`TileManager::check_for_completed_tasks`] drains at
//! the start of each scheduling pass.

mod eviction_queue;
mod manager;
mod raster_queue;
mod worker;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_support;

pub use eviction_queue::EvictionQueue;
pub use manager::{ManageTilesSummary, MemoryUsage, TileEvents, TileManager};
pub use raster_queue::{RasterQueue, RasterQueueStats};
pub use tile_model::{PooledResource, ResourceKey, ResourcePool};
pub use worker::{RasterCompletion, RasterTask, RasterWorker};

#[cfg(test)]
mod tests;
