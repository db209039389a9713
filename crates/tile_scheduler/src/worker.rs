//! The raster worker contract.
//!
//! The manager pre-acquires a pooled resource for each task so memory is
//! accounted at schedule time; the worker paints into it off-thread and
//! sends it back over the completion channel. A worker may outlive the tile
//! a task was made for, in which case the completion is simply discarded and
//! the resource returns to the pool.

use crossbeam_channel::Sender;
use geometry::IntRect;
use tile_model::{LayerId, PooledResource, TileId};

/// One scheduled raster job. Everything the worker needs is captured here;
/// tasks never touch tile state directly.
#[derive(Debug)]
pub struct RasterTask {
    pub tile_id: TileId,
    pub layer_id: LayerId,
    pub content_rect: IntRect,
    pub contents_scale: f32,
    pub resource: PooledResource,
}

/// A finished raster job, reported back on the compositing thread's channel.
#[derive(Debug)]
pub struct RasterCompletion {
    pub tile_id: TileId,
    pub layer_id: LayerId,
    pub resource: PooledResource,
}

impl RasterTask {
    pub fn into_completion(self) -> RasterCompletion {
        RasterCompletion {
            tile_id: self.tile_id,
            layer_id: self.layer_id,
            resource: self.resource,
        }
    }
}

pub trait RasterWorker {
    /// Queues one task. The worker must eventually send exactly one
    /// completion for it on `completions`.
    fn schedule(&mut self, task: RasterTask, completions: &Sender<RasterCompletion>);

    /// Blocks until every queued task has sent its completion. Used by the
    /// explicit finish-everything path; never called mid-pass.
    fn finish_all(&mut self);
}
