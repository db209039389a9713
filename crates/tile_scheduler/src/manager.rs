//! The per-pass tile scheduler: decides which tiles get raster tasks and
//! which give their resources back, within the frame-global memory budget.

use std::rc::Rc;

use crossbeam_channel::{Receiver, Sender, unbounded};

use tile_model::{
    GlobalTileState, LayerId, PriorityBin, ResourcePool, TileDrawInfo, TileFactory, TileId,
    TileSettings,
};
use tiled_layer::LayerCollection;

use crate::eviction_queue::EvictionQueue;
use crate::raster_queue::RasterQueue;
use crate::worker::{RasterCompletion, RasterTask, RasterWorker};

/// Bytes and resource count tracked together, the two budgets a scheduling
/// pass walks against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    pub bytes: i64,
    pub resources: usize,
}

/// Advisory counters from one `manage_tiles` pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManageTilesSummary {
    pub tiles_scheduled: usize,
    pub tiles_assigned_solid_color: usize,
    pub tiles_evicted: usize,
    /// Tiles that needed raster but did not fit the applicable limit.
    pub tiles_skipped_for_memory: usize,
    /// True when a NOW or required-for-activation tile could not be
    /// scheduled even against the hard limit.
    pub out_of_memory: bool,
}

/// State transitions a pass produced, for the embedder to act on. Returned
/// rather than delivered through callbacks.
#[derive(Debug, Default)]
pub struct TileEvents {
    pub tile_state_changes: Vec<(LayerId, TileId)>,
    pub ready_to_activate: bool,
}

pub struct TileManager<W: RasterWorker> {
    settings: Rc<TileSettings>,
    factory: Rc<TileFactory>,
    resource_pool: ResourcePool,
    worker: W,
    completions_tx: Sender<RasterCompletion>,
    completions_rx: Receiver<RasterCompletion>,
    outstanding_tasks: usize,
    ready_to_activate_notified: bool,
}

impl<W: RasterWorker> TileManager<W> {
    pub fn new(settings: Rc<TileSettings>, factory: Rc<TileFactory>, worker: W) -> Self {
        let (completions_tx, completions_rx) = unbounded();
        Self {
            settings,
            factory,
            resource_pool: ResourcePool::new(),
            worker,
            completions_tx,
            completions_rx,
            outstanding_tasks: 0,
            ready_to_activate_notified: false,
        }
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        MemoryUsage {
            bytes: self.resource_pool.acquired_memory_bytes(),
            resources: self.resource_pool.acquired_resource_count(),
        }
    }

    pub fn resource_pool(&self) -> &ResourcePool {
        &self.resource_pool
    }

    pub fn outstanding_task_count(&self) -> usize {
        self.outstanding_tasks
    }

    /// Resets the once-per-commit ready-to-activate latch. Called when a new
    /// pending tree arrives.
    pub fn notify_new_commit(&mut self) {
        self.ready_to_activate_notified = false;
    }

    /// One scheduling pass: drain completions, walk the raster queue against
    /// the budget, free lower-priority resources when squeezed, and hand the
    /// selected tiles to the worker.
    pub fn manage_tiles(
        &mut self,
        layers: &mut LayerCollection,
        global_state: &GlobalTileState,
    ) -> (ManageTilesSummary, TileEvents) {
        let mut events = self.drain_completions(layers);

        let tree_priority = global_state.tree_priority;
        let mut summary = ManageTilesSummary::default();
        let mut usage = self.memory_usage();
        let mut to_schedule = Vec::new();
        let mut state_changes: Vec<(LayerId, TileId)> = Vec::new();

        {
            let mut raster_queue = RasterQueue::new(&*layers, tree_priority);
            let mut eviction_queue: Option<EvictionQueue<'_>> = None;
            while let Some(tile) = raster_queue.pop() {
                if self.outstanding_tasks + to_schedule.len()
                    >= self.settings.scheduled_raster_task_limit
                {
                    break;
                }
                let priority = tile.priority_for_tree_priority(tree_priority);
                if !global_state.memory_limit_policy.allows(priority.priority_bin) {
                    break;
                }

                // Provably uniform content never rasters.
                if let Some(color) = tile
                    .raster_source()
                    .analyze_solid_color(tile.content_rect(), tile.contents_scale())
                {
                    *tile.draw_info_mut() = TileDrawInfo::SolidColor(color);
                    summary.tiles_assigned_solid_color += 1;
                    state_changes.push((tile.layer_id(), tile.id()));
                    continue;
                }

                // NOW and required-for-activation tiles may spend up to the
                // hard limit; everything else stops at the soft limit.
                let required = tile.required_for_activation();
                let exempt = priority.priority_bin == PriorityBin::Now || required;
                let limit = if exempt {
                    global_state.hard_memory_limit_bytes
                } else {
                    global_state.soft_memory_limit_bytes
                };
                let tile_bytes = tile.bytes_if_allocated();

                if usage.bytes + tile_bytes > limit {
                    let queue = eviction_queue
                        .get_or_insert_with(|| EvictionQueue::new(&*layers, tree_priority));
                    while usage.bytes + tile_bytes > limit {
                        let victim_is_lower = queue.top().is_some_and(|victim| {
                            priority.is_higher_priority_than(
                                &victim.priority_for_tree_priority(tree_priority),
                            )
                        });
                        if !victim_is_lower {
                            break;
                        }
                        let victim = queue.pop().unwrap_or_else(|| unreachable!());
                        usage.bytes -= victim.bytes_if_allocated();
                        usage.resources -= 1;
                        victim.draw_info_mut().evict();
                        summary.tiles_evicted += 1;
                        state_changes.push((victim.layer_id(), victim.id()));
                    }
                }

                if usage.bytes + tile_bytes > limit
                    || usage.resources + 1 > global_state.num_resources_limit
                {
                    summary.tiles_skipped_for_memory += 1;
                    if exempt {
                        summary.out_of_memory = true;
                    }
                    continue;
                }

                usage.bytes += tile_bytes;
                usage.resources += 1;
                to_schedule.push(tile);
            }
        }

        for tile in to_schedule {
            let resource = self.resource_pool.acquire(tile.desired_texture_size());
            *tile.draw_info_mut() = TileDrawInfo::PendingRaster;
            self.outstanding_tasks += 1;
            summary.tiles_scheduled += 1;
            self.worker.schedule(
                RasterTask {
                    tile_id: tile.id(),
                    layer_id: tile.layer_id(),
                    content_rect: tile.content_rect(),
                    contents_scale: tile.contents_scale(),
                    resource,
                },
                &self.completions_tx,
            );
        }

        for &(layer_id, _) in &state_changes {
            layers.notify_tile_state_changed(layer_id);
        }
        events.tile_state_changes.extend(state_changes);
        self.recheck_ready_to_activate(layers, &mut events);
        (summary, events)
    }

    /// Drains the completion channel and rechecks activation readiness.
    /// Called by the embedder between passes as completions arrive.
    pub fn check_for_completed_tasks(&mut self, layers: &mut LayerCollection) -> TileEvents {
        let mut events = self.drain_completions(layers);
        self.recheck_ready_to_activate(layers, &mut events);
        events
    }

    /// Shutdown/testing path: waits for every outstanding task, then
    /// processes the results.
    pub fn finish_all_raster_tasks(&mut self, layers: &mut LayerCollection) -> TileEvents {
        self.worker.finish_all();
        self.check_for_completed_tasks(layers)
    }

    fn drain_completions(&mut self, layers: &mut LayerCollection) -> TileEvents {
        let mut events = TileEvents::default();
        while let Ok(completion) = self.completions_rx.try_recv() {
            debug_assert!(self.outstanding_tasks > 0, "completion without a task");
            self.outstanding_tasks -= 1;
            let tile = self
                .factory
                .get(completion.tile_id)
                .filter(|tile| tile.has_raster_task());
            match tile {
                Some(tile) => {
                    *tile.draw_info_mut() = TileDrawInfo::Resource(completion.resource);
                    layers.notify_tile_state_changed(completion.layer_id);
                    events
                        .tile_state_changes
                        .push((completion.layer_id, completion.tile_id));
                }
                // The tile died or was evicted while the task was in
                // flight; the resource just returns to the pool.
                None => drop(completion),
            }
        }
        self.factory.prune_dead();
        self.resource_pool.process_returns();
        events
    }

    /// Level-triggered: recomputed from every pending layer's tiles, fires
    /// at most once per commit.
    fn recheck_ready_to_activate(&mut self, layers: &LayerCollection, events: &mut TileEvents) {
        if self.ready_to_activate_notified {
            return;
        }
        if layers.all_pending_required_tiles_are_ready_to_draw() {
            self.ready_to_activate_notified = true;
            events.ready_to_activate = true;
        }
    }
}
