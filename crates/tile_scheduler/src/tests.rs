use std::collections::HashSet;
use std::rc::Rc;

use geometry::{IntRect, IntSize, Region};
use tile_model::{
    GlobalTileState, LayerId, PriorityBin, ResourcePool, TileDrawInfo, TileHandle, TileSettings,
    TreePriority, WhichTree,
};
use tiled_layer::DrawInputs;

use crate::test_support::{
    DeferredRasterWorker, ImmediateRasterWorker, PairHarness, SolidTileRasterSource,
};
use crate::{EvictionQueue, RasterQueue, TileManager};

const BOUNDS: IntSize = IntSize::new(1000, 1000);
const TILE_BYTES: i64 = 256 * 256 * 4;

fn small_viewport() -> DrawInputs {
    DrawInputs {
        viewport_rect_in_layer_space: IntRect::new(0, 0, 300, 300),
        ..DrawInputs::default()
    }
}

fn give_resource(pool: &mut ResourcePool, tile: &TileHandle) {
    *tile.draw_info_mut() = TileDrawInfo::Resource(pool.acquire(tile.desired_texture_size()));
}

#[test]
fn raster_queue_is_empty_for_an_empty_collection() {
    let harness = PairHarness::new();
    let mut queue = RasterQueue::new(&harness.layers, TreePriority::SamePriorityForBothTrees);
    assert!(queue.is_empty());
    assert!(queue.top().is_none());
    assert!(queue.pop().is_none());
}

#[test]
fn raster_queue_returns_each_shared_tile_exactly_once() {
    let mut harness = PairHarness::new();
    let inputs = small_viewport();
    harness.add_pending_layer(LayerId(1), BOUNDS);
    harness.update_pending(&inputs);
    harness.activate_all();
    harness.update_active(&inputs);

    // A commit with no invalidation shares every tile between the trees.
    harness.commit(LayerId(1), BOUNDS, Region::new());
    harness.update_pending(&inputs);

    let mut queue = RasterQueue::new(&harness.layers, TreePriority::SamePriorityForBothTrees);
    let mut seen = HashSet::new();
    let mut count = 0;
    while let Some(tile) = queue.pop() {
        assert!(seen.insert(tile.id()), "tile returned twice");
        assert!(tile.is_shared());
        count += 1;
    }
    // 16 high-res tiles plus the single low-res tile.
    assert_eq!(count, 17);
    assert_eq!(queue.stats().tiles_returned, 17);
}

#[test]
fn smoothness_mode_still_yields_pending_now_tiles_over_active_prefetch() {
    // A small soon border leaves an EVENTUALLY band on the 4x4 grid.
    let mut harness = PairHarness::with_settings(TileSettings {
        max_tiles_for_soon_border: 1,
        ..TileSettings::default()
    });
    let inputs = small_viewport();
    harness.add_pending_layer(LayerId(1), BOUNDS);
    harness.update_pending(&inputs);
    harness.activate_all();
    harness.update_active(&inputs);

    // Raster everything urgent on the active tree so its next candidate is
    // an EVENTUALLY prefetch tile.
    let mut pool = ResourcePool::new();
    let active = harness
        .layers
        .get(WhichTree::Active, LayerId(1))
        .expect("active layer");
    for tiling in active.tilings().tilings() {
        for tile in tiling.all_tiles() {
            if tile.priority(WhichTree::Active).priority_bin != PriorityBin::Eventually {
                give_resource(&mut pool, &tile);
            }
        }
    }

    // Full invalidation: the pending tree shares nothing and must raster
    // its visible tiles from scratch.
    harness.commit(LayerId(1), BOUNDS, Region::from_rect(IntRect::from_size(BOUNDS)));
    harness.update_pending(&inputs);

    let mut queue = RasterQueue::new(&harness.layers, TreePriority::SmoothnessTakesPriority);
    let first = queue.pop().expect("queue has tiles");
    assert_eq!(
        first.priority(WhichTree::Pending).priority_bin,
        PriorityBin::Now
    );
}

#[test]
fn eviction_queue_returns_least_important_resources_first() {
    let mut harness = PairHarness::new();
    harness.add_pending_layer(LayerId(1), BOUNDS);
    harness.update_pending(&small_viewport());

    let pending = harness
        .layers
        .get(WhichTree::Pending, LayerId(1))
        .expect("pending layer");
    let high = pending.tilings().tiling_with_scale(1.0).expect("high-res");
    let tile_now = high.tile_at(0, 0).expect("visible tile");
    let tile_soon = high.tile_at(3, 3).expect("prepaint tile");
    let mut pool = ResourcePool::new();
    give_resource(&mut pool, &tile_now);
    give_resource(&mut pool, &tile_soon);

    let mut queue = EvictionQueue::new(&harness.layers, TreePriority::SamePriorityForBothTrees);
    let first = queue.pop().expect("first victim");
    let second = queue.pop().expect("second victim");
    assert!(Rc::ptr_eq(&first, &tile_soon));
    assert!(Rc::ptr_eq(&second, &tile_now));
    assert!(queue.pop().is_none());
}

#[test]
fn required_tiles_are_scheduled_past_the_soft_limit() {
    let mut harness = PairHarness::new();
    harness.add_pending_layer(LayerId(1), BOUNDS);
    harness.update_pending(&small_viewport());

    let mut manager = TileManager::new(
        harness.settings.clone(),
        harness.factory.clone(),
        DeferredRasterWorker::new(),
    );
    let state = GlobalTileState {
        soft_memory_limit_bytes: TILE_BYTES,
        ..GlobalTileState::default()
    };

    let (summary, events) = manager.manage_tiles(&mut harness.layers, &state);

    // The four visible high-res tiles are required for activation and the
    // low-res tile is NOW; all five pass the soft cutoff. The twelve
    // prepaint tiles do not.
    assert_eq!(summary.tiles_scheduled, 5);
    assert_eq!(summary.tiles_skipped_for_memory, 12);
    assert!(!summary.out_of_memory);
    assert!(!events.ready_to_activate);
    assert_eq!(manager.outstanding_task_count(), 5);

    let pending = harness
        .layers
        .get(WhichTree::Pending, LayerId(1))
        .expect("pending layer");
    let high = pending.tilings().tiling_with_scale(1.0).expect("high-res");
    for (i, j) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
        let tile = high.tile_at(i, j).expect("visible tile");
        assert!(tile.required_for_activation());
        assert!(tile.has_raster_task());
    }

    let events = manager.finish_all_raster_tasks(&mut harness.layers);
    assert_eq!(events.tile_state_changes.len(), 5);
    assert!(events.ready_to_activate);
    assert_eq!(manager.memory_usage().bytes, 5 * TILE_BYTES);

    // The latch fires once per commit.
    let events = manager.check_for_completed_tasks(&mut harness.layers);
    assert!(!events.ready_to_activate);
}

#[test]
fn out_of_memory_is_reported_when_required_tiles_cannot_fit() {
    let mut harness = PairHarness::new();
    harness.add_pending_layer(LayerId(1), BOUNDS);
    harness.update_pending(&small_viewport());

    let mut manager = TileManager::new(
        harness.settings.clone(),
        harness.factory.clone(),
        DeferredRasterWorker::new(),
    );
    let state = GlobalTileState {
        soft_memory_limit_bytes: TILE_BYTES,
        hard_memory_limit_bytes: TILE_BYTES,
        ..GlobalTileState::default()
    };

    let (summary, _) = manager.manage_tiles(&mut harness.layers, &state);
    assert_eq!(summary.tiles_scheduled, 1);
    assert!(summary.out_of_memory);
}

#[test]
fn the_scheduled_task_limit_bounds_each_pass() {
    let mut harness = PairHarness::with_settings(TileSettings {
        scheduled_raster_task_limit: 2,
        ..TileSettings::default()
    });
    harness.add_pending_layer(LayerId(1), BOUNDS);
    harness.update_pending(&small_viewport());

    let mut manager = TileManager::new(
        harness.settings.clone(),
        harness.factory.clone(),
        DeferredRasterWorker::new(),
    );
    let state = GlobalTileState::default();

    let (summary, _) = manager.manage_tiles(&mut harness.layers, &state);
    assert_eq!(summary.tiles_scheduled, 2);
    assert_eq!(manager.outstanding_task_count(), 2);

    // In-flight tasks hold their slots across passes.
    let (summary, _) = manager.manage_tiles(&mut harness.layers, &state);
    assert_eq!(summary.tiles_scheduled, 0);

    manager.finish_all_raster_tasks(&mut harness.layers);
    let (summary, _) = manager.manage_tiles(&mut harness.layers, &state);
    assert_eq!(summary.tiles_scheduled, 2);
}

#[test]
fn solid_color_analysis_bypasses_raster() {
    let mut harness = PairHarness::new();
    harness.layers.create_pending_layer(
        LayerId(1),
        SolidTileRasterSource::new(BOUNDS, [255, 0, 0, 255]),
        harness.settings.clone(),
        harness.factory.clone(),
    );
    harness.update_pending(&small_viewport());

    let mut manager = TileManager::new(
        harness.settings.clone(),
        harness.factory.clone(),
        ImmediateRasterWorker,
    );
    let (summary, events) = manager.manage_tiles(&mut harness.layers, &GlobalTileState::default());

    assert_eq!(summary.tiles_assigned_solid_color, 17);
    assert_eq!(summary.tiles_scheduled, 0);
    assert!(events.ready_to_activate);
    assert_eq!(manager.memory_usage().bytes, 0);

    let pending = harness
        .layers
        .get(WhichTree::Pending, LayerId(1))
        .expect("pending layer");
    let tile = pending
        .tilings()
        .tiling_with_scale(1.0)
        .and_then(|tiling| tiling.tile_at(0, 0))
        .expect("visible tile");
    assert!(matches!(*tile.draw_info(), TileDrawInfo::SolidColor(_)));
    assert!(tile.is_ready_to_draw());
}

#[test]
fn a_squeezed_pass_evicts_the_least_important_resources() {
    let mut harness = PairHarness::new();
    harness.add_pending_layer(LayerId(1), BOUNDS);
    harness.update_pending(&small_viewport());

    let mut manager = TileManager::new(
        harness.settings.clone(),
        harness.factory.clone(),
        ImmediateRasterWorker,
    );
    let state = GlobalTileState {
        soft_memory_limit_bytes: 5 * TILE_BYTES,
        hard_memory_limit_bytes: 5 * TILE_BYTES,
        ..GlobalTileState::default()
    };

    let (summary, _) = manager.manage_tiles(&mut harness.layers, &state);
    assert_eq!(summary.tiles_scheduled, 5);
    manager.check_for_completed_tasks(&mut harness.layers);
    assert_eq!(manager.memory_usage().bytes, 5 * TILE_BYTES);

    // Scroll to the far corner: the new visible tiles must push the old
    // corner's resources out, furthest first.
    let inputs = DrawInputs {
        viewport_rect_in_layer_space: IntRect::new(700, 700, 300, 300),
        frame_time_in_seconds: 2.0,
        ..DrawInputs::default()
    };
    harness.update_pending(&inputs);

    let (summary, _) = manager.manage_tiles(&mut harness.layers, &state);
    assert_eq!(summary.tiles_scheduled, 4);
    assert_eq!(summary.tiles_evicted, 4);
    assert!(!summary.out_of_memory);

    let pending = harness
        .layers
        .get(WhichTree::Pending, LayerId(1))
        .expect("pending layer");
    let high = pending.tilings().tiling_with_scale(1.0).expect("high-res");
    assert!(!high.tile_at(0, 0).expect("old corner tile").has_resource());
    assert!(high.tile_at(3, 3).expect("new corner tile").has_raster_task());

    manager.check_for_completed_tasks(&mut harness.layers);
    assert_eq!(manager.memory_usage().bytes, 5 * TILE_BYTES);
}
