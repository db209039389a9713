use std::rc::Rc;

use geometry::{IntRect, IntSize, Region};
use tile_model::{
    FixedRasterSource, LayerId, PriorityBin, TileDrawInfo, TileFactory, TileResolution,
    TileSettings, TreePriority, WhichTree,
};

use crate::{
    EvictionCategory, Occlusion, Tiling, TilingContext, TilingRange, TilingSet,
};

const LAYER_BOUNDS: IntSize = IntSize::new(1000, 1000);

fn make_tiling(tree: WhichTree, scale: f32, factory: &Rc<TileFactory>) -> Tiling {
    make_tiling_with_settings(tree, scale, TileSettings::default(), factory)
}

fn make_tiling_with_settings(
    tree: WhichTree,
    scale: f32,
    settings: TileSettings,
    factory: &Rc<TileFactory>,
) -> Tiling {
    Tiling::new(
        tree,
        LayerId(1),
        scale,
        IntSize::new(256, 256),
        LAYER_BOUNDS,
        FixedRasterSource::filled(LAYER_BOUNDS),
        Rc::new(settings),
        factory.clone(),
    )
}

fn materialize_all(tiling: &mut Tiling) {
    let full = tiling.grid().tiling_rect();
    tiling.set_live_tiles_rect(full, &TilingContext::default(), None);
}

fn compute(tiling: &mut Tiling, viewport: IntRect, frame_time: f64, ctx: &TilingContext) {
    let scale = tiling.contents_scale();
    tiling.compute_tile_priority_rects(viewport, scale, frame_time, Occlusion::default(), ctx);
}

#[test]
fn priority_rects_nest_and_update_is_idempotent() {
    let factory = TileFactory::new();
    let mut tiling = make_tiling(WhichTree::Active, 1.0, &factory);
    let viewport = IntRect::new(100, 100, 300, 300);

    assert!(!tiling.has_ever_been_updated());
    compute(&mut tiling, viewport, 1.0, &TilingContext::default());
    assert!(tiling.has_ever_been_updated());

    let visible = tiling.current_visible_rect();
    assert_eq!(visible, viewport);
    assert!(tiling.current_skewport_rect().contains_rect(visible));
    assert!(tiling.current_soon_border_rect().contains_rect(visible));
    assert!(tiling
        .current_eventually_rect()
        .contains_rect(tiling.current_soon_border_rect().intersection(tiling.grid().tiling_rect())));
    assert_eq!(tiling.live_tiles_rect(), tiling.current_eventually_rect());

    // Same frame time and viewport: nothing changes.
    assert!(!tiling.needs_update_for_frame_at_time_and_viewport(1.0, viewport));
    let tiles_before = tiling.num_tiles();
    compute(&mut tiling, viewport, 1.0, &TilingContext::default());
    assert_eq!(tiling.num_tiles(), tiles_before);
}

#[test]
fn skewport_extrapolates_in_the_scroll_direction() {
    let factory = TileFactory::new();
    let mut tiling = make_tiling(WhichTree::Active, 1.0, &factory);

    compute(&mut tiling, IntRect::new(0, 0, 300, 300), 1.0, &TilingContext::default());
    compute(&mut tiling, IntRect::new(100, 0, 300, 300), 1.1, &TilingContext::default());

    let visible = tiling.current_visible_rect();
    let skewport = tiling.current_skewport_rect();
    assert!(skewport.contains_rect(visible));
    assert!(skewport.right() > visible.right());
    // No motion on the y axis, no extrapolation there.
    assert_eq!(skewport.y, visible.y);
    assert_eq!(skewport.bottom(), visible.bottom());
    // Bounded by the extrapolation limit.
    assert!(skewport.right() <= visible.right() + 2000);
}

#[test]
fn raster_iterator_yields_visible_tiles_first_without_duplicates() {
    let factory = TileFactory::new();
    let mut tiling = make_tiling(WhichTree::Active, 1.0, &factory);
    compute(&mut tiling, IntRect::new(0, 0, 300, 300), 1.0, &TilingContext::default());
    assert_eq!(tiling.num_tiles(), 16);

    let tiles: Vec<_> = tiling.raster_tile_iterator(None, false).collect();
    assert_eq!(tiles.len(), 16);

    let mut seen = std::collections::HashSet::new();
    for tile in &tiles {
        assert!(seen.insert(tile.id()), "tile yielded twice");
    }

    // The 2x2 visible block comes first, each tagged NOW at distance zero.
    for tile in &tiles[..4] {
        let priority = tile.priority(WhichTree::Active);
        assert_eq!(priority.priority_bin, PriorityBin::Now);
        assert_eq!(priority.distance_to_visible, 0.0);
        let (i, j) = tile.grid_index();
        assert!(i <= 1 && j <= 1);
    }
    // Everything after is further out, and distances only matter off-screen.
    for tile in &tiles[4..] {
        let priority = tile.priority(WhichTree::Active);
        assert_ne!(priority.priority_bin, PriorityBin::Now);
        assert!(priority.distance_to_visible > 0.0);
    }
}

#[test]
fn raster_iterator_skips_occluded_and_rastered_tiles() {
    let factory = TileFactory::new();
    let mut tiling = make_tiling(WhichTree::Active, 1.0, &factory);
    let viewport = IntRect::new(0, 0, 300, 300);
    let occlusion = Occlusion::new(Region::from_rect(IntRect::new(0, 0, 260, 260)));
    tiling.compute_tile_priority_rects(viewport, 1.0, 1.0, occlusion, &TilingContext::default());

    // Tile (0, 0) sits fully under the occluding rect.
    let occluded = tiling.tile_at(0, 0).unwrap();
    assert!(tiling.is_tile_occluded(&occluded));

    // Tile (1, 0) already has content.
    let rastered = tiling.tile_at(1, 0).unwrap();
    *rastered.draw_info_mut() = TileDrawInfo::SolidColor([0, 0, 0, 255]);

    let tiles: Vec<_> = tiling.raster_tile_iterator(None, false).collect();
    assert_eq!(tiles.len(), 14);
    assert!(!tiles.iter().any(|t| t.id() == occluded.id()));
    assert!(!tiles.iter().any(|t| t.id() == rastered.id()));
}

#[test]
fn twin_tiles_are_shared_unless_invalidated() {
    let factory = TileFactory::new();
    let mut active = make_tiling(WhichTree::Active, 1.0, &factory);
    let viewport = IntRect::new(0, 0, 300, 300);
    compute(&mut active, viewport, 1.0, &TilingContext::default());

    let invalidation = Region::from_rect(IntRect::new(0, 0, 10, 10));
    let mut pending = make_tiling(WhichTree::Pending, 1.0, &factory);
    let ctx = TilingContext {
        twin: Some(&active),
        invalidation: Some(&invalidation),
        requires_high_res_to_draw: false,
    };
    compute(&mut pending, viewport, 1.0, &ctx);

    // The invalidated corner tile is recreated, the rest are shared.
    let active_corner = active.tile_at(0, 0).unwrap();
    let pending_corner = pending.tile_at(0, 0).unwrap();
    assert_ne!(active_corner.id(), pending_corner.id());
    assert!(!active_corner.is_shared());
    assert!(!pending_corner.is_shared());

    let shared = pending.tile_at(2, 2).unwrap();
    assert!(Rc::ptr_eq(&shared, &active.tile_at(2, 2).unwrap()));
    assert!(shared.is_shared());
}

#[test]
fn shared_tile_priority_updates_both_tree_records() {
    let factory = TileFactory::new();
    let mut active = make_tiling(WhichTree::Active, 1.0, &factory);
    compute(&mut active, IntRect::new(0, 0, 300, 300), 1.0, &TilingContext::default());

    let mut pending = make_tiling(WhichTree::Pending, 1.0, &factory);
    let ctx = TilingContext {
        twin: Some(&active),
        invalidation: None,
        requires_high_res_to_draw: false,
    };
    // The pending tree scrolled further down.
    compute(&mut pending, IntRect::new(0, 600, 300, 300), 1.0, &ctx);

    let tile = pending.tile_at(0, 2).unwrap();
    assert!(tile.is_shared());
    pending.update_tile_and_twin_priority(&tile, Some(&active), false);
    assert_eq!(tile.priority(WhichTree::Pending).priority_bin, PriorityBin::Now);
    assert_ne!(tile.priority(WhichTree::Active).priority_bin, PriorityBin::Now);

    // An unshared tile gets its twin record reset to lowest priority.
    let unshared = pending.tile_at(0, 2).unwrap();
    pending.update_tile_and_twin_priority(&unshared, None, false);
    assert!(unshared.priority(WhichTree::Active).distance_to_visible.is_infinite());
}

#[test]
fn required_for_activation_follows_the_twin() {
    let factory = TileFactory::new();
    let viewport = IntRect::new(0, 0, 300, 300);

    let mut pending = make_tiling(WhichTree::Pending, 1.0, &factory);
    pending.set_resolution(TileResolution::HighResolution);
    pending.set_can_require_tiles_for_activation(true);
    compute(&mut pending, viewport, 1.0, &TilingContext::default());

    let visible_tile = pending.tile_at(0, 0).unwrap();
    let offscreen_tile = pending.tile_at(3, 3).unwrap();

    // Without a twin, visible high-res tiles block activation.
    assert!(pending.is_tile_required_for_activation(&visible_tile, None, false));

    // A twin with identical geometry and a tile in place also requires it.
    let mut active = make_tiling(WhichTree::Active, 1.0, &factory);
    compute(&mut active, viewport, 1.0, &TilingContext::default());
    assert!(pending.is_tile_required_for_activation(&visible_tile, Some(&active), false));

    // If the twin has nothing there, the area may simply have no recording.
    active.reset();
    assert!(!pending.is_tile_required_for_activation(&visible_tile, Some(&active), false));

    // Low-res and non-visible tiles never block activation.
    pending.update_tile_and_twin_priority(&offscreen_tile, None, false);
    assert!(!offscreen_tile.required_for_activation());
    pending.set_resolution(TileResolution::LowResolution);
    assert!(!pending.is_tile_required_for_activation(&visible_tile, None, false));
}

#[test]
fn eviction_buckets_order_furthest_first() {
    let factory = TileFactory::new();
    // A small soon border leaves room for an EVENTUALLY band in a 4x4 grid.
    let settings = TileSettings {
        max_tiles_for_soon_border: 1,
        ..TileSettings::default()
    };
    let mut tiling = make_tiling_with_settings(WhichTree::Active, 1.0, settings, &factory);
    compute(&mut tiling, IntRect::new(0, 0, 300, 300), 1.0, &TilingContext::default());

    let now = tiling.eviction_tiles(
        TreePriority::SamePriorityForBothTrees,
        EvictionCategory::Now,
        None,
        false,
    );
    assert_eq!(now.len(), 4);

    let eventually = tiling.eviction_tiles(
        TreePriority::SamePriorityForBothTrees,
        EvictionCategory::Eventually,
        None,
        false,
    );
    assert!(!eventually.is_empty());
    for pair in eventually.windows(2) {
        let a = pair[0].combined_priority().distance_to_visible;
        let b = pair[1].combined_priority().distance_to_visible;
        assert!(a >= b, "eviction candidates must come furthest first");
    }

    let required = tiling.eviction_tiles(
        TreePriority::SamePriorityForBothTrees,
        EvictionCategory::NowAndRequiredForActivation,
        None,
        false,
    );
    assert!(required.is_empty());
}

#[test]
fn invalidation_recreates_tiles_in_place() {
    let factory = TileFactory::new();
    let mut tiling = make_tiling(WhichTree::Active, 1.0, &factory);
    materialize_all(&mut tiling);
    let old_corner = tiling.tile_at(0, 0).unwrap();
    let old_far = tiling.tile_at(3, 3).unwrap();

    let invalidation = Region::from_rect(IntRect::new(0, 0, 10, 10));
    tiling.update_tiles_to_current_source(
        FixedRasterSource::filled(LAYER_BOUNDS),
        &invalidation,
        LAYER_BOUNDS,
    );

    let new_corner = tiling.tile_at(0, 0).unwrap();
    assert_ne!(new_corner.id(), old_corner.id());
    assert_eq!(tiling.tile_at(3, 3).unwrap().id(), old_far.id());
    assert_eq!(tiling.num_tiles(), 16);
}

#[test]
fn shrinking_layer_bounds_drops_outside_tiles() {
    let factory = TileFactory::new();
    let mut tiling = make_tiling(WhichTree::Active, 1.0, &factory);
    materialize_all(&mut tiling);
    assert_eq!(tiling.num_tiles(), 16);

    let new_bounds = IntSize::new(500, 500);
    tiling.update_tiles_to_current_source(
        FixedRasterSource::filled(new_bounds),
        &Region::new(),
        new_bounds,
    );
    assert_eq!(tiling.tiling_size(), new_bounds);
    assert_eq!(tiling.grid().num_tiles_x(), 2);
    for tile in tiling.all_tiles() {
        let (i, j) = tile.grid_index();
        assert!(i < 2 && j < 2);
    }
}

#[test]
fn coverage_tiles_the_dest_rect_exactly() {
    let factory = TileFactory::new();
    let mut tiling = make_tiling(WhichTree::Active, 1.0, &factory);
    materialize_all(&mut tiling);

    for dest_scale in [1.0_f32, 2.0, 0.5] {
        // Stays inside the layer at every dest scale.
        let dest_rect = IntRect::new(10, 10, 400, 400);
        let mut covered_area = 0;
        let mut previous: Vec<IntRect> = Vec::new();
        for cov in tiling.coverage(dest_scale, dest_rect) {
            let rect = cov.geometry_rect;
            assert!(!rect.is_empty());
            assert!(dest_rect.contains_rect(rect));
            assert!(cov.tile.is_some());
            assert!(
                !previous.iter().any(|r| r.intersects(rect)),
                "coverage rects must not overlap"
            );
            assert!(cov.texture_rect.x >= 0.0 && cov.texture_rect.y >= 0.0);
            covered_area += rect.area();
            previous.push(rect);
        }
        assert_eq!(covered_area, dest_rect.area(), "at dest scale {dest_scale}");
    }
}

#[test]
fn set_keeps_tilings_sorted_and_finds_by_scale() {
    let factory = TileFactory::new();
    let mut set = TilingSet::new();
    set.add_tiling(make_tiling(WhichTree::Active, 1.0, &factory));
    set.add_tiling(make_tiling(WhichTree::Active, 0.25, &factory));
    set.add_tiling(make_tiling(WhichTree::Active, 2.0, &factory));

    let scales: Vec<f32> = set.tilings().map(Tiling::contents_scale).collect();
    assert_eq!(scales, vec![2.0, 1.0, 0.25]);
    assert!(set.tiling_with_scale(0.25).is_some());
    assert!(set.tiling_with_scale(0.5).is_none());
}

#[test]
#[should_panic(expected = "already has a tiling")]
fn set_rejects_duplicate_scales() {
    let factory = TileFactory::new();
    let mut set = TilingSet::new();
    set.add_tiling(make_tiling(WhichTree::Active, 1.0, &factory));
    set.add_tiling(make_tiling(WhichTree::Active, 1.0, &factory));
}

#[test]
fn tiling_range_brackets_the_marked_resolutions() {
    let factory = TileFactory::new();
    let mut set = TilingSet::new();
    for (scale, resolution) in [
        (2.0, TileResolution::NonIdealResolution),
        (1.5, TileResolution::HighResolution),
        (1.0, TileResolution::NonIdealResolution),
        (0.5, TileResolution::LowResolution),
        (0.25, TileResolution::NonIdealResolution),
    ] {
        set.add_tiling(make_tiling(WhichTree::Active, scale, &factory))
            .set_resolution(resolution);
    }

    assert_eq!(set.tiling_range(TilingRange::HigherThanHighRes), 0..1);
    assert_eq!(set.tiling_range(TilingRange::HighRes), 1..2);
    assert_eq!(set.tiling_range(TilingRange::BetweenHighAndLowRes), 2..3);
    assert_eq!(set.tiling_range(TilingRange::LowRes), 3..4);
    assert_eq!(set.tiling_range(TilingRange::LowerThanLowRes), 4..5);
    assert_eq!(set.num_high_res(), 1);
}

#[test]
fn sync_tilings_mirrors_the_other_set() {
    let factory = TileFactory::new();
    let mut source = TilingSet::new();
    source
        .add_tiling(make_tiling(WhichTree::Pending, 1.0, &factory))
        .set_resolution(TileResolution::HighResolution);
    source
        .add_tiling(make_tiling(WhichTree::Pending, 0.25, &factory))
        .set_resolution(TileResolution::LowResolution);

    let mut target = TilingSet::new();
    target.add_tiling(make_tiling(WhichTree::Active, 2.0, &factory));
    target.add_tiling(make_tiling(WhichTree::Active, 1.0, &factory));

    let raster_source = FixedRasterSource::filled(LAYER_BOUNDS);
    let have_high_res = target.sync_tilings(
        &source,
        raster_source,
        LAYER_BOUNDS,
        &Region::new(),
        0.0625,
        |scale| make_tiling(WhichTree::Active, scale, &factory),
    );

    assert!(have_high_res);
    let scales: Vec<f32> = target.tilings().map(Tiling::contents_scale).collect();
    assert_eq!(scales, vec![1.0, 0.25]);
    assert_eq!(
        target.tiling_with_scale(1.0).unwrap().resolution(),
        TileResolution::HighResolution
    );
    assert_eq!(
        target.tiling_with_scale(0.25).unwrap().resolution(),
        TileResolution::LowResolution
    );
}

#[test]
fn sync_tilings_with_empty_bounds_removes_everything() {
    let factory = TileFactory::new();
    let mut source = TilingSet::new();
    source.add_tiling(make_tiling(WhichTree::Pending, 1.0, &factory));
    let mut target = TilingSet::new();
    target.add_tiling(make_tiling(WhichTree::Active, 1.0, &factory));

    let have_high_res = target.sync_tilings(
        &source,
        FixedRasterSource::filled(LAYER_BOUNDS),
        IntSize::new(0, 0),
        &Region::new(),
        0.0625,
        |scale| make_tiling(WhichTree::Active, scale, &factory),
    );
    assert!(!have_high_res);
    assert_eq!(target.num_tilings(), 0);
}

#[test]
fn set_coverage_falls_back_and_checkerboards() {
    let factory = TileFactory::new();
    let mut set = TilingSet::new();
    let mut high = make_tiling(WhichTree::Active, 1.0, &factory);
    materialize_all(&mut high);

    // Only the corner tile has content.
    let ready = high.tile_at(0, 0).unwrap();
    *ready.draw_info_mut() = TileDrawInfo::SolidColor([255, 255, 255, 255]);
    set.add_tiling(high);

    let dest_rect = IntRect::new(0, 0, 500, 500);
    let mut ready_area = 0;
    let mut hole_area = 0;
    for cov in set.coverage(1.0, dest_rect, 1.0) {
        assert!(dest_rect.contains_rect(cov.geometry_rect));
        match &cov.tile {
            Some(tile) => {
                assert!(tile.is_ready_to_draw());
                assert_eq!(cov.resolution, Some(TileResolution::NonIdealResolution));
                ready_area += cov.geometry_rect.area();
            }
            None => {
                assert_eq!(cov.resolution, None);
                hole_area += cov.geometry_rect.area();
            }
        }
    }
    // Tile (0, 0) covers 255x255 of the dest; the rest checkerboards.
    assert_eq!(ready_area, 255 * 255);
    assert_eq!(ready_area + hole_area, dest_rect.area());
}

#[test]
fn set_coverage_prefers_the_tiling_nearest_ideal_scale() {
    let factory = TileFactory::new();
    let mut set = TilingSet::new();

    let mut high = make_tiling(WhichTree::Active, 2.0, &factory);
    materialize_all(&mut high);
    for tile in high.all_tiles() {
        *tile.draw_info_mut() = TileDrawInfo::SolidColor([1, 1, 1, 255]);
    }
    let mut low = make_tiling(WhichTree::Active, 0.5, &factory);
    materialize_all(&mut low);
    for tile in low.all_tiles() {
        *tile.draw_info_mut() = TileDrawInfo::SolidColor([2, 2, 2, 255]);
    }
    set.add_tiling(high);
    set.add_tiling(low);

    let dest_rect = IntRect::new(0, 0, 400, 400);
    // Ideal scale 0.5 selects the low tiling even though both are ready.
    for cov in set.coverage(1.0, dest_rect, 0.5) {
        let tile = cov.tile.expect("both tilings are fully ready");
        assert_eq!(tile.contents_scale(), 0.5);
    }
    // Ideal scale 2.0 selects the high tiling.
    for cov in set.coverage(1.0, dest_rect, 2.0) {
        let tile = cov.tile.expect("both tilings are fully ready");
        assert_eq!(tile.contents_scale(), 2.0);
    }
}
