//! Isotropic rect expansion toward a target area within a bound.

use geometry::IntRect;

/// Memo for [`expand_rect_equally_to_area_bounded_by`]. The expansion runs
/// every frame with usually-unchanged inputs; one remembered result is
/// enough to make the common case free.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectExpansionCache {
    previous_start: IntRect,
    previous_bounds: IntRect,
    previous_target: i64,
    previous_result: IntRect,
    valid: bool,
}

/// Solves for the per-edge growth that brings `width x height` to
/// `target_area` when `num_x_edges` vertical and `num_y_edges` horizontal
/// edges are still free to move.
fn compute_expansion_delta(
    num_x_edges: i64,
    num_y_edges: i64,
    width: i64,
    height: i64,
    target_area: i64,
) -> i32 {
    // (width + num_x_edges * d) * (height + num_y_edges * d) = target_area
    let a = num_y_edges * num_x_edges;
    let b = num_y_edges * width + num_x_edges * height;
    let c = width * height - target_area;
    let delta = if a == 0 {
        if b == 0 { 0 } else { -c / b }
    } else {
        let discriminant = b * b - 4 * a * c;
        if discriminant < 0 {
            0
        } else {
            (-b + (discriminant as f64).sqrt() as i64) / (2 * a)
        }
    };
    delta.max(0) as i32
}

/// Grows `starting_rect` the same amount in every unobstructed direction
/// until its area reaches `target_area` or it fills `bounding_rect`.
///
/// Never shrinks the starting rect, and returns `bounding_rect` itself once
/// the target area meets or exceeds the bound's area. An empty starting rect
/// stays empty.
pub fn expand_rect_equally_to_area_bounded_by(
    starting_rect: IntRect,
    target_area: i64,
    bounding_rect: IntRect,
    cache: &mut RectExpansionCache,
) -> IntRect {
    if starting_rect.is_empty() {
        return starting_rect;
    }
    if cache.valid
        && cache.previous_start == starting_rect
        && cache.previous_bounds == bounding_rect
        && cache.previous_target == target_area
    {
        return cache.previous_result;
    }
    let store = |cache: &mut RectExpansionCache, result: IntRect| {
        *cache = RectExpansionCache {
            previous_start: starting_rect,
            previous_bounds: bounding_rect,
            previous_target: target_area,
            previous_result: result,
            valid: true,
        };
        result
    };

    // First grow symmetrically as if unbounded, then clip to the bound.
    let initial_delta = compute_expansion_delta(
        2,
        2,
        i64::from(starting_rect.width),
        i64::from(starting_rect.height),
        target_area,
    );
    let expanded = starting_rect.inset(
        -initial_delta,
        -initial_delta,
        -initial_delta,
        -initial_delta,
    );
    let mut rect = expanded.intersection(bounding_rect);
    if rect.is_empty() {
        // Starting rect and bound are too far apart to meet.
        return store(cache, rect);
    }
    if rect == expanded {
        // The bound did not clip anything; target reached directly.
        return store(cache, rect);
    }

    // The bound clipped one or more sides. Redistribute the clipped growth
    // to the remaining free edges, saturating them one at a time.
    let mut free_left = rect.x > bounding_rect.x;
    let mut free_top = rect.y > bounding_rect.y;
    let mut free_right = rect.right() < bounding_rect.right();
    let mut free_bottom = rect.bottom() < bounding_rect.bottom();

    loop {
        let num_x_edges = i64::from(free_left) + i64::from(free_right);
        let num_y_edges = i64::from(free_top) + i64::from(free_bottom);
        if num_x_edges == 0 && num_y_edges == 0 {
            break;
        }
        let delta = compute_expansion_delta(
            num_x_edges,
            num_y_edges,
            i64::from(rect.width),
            i64::from(rect.height),
            target_area,
        );
        if delta == 0 {
            break;
        }

        // Headroom before the nearest free edge hits the bound.
        let mut headroom = i32::MAX;
        if free_left {
            headroom = headroom.min(rect.x - bounding_rect.x);
        }
        if free_top {
            headroom = headroom.min(rect.y - bounding_rect.y);
        }
        if free_right {
            headroom = headroom.min(bounding_rect.right() - rect.right());
        }
        if free_bottom {
            headroom = headroom.min(bounding_rect.bottom() - rect.bottom());
        }

        let step = delta.min(headroom);
        rect = rect.inset(
            if free_left { -step } else { 0 },
            if free_top { -step } else { 0 },
            if free_right { -step } else { 0 },
            if free_bottom { -step } else { 0 },
        );
        if delta <= headroom {
            break;
        }
        free_left = free_left && rect.x > bounding_rect.x;
        free_top = free_top && rect.y > bounding_rect.y;
        free_right = free_right && rect.right() < bounding_rect.right();
        free_bottom = free_bottom && rect.bottom() < bounding_rect.bottom();
    }

    store(cache, rect)
}
