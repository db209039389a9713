//! Integer and float geometry for the tile compositing core.
//!
//! Rects are half-open in pixel space: a rect covers `x..x+width` and
//! `y..y+height`. Scaling between layer space and content space always
//! rounds outward (enclosing) so that coverage never loses pixels.

mod rect;
mod region;

pub use rect::{FloatRect, IntRect, IntSize};
pub use region::Region;

/// Scales a size by `scale`, rounding each dimension up.
pub fn scale_size_ceil(size: IntSize, scale: f32) -> IntSize {
    assert!(scale >= 0.0, "scale must be non-negative");
    IntSize {
        width: (f64::from(size.width) * f64::from(scale)).ceil() as i32,
        height: (f64::from(size.height) * f64::from(scale)).ceil() as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_size_rounds_up() {
        let size = IntSize::new(1300, 1900);
        assert_eq!(scale_size_ceil(size, 1.0), size);
        assert_eq!(scale_size_ceil(size, 0.5), IntSize::new(650, 950));
        assert_eq!(scale_size_ceil(size, 0.24), IntSize::new(312, 456));
        assert_eq!(scale_size_ceil(IntSize::new(7, 7), 0.3), IntSize::new(3, 3));
    }
}
