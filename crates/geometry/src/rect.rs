#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntSize {
    pub width: i32,
    pub height: i32,
}

impl IntSize {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(self) -> i64 {
        if self.is_empty() {
            return 0;
        }
        i64::from(self.width) * i64::from(self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl IntRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn from_size(size: IntSize) -> Self {
        Self {
            x: 0,
            y: 0,
            width: size.width,
            height: size.height,
        }
    }

    pub fn from_edges(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            x: left,
            y: top,
            width: right - left,
            height: bottom - top,
        }
    }

    pub fn right(self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(self) -> i32 {
        self.y + self.height
    }

    pub fn size(self) -> IntSize {
        IntSize::new(self.width, self.height)
    }

    pub fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn area(self) -> i64 {
        self.size().area()
    }

    pub fn intersects(self, other: IntRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    pub fn contains_rect(self, other: IntRect) -> bool {
        if other.is_empty() {
            return true;
        }
        !self.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    pub fn contains_point(self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    pub fn intersection(self, other: IntRect) -> IntRect {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return IntRect::default();
        }
        IntRect::from_edges(left, top, right, bottom)
    }

    pub fn union(self, other: IntRect) -> IntRect {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        IntRect::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Shrinks each edge inward by the given amount. Negative values grow
    /// the rect. A rect inset past its own size collapses to empty.
    pub fn inset(self, left: i32, top: i32, right: i32, bottom: i32) -> IntRect {
        let new_left = self.x + left;
        let new_top = self.y + top;
        let new_right = self.right() - right;
        let new_bottom = self.bottom() - bottom;
        if new_right <= new_left || new_bottom <= new_top {
            return IntRect::default();
        }
        IntRect::from_edges(new_left, new_top, new_right, new_bottom)
    }

    pub fn offset(self, dx: i32, dy: i32) -> IntRect {
        IntRect::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Scales the rect, rounding outward so the result encloses the scaled
    /// region exactly.
    pub fn scale_to_enclosing(self, scale: f32) -> IntRect {
        if self.is_empty() {
            return IntRect::default();
        }
        let scale = f64::from(scale);
        let left = (f64::from(self.x) * scale).floor() as i32;
        let top = (f64::from(self.y) * scale).floor() as i32;
        let right = (f64::from(self.right()) * scale).ceil() as i32;
        let bottom = (f64::from(self.bottom()) * scale).ceil() as i32;
        IntRect::from_edges(left, top, right, bottom)
    }

    /// Manhattan distance needed to move `other` so it overlaps the interior
    /// of `self`. Zero when the rects already intersect.
    pub fn manhattan_internal_distance(self, other: IntRect) -> i32 {
        let combined = self.union(other);
        let x = (combined.width - self.width - other.width + 1).max(0);
        let y = (combined.height - self.height - other.height + 1).max(0);
        x + y
    }
}

/// A float rect in texel space, produced when mapping coverage geometry back
/// onto a tile's texture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloatRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl FloatRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_int(rect: IntRect) -> Self {
        Self {
            x: rect.x as f32,
            y: rect.y as f32,
            width: rect.width as f32,
            height: rect.height as f32,
        }
    }

    pub fn scale(self, scale: f32) -> FloatRect {
        FloatRect::new(
            self.x * scale,
            self.y * scale,
            self.width * scale,
            self.height * scale,
        )
    }

    pub fn offset(self, dx: f32, dy: f32) -> FloatRect {
        FloatRect::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_disjoint_rects_is_empty() {
        let a = IntRect::new(0, 0, 10, 10);
        let b = IntRect::new(10, 0, 10, 10);
        assert!(!a.intersects(b));
        assert!(a.intersection(b).is_empty());
    }

    #[test]
    fn intersection_clips_to_overlap() {
        let a = IntRect::new(0, 0, 10, 10);
        let b = IntRect::new(5, 5, 10, 10);
        assert_eq!(a.intersection(b), IntRect::new(5, 5, 5, 5));
    }

    #[test]
    fn union_with_empty_keeps_other_side() {
        let a = IntRect::new(3, 4, 5, 6);
        assert_eq!(a.union(IntRect::default()), a);
        assert_eq!(IntRect::default().union(a), a);
    }

    #[test]
    fn inset_collapses_to_empty() {
        let a = IntRect::new(0, 0, 10, 10);
        assert!(a.inset(6, 0, 6, 0).is_empty());
        assert_eq!(a.inset(-2, -2, -2, -2), IntRect::new(-2, -2, 14, 14));
    }

    #[test]
    fn scale_to_enclosing_rounds_outward() {
        let rect = IntRect::new(1, 1, 3, 3);
        assert_eq!(rect.scale_to_enclosing(0.5), IntRect::from_edges(0, 0, 2, 2));
        assert_eq!(rect.scale_to_enclosing(2.0), IntRect::new(2, 2, 6, 6));
    }

    #[test]
    fn manhattan_internal_distance_is_zero_when_touching() {
        let a = IntRect::new(0, 0, 10, 10);
        assert_eq!(a.manhattan_internal_distance(IntRect::new(5, 5, 2, 2)), 0);
        // Abutting rects are one step apart.
        assert_eq!(a.manhattan_internal_distance(IntRect::new(10, 0, 5, 5)), 1);
        assert_eq!(a.manhattan_internal_distance(IntRect::new(13, 0, 5, 5)), 4);
        assert_eq!(a.manhattan_internal_distance(IntRect::new(13, 12, 5, 5)), 7);
    }
}
