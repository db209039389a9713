use crate::IntRect;

/// A set of rects treated as a single area.
///
/// Used for invalidation tracking and coverage-hole accounting. Rects are
/// kept as provided; queries answer against the union of the set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<IntRect>,
}

impl Region {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rect(rect: IntRect) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn union_rect(&mut self, rect: IntRect) {
        if rect.is_empty() {
            return;
        }
        self.rects.push(rect);
    }

    pub fn clear(&mut self) {
        self.rects.clear();
    }

    pub fn intersects(&self, rect: IntRect) -> bool {
        self.rects.iter().any(|r| r.intersects(rect))
    }

    /// True when `rect` lies entirely inside one of the region's rects.
    ///
    /// This is a conservative containment test: an area covered only by the
    /// union of several rects reports false. The occlusion snapshots fed to
    /// this core are single enclosed areas, where the test is exact.
    pub fn contains_rect(&self, rect: IntRect) -> bool {
        if rect.is_empty() {
            return true;
        }
        self.rects.iter().any(|r| r.contains_rect(rect))
    }

    pub fn bounds(&self) -> IntRect {
        self.rects
            .iter()
            .fold(IntRect::default(), |acc, r| acc.union(*r))
    }

    pub fn rects(&self) -> impl Iterator<Item = IntRect> + '_ {
        self.rects.iter().copied()
    }

    pub fn take_rects(&mut self) -> Vec<IntRect> {
        std::mem::take(&mut self.rects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_region_intersects_nothing() {
        let region = Region::new();
        assert!(region.is_empty());
        assert!(!region.intersects(IntRect::new(0, 0, 100, 100)));
    }

    #[test]
    fn union_of_empty_rect_is_ignored() {
        let mut region = Region::new();
        region.union_rect(IntRect::default());
        assert!(region.is_empty());
    }

    #[test]
    fn intersects_any_member_rect() {
        let mut region = Region::new();
        region.union_rect(IntRect::new(0, 0, 10, 10));
        region.union_rect(IntRect::new(100, 100, 10, 10));
        assert!(region.intersects(IntRect::new(5, 5, 10, 10)));
        assert!(region.intersects(IntRect::new(105, 0, 10, 200)));
        assert!(!region.intersects(IntRect::new(20, 20, 10, 10)));
    }

    #[test]
    fn contains_rect_is_per_member() {
        let region = Region::from_rect(IntRect::new(0, 0, 50, 50));
        assert!(region.contains_rect(IntRect::new(10, 10, 10, 10)));
        assert!(!region.contains_rect(IntRect::new(45, 45, 10, 10)));
    }

    #[test]
    fn bounds_covers_all_rects() {
        let mut region = Region::new();
        region.union_rect(IntRect::new(0, 0, 10, 10));
        region.union_rect(IntRect::new(90, 40, 10, 10));
        assert_eq!(region.bounds(), IntRect::new(0, 0, 100, 50));
    }
}
