//! Per-tree tile priorities and the tree-level scheduling policy.

/// Which of the two layer trees a tiling or priority belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WhichTree {
    Active,
    Pending,
}

impl WhichTree {
    pub fn twin(self) -> WhichTree {
        match self {
            WhichTree::Active => WhichTree::Pending,
            WhichTree::Pending => WhichTree::Active,
        }
    }

    pub fn index(self) -> usize {
        match self {
            WhichTree::Active => 0,
            WhichTree::Pending => 1,
        }
    }
}

/// Frame-wide policy picking which tree's work to favor. Set once per
/// scheduling pass by the frame scheduler, read by every priority comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreePriority {
    #[default]
    SamePriorityForBothTrees,
    SmoothnessTakesPriority,
    NewContentTakesPriority,
}

/// Urgency bucket. Ordered most urgent first, so a smaller bin outranks a
/// larger one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityBin {
    Now,
    Soon,
    Eventually,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileResolution {
    LowResolution,
    HighResolution,
    NonIdealResolution,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePriority {
    pub resolution: TileResolution,
    pub priority_bin: PriorityBin,
    pub distance_to_visible: f32,
}

impl Default for TilePriority {
    fn default() -> Self {
        Self {
            resolution: TileResolution::NonIdealResolution,
            priority_bin: PriorityBin::Eventually,
            distance_to_visible: f32::INFINITY,
        }
    }
}

impl TilePriority {
    pub fn new(resolution: TileResolution, priority_bin: PriorityBin, distance_to_visible: f32) -> Self {
        Self {
            resolution,
            priority_bin,
            distance_to_visible,
        }
    }

    /// Merges the two trees' views of one tile into the most urgent of the
    /// two, preferring a real resolution tag over a non-ideal one.
    pub fn combine(active: TilePriority, pending: TilePriority) -> TilePriority {
        let resolution = if active.resolution == pending.resolution {
            active.resolution
        } else if active.resolution == TileResolution::NonIdealResolution {
            pending.resolution
        } else if pending.resolution == TileResolution::NonIdealResolution {
            active.resolution
        } else {
            TileResolution::HighResolution
        };
        TilePriority {
            resolution,
            priority_bin: active.priority_bin.min(pending.priority_bin),
            distance_to_visible: active.distance_to_visible.min(pending.distance_to_visible),
        }
    }

    pub fn is_higher_priority_than(&self, other: &TilePriority) -> bool {
        self.priority_bin < other.priority_bin
            || (self.priority_bin == other.priority_bin
                && self.distance_to_visible < other.distance_to_visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_outranks_distance() {
        let near_soon = TilePriority::new(TileResolution::HighResolution, PriorityBin::Soon, 1.0);
        let far_now = TilePriority::new(TileResolution::HighResolution, PriorityBin::Now, 1000.0);
        assert!(far_now.is_higher_priority_than(&near_soon));
        assert!(!near_soon.is_higher_priority_than(&far_now));
    }

    #[test]
    fn distance_breaks_bin_ties() {
        let near = TilePriority::new(TileResolution::HighResolution, PriorityBin::Soon, 10.0);
        let far = TilePriority::new(TileResolution::HighResolution, PriorityBin::Soon, 20.0);
        assert!(near.is_higher_priority_than(&far));
    }

    #[test]
    fn combine_takes_most_urgent_of_both_trees() {
        let active = TilePriority::new(TileResolution::HighResolution, PriorityBin::Eventually, 500.0);
        let pending = TilePriority::new(TileResolution::NonIdealResolution, PriorityBin::Now, 0.0);
        let combined = TilePriority::combine(active, pending);
        assert_eq!(combined.priority_bin, PriorityBin::Now);
        assert_eq!(combined.distance_to_visible, 0.0);
        assert_eq!(combined.resolution, TileResolution::HighResolution);
    }

    #[test]
    fn combine_of_two_real_resolutions_is_high() {
        let active = TilePriority::new(TileResolution::LowResolution, PriorityBin::Now, 0.0);
        let pending = TilePriority::new(TileResolution::HighResolution, PriorityBin::Now, 0.0);
        assert_eq!(
            TilePriority::combine(active, pending).resolution,
            TileResolution::HighResolution
        );
    }

    #[test]
    fn default_priority_never_outranks_anything() {
        let default = TilePriority::default();
        let eventually = TilePriority::new(
            TileResolution::NonIdealResolution,
            PriorityBin::Eventually,
            1e9,
        );
        assert!(!default.is_higher_priority_than(&eventually));
        assert!(eventually.is_higher_priority_than(&default));
    }
}
