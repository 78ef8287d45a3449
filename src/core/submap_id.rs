//! Stable submap identity.

use std::fmt;

/// Composite key identifying one submap of one trajectory.
///
/// Ordering is lexicographic (trajectory first, then index), which gives a
/// deterministic iteration order wherever sets of submaps are walked, in
/// particular the paint order of overlapping tiles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubmapId {
    pub trajectory_id: i32,
    pub submap_index: i32,
}

impl SubmapId {
    #[inline]
    pub const fn new(trajectory_id: i32, submap_index: i32) -> Self {
        Self {
            trajectory_id,
            submap_index,
        }
    }
}

impl fmt::Display for SubmapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.trajectory_id, self.submap_index)
    }
}
