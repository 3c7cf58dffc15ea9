//! Member identity.
//!
//! A [`MemberId`] names one entity inside a `Space`. Ids are unique within a
//! Space while the member is alive and are recycled from a free list after
//! deletion — a fresh Space hands out id 0 first.

use engine_sparse::SparseIndex;
use serde::{Deserialize, Serialize};

/// A member identifier, unique within one Space while the member is alive.
///
/// Members carry no data of their own; components attached to a member give
/// it meaning. [`MemberId::INVALID`] is the sentinel used for "no member"
/// (an absent parent link, for instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub u32);

impl MemberId {
    /// The null / invalid member sentinel.
    pub const INVALID: MemberId = MemberId(u32::MAX);

    /// Returns `true` if this id is not the invalid sentinel.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u32::MAX
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Member({})", self.0)
    }
}

impl SparseIndex for MemberId {
    fn from_usize(index: usize) -> Self {
        Self(index as u32)
    }

    fn to_usize(self) -> usize {
        self.0 as usize
    }
}
