use serde::{Deserialize, Serialize};

///
/// Direction
///
/// Canonical traversal direction shared by range-descriptor construction,
/// boundary checks, and the scatter-gather merge iterator.
///
/// `Unordered` scans use forward boundary semantics but promise no ordering
/// to the caller, which lets shards stream batches without a merge-side sort
/// barrier.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
    Unordered,
}

impl Direction {
    /// True when boundary checks follow forward (ascending) semantics.
    #[must_use]
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Forward | Self::Unordered)
    }
}
