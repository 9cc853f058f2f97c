//! Errors surfaced by [`crate::GraveyardSet::validate`] and
//! [`crate::GraveyardMap::validate`].
//!
//! Nothing on the insert/lookup/erase hot path returns one of these: they
//! exist purely for the consistency checker, which a caller runs in tests
//! or diagnostics, not in production request paths.

use thiserror::Error;

/// A structural inconsistency found by `validate()`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A bucket's recorded `search_distance` is shorter than the distance
    /// an occupied slot reachable from it actually needed.
    #[error("bucket {bucket} has search_distance {recorded}, but a key starting there needed {needed} hops")]
    SearchDistanceOverflow {
        bucket: usize,
        recorded: u8,
        needed: usize,
    },

    /// The table's reported `len` doesn't match the number of occupied
    /// slots found by a full scan.
    #[error("table reports len {reported}, but {counted} slots are occupied")]
    SizeMismatch { reported: usize, counted: usize },

    /// An occupied slot's key does not hash to a bucket reachable from its
    /// own H1-preferred starting bucket within the recorded search distance.
    #[error("key in bucket {bucket} slot {slot} prefers starting bucket {preferred}, unreachable within its search_distance")]
    MisplacedSlot {
        bucket: usize,
        slot: usize,
        preferred: usize,
    },

    /// Tombstone seeding is enabled for this table's parameters but no
    /// seeded slack was found anywhere in the bucket array.
    #[error("tombstone seeding is enabled but no seeded slack was found")]
    TombstoneMissing,
}

pub type Result<T> = core::result::Result<T, ValidationError>;
