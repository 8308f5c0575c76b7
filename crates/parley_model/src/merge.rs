//! The LWW + tombstone merge rule.
//!
//! One pure decision function is shared by the client applier and the
//! server push handlers, so both sides converge to the same state no
//! matter which order competing writes arrive in.

/// Outcome of comparing an incoming write against local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// The incoming write wins and must be applied.
    Apply,
    /// An existing row carries a strictly newer version; drop the write.
    SkipStale,
    /// A governing tombstone is at or after the write's version; drop it.
    SkipTombstoned,
}

impl MergeDecision {
    /// Returns true when the incoming write should be persisted.
    pub fn applies(&self) -> bool {
        matches!(self, MergeDecision::Apply)
    }
}

/// Decides whether an incoming write survives against local state.
///
/// Rules, in order:
/// 1. A tombstone with `deletedAtMs >= incoming_version` shadows the
///    write entirely.
/// 2. An existing row with `version > incoming_version` wins; ties favor
///    the incoming write, which makes retried pushes idempotent.
///
/// Versions are client-supplied millisecond clocks; arrival order plays
/// no part in the decision.
pub fn merge_decision(
    incoming_version: i64,
    existing_version: Option<i64>,
    tombstone_deleted_at: Option<i64>,
) -> MergeDecision {
    if let Some(deleted_at) = tombstone_deleted_at {
        if deleted_at >= incoming_version {
            return MergeDecision::SkipTombstoned;
        }
    }
    if let Some(existing) = existing_version {
        if existing > incoming_version {
            return MergeDecision::SkipStale;
        }
    }
    MergeDecision::Apply
}

/// Returns true when a deletion at `deleted_at_ms` governs a row at
/// `row_version`, i.e. the row must be considered logically deleted.
pub fn tombstone_governs(deleted_at_ms: i64, row_version: i64) -> bool {
    deleted_at_ms >= row_version
}
