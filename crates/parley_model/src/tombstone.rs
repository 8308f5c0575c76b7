//! Deletion markers.

use crate::entity::EntityKind;
use serde::{Deserialize, Serialize};

/// A persistent record of an entity deletion.
///
/// Tombstones are keyed by `(kind, targetId)` within a user and are only
/// ever overwritten by a newer deletion; sync never physically removes
/// them. A tombstone with `deletedAtMs` at or after a row's version
/// clock marks that row logically deleted, which is what prevents stale
/// writes from resurrecting deleted records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tombstone {
    /// The deleted entity's type.
    pub kind: EntityKind,
    /// Identity of the deleted record.
    pub target_id: String,
    /// Deletion time in Unix milliseconds; the tombstone's version clock.
    #[serde(default)]
    pub deleted_at_ms: i64,
    /// Device that issued the deletion.
    #[serde(default)]
    pub device_id: String,
}

impl Tombstone {
    /// Creates a tombstone for the given record.
    pub fn new(
        kind: EntityKind,
        target_id: impl Into<String>,
        deleted_at_ms: i64,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target_id: target_id.into(),
            deleted_at_ms,
            device_id: device_id.into(),
        }
    }

    /// Returns the `(kind, targetId)` key this tombstone governs.
    pub fn key(&self) -> (EntityKind, &str) {
        (self.kind, &self.target_id)
    }
}
