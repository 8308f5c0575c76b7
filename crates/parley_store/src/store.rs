//! The entity store CRUD contract and shared merge operations.

use crate::error::StoreResult;
use parley_model::{
    merge_decision, DeviceClock, EntityKind, MergeDecision, Tombstone,
};
use serde_json::Value;

/// A stored row: the wire-shaped record plus soft-deletion state.
///
/// Soft-deleted rows keep their last record body for late comparisons
/// and carry the deletion timestamp as their version, so a stale update
/// loses the LWW comparison against the deletion.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    /// Record payload in wire shape.
    pub record: Value,
    /// Version clock; the deletion timestamp for soft-deleted rows.
    pub version: i64,
    /// Whether the row is logically deleted.
    pub deleted: bool,
}

impl StoredRow {
    /// Creates a live row.
    pub fn live(record: Value, version: i64) -> Self {
        Self {
            record,
            version,
            deleted: false,
        }
    }
}

/// CRUD contract over the six logical tables plus the device clock.
///
/// Every operation is scoped to exactly one user; implementations must
/// never let records cross user boundaries. The same contract backs the
/// client's local store and the server's authoritative store.
pub trait EntityStore: Send + Sync {
    /// Gets a row by identity, including soft-deleted rows.
    fn get(&self, user: &str, kind: EntityKind, id: &str) -> StoreResult<Option<StoredRow>>;

    /// Inserts or replaces a row, clearing any soft-deletion state.
    fn upsert(
        &self,
        user: &str,
        kind: EntityKind,
        id: &str,
        version: i64,
        record: Value,
    ) -> StoreResult<()>;

    /// Marks a row deleted at the given time, creating a bare row if
    /// none exists so the deletion clock is persisted either way.
    fn soft_delete(
        &self,
        user: &str,
        kind: EntityKind,
        id: &str,
        deleted_at_ms: i64,
    ) -> StoreResult<()>;

    /// Lists live rows whose version clock exceeds `since`.
    fn modified_since(
        &self,
        user: &str,
        kind: EntityKind,
        since: i64,
    ) -> StoreResult<Vec<StoredRow>>;

    /// Gets the tombstone governing `(kind, target_id)`, if any.
    fn tombstone(
        &self,
        user: &str,
        kind: EntityKind,
        target_id: &str,
    ) -> StoreResult<Option<Tombstone>>;

    /// Writes a tombstone unconditionally. Callers wanting newer-wins
    /// semantics go through [`apply_tombstone`].
    fn put_tombstone(&self, user: &str, tombstone: Tombstone) -> StoreResult<()>;

    /// Lists tombstones whose deletion time exceeds `since`.
    fn tombstones_since(&self, user: &str, since: i64) -> StoreResult<Vec<Tombstone>>;

    /// Gets the device clock row for `(user, device_id)`.
    fn device_clock(&self, user: &str, device_id: &str) -> StoreResult<Option<DeviceClock>>;

    /// Inserts or replaces a device clock row.
    fn put_device_clock(&self, user: &str, clock: DeviceClock) -> StoreResult<()>;
}

/// Applies an incoming upsert under the LWW + tombstone rule.
///
/// The write is persisted only when no governing tombstone is at or
/// after `version` and no existing row is strictly newer. Returns the
/// decision so callers can count skips.
pub fn merge_upsert(
    store: &dyn EntityStore,
    user: &str,
    kind: EntityKind,
    id: &str,
    version: i64,
    record: Value,
) -> StoreResult<MergeDecision> {
    let tombstone = store.tombstone(user, kind, id)?.map(|t| t.deleted_at_ms);
    let existing = store.get(user, kind, id)?.map(|row| row.version);

    let decision = merge_decision(version, existing, tombstone);
    if decision.applies() {
        store.upsert(user, kind, id, version, record)?;
    }
    Ok(decision)
}

/// Applies an incoming tombstone: the shared deletion rule.
///
/// Upserts the tombstone keyed by `(kind, targetId)` when the incoming
/// deletion is newer than any existing one, then soft-deletes the
/// governed row unless the row has already moved past the deletion
/// (a revival). Returns true when the tombstone itself was written.
///
/// Running this twice with the same input is a no-op the second time,
/// which is what makes replayed deletions safe.
pub fn apply_tombstone(
    store: &dyn EntityStore,
    user: &str,
    incoming: &Tombstone,
) -> StoreResult<bool> {
    let existing = store.tombstone(user, incoming.kind, &incoming.target_id)?;
    let newer = existing.map_or(true, |t| incoming.deleted_at_ms > t.deleted_at_ms);
    if newer {
        store.put_tombstone(user, incoming.clone())?;
    }

    let governs = match store.get(user, incoming.kind, &incoming.target_id)? {
        None => true,
        Some(row) => incoming.deleted_at_ms >= row.version,
    };
    if governs {
        store.soft_delete(user, incoming.kind, &incoming.target_id, incoming.deleted_at_ms)?;
    }

    Ok(newer)
}

/// Deletes a record locally: writes the tombstone and soft-deletes the
/// row in one step. This is the client-side `delete-by-id` of the CRUD
/// contract; sync never physically removes anything.
pub fn delete_record(
    store: &dyn EntityStore,
    user: &str,
    kind: EntityKind,
    id: &str,
    deleted_at_ms: i64,
    device_id: &str,
) -> StoreResult<()> {
    let tombstone = Tombstone::new(kind, id, deleted_at_ms, device_id);
    apply_tombstone(store, user, &tombstone)?;
    Ok(())
}
