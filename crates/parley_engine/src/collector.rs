//! Local change collection.

use crate::error::EngineResult;
use parley_model::{ChangeRecord, EntityKind, TableName};
use parley_store::{EntityStore, TableRegistry};

/// Collects every local change with a version clock above `since` into
/// uniform change records, ready to push.
///
/// Deletions are emitted as tombstone-table upserts, followed by live
/// rows per entity table. Each record passes through the table
/// registry's validation so heterogeneous local shapes are normalized
/// to the wire schema (defaults materialized, local field names mapped);
/// rows that fail validation are skipped with a warning rather than
/// poisoning the batch.
///
/// The scan is read-only; nothing marks the rows as collected. The
/// caller advances its push watermark only after the server accepts the
/// batch, so an interrupted push simply collects the same rows again.
pub fn collect_since(
    store: &dyn EntityStore,
    registry: &TableRegistry,
    user: &str,
    since: i64,
) -> EngineResult<Vec<ChangeRecord>> {
    let mut changes = Vec::new();

    for tombstone in store.tombstones_since(user, since)? {
        changes.push(ChangeRecord::upsert(TableName::Tombstones, &tombstone));
    }

    for kind in EntityKind::ALL {
        let table = TableName::for_kind(kind);
        for row in store.modified_since(user, kind, since)? {
            let Some(handler) = registry.handler(table) else {
                continue;
            };
            match handler.validate(&row.record) {
                Ok(valid) => changes.push(ChangeRecord {
                    table,
                    op: parley_model::ChangeOp::Upsert,
                    record: valid.canonical,
                }),
                Err(err) => {
                    tracing::warn!(%table, error = %err, "skipping invalid local row");
                }
            }
        }
    }

    tracing::debug!(count = changes.len(), since, "collected local changes");
    Ok(changes)
}

/// Splits a change list into push-sized batches, preserving order.
pub fn chunk_changes(changes: Vec<ChangeRecord>, batch_size: usize) -> Vec<Vec<ChangeRecord>> {
    if changes.is_empty() {
        return Vec::new();
    }
    let size = batch_size.max(1);
    let mut batches = Vec::with_capacity(changes.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(changes.len()));
    for change in changes {
        current.push(change);
        if current.len() == size {
            batches.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
