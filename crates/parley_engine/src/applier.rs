//! Remote change application.

use crate::error::{EngineError, EngineResult};
use parley_model::{ChangeOp, PullResponse, Syncable, TableName};
use parley_store::{apply_tombstone, EntityStore, TableRegistry};
use serde::Serialize;

/// Tally of a pull application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyCounts {
    /// Records written to the local store.
    pub applied: usize,
    /// Records dropped because a local row was strictly newer.
    pub skipped_stale: usize,
    /// Records dropped because a governing tombstone shadows them.
    pub skipped_tombstoned: usize,
    /// Records dropped because they failed validation.
    pub skipped_invalid: usize,
}

impl ApplyCounts {
    /// Total records considered.
    pub fn total(&self) -> usize {
        self.applied + self.skipped_stale + self.skipped_tombstoned + self.skipped_invalid
    }
}

/// Applies a pull response to the local store.
///
/// Tombstones are applied first so deletions shadow any entity record in
/// the same response, then each entity table merges under the LWW rule:
/// skip when a governing tombstone is at or after the record's version,
/// skip when a local row is strictly newer, upsert otherwise.
///
/// The function only mutates the local store and never touches the
/// network. Applying the same response twice leaves the store in the
/// same state as applying it once.
pub fn apply_pull(
    store: &dyn EntityStore,
    registry: &TableRegistry,
    user: &str,
    response: &PullResponse,
) -> EngineResult<ApplyCounts> {
    let mut counts = ApplyCounts::default();

    for tombstone in &response.tombstones {
        if apply_tombstone(store, user, tombstone)? {
            counts.applied += 1;
        } else {
            counts.skipped_stale += 1;
        }
    }

    merge_table(store, registry, user, TableName::Conversations, &response.conversations, &mut counts)?;
    merge_table(store, registry, user, TableName::Messages, &response.messages, &mut counts)?;
    merge_table(store, registry, user, TableName::ApiConfigs, &response.api_configs, &mut counts)?;
    merge_table(store, registry, user, TableName::Groups, &response.groups, &mut counts)?;
    merge_table(
        store,
        registry,
        user,
        TableName::ConversationSettings,
        &response.conversation_settings,
        &mut counts,
    )?;

    tracing::debug!(
        applied = counts.applied,
        stale = counts.skipped_stale,
        tombstoned = counts.skipped_tombstoned,
        invalid = counts.skipped_invalid,
        "applied pull response"
    );
    Ok(counts)
}

fn merge_table<T: Syncable + Serialize>(
    store: &dyn EntityStore,
    registry: &TableRegistry,
    user: &str,
    table: TableName,
    records: &[T],
    counts: &mut ApplyCounts,
) -> EngineResult<()> {
    let handler = registry
        .handler(table)
        .ok_or_else(|| EngineError::Protocol(format!("no handler registered for {table}")))?;

    for record in records {
        let value = serde_json::to_value(record)
            .map_err(|e| EngineError::Protocol(format!("unencodable {table} record: {e}")))?;
        match handler.merge(store, user, "", ChangeOp::Upsert, &value) {
            Ok(decision) => match decision {
                parley_model::MergeDecision::Apply => counts.applied += 1,
                parley_model::MergeDecision::SkipStale => counts.skipped_stale += 1,
                parley_model::MergeDecision::SkipTombstoned => counts.skipped_tombstoned += 1,
            },
            Err(err) if err.is_record_error() => {
                tracing::warn!(%table, error = %err, "skipping invalid pulled record");
                counts.skipped_invalid += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}
