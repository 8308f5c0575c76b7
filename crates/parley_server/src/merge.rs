//! Transactional push application.

use crate::error::{ServerError, ServerResult};
use parley_model::{now_ms, validate_batch, ChangeRecord, DeviceClock, MergeDecision};
use parley_store::{EntityStore, MemoryStore, TableRegistry};

/// Tally of one applied push batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushStats {
    /// Changes that won their merge and were written.
    pub applied: usize,
    /// Changes dropped by a strictly newer row or tombstone replay.
    pub skipped_stale: usize,
    /// Changes shadowed by a governing tombstone.
    pub skipped_tombstoned: usize,
    /// Changes whose record failed per-table validation.
    pub skipped_invalid: usize,
}

/// Applies a push batch inside one store transaction.
///
/// The outer batch shape is validated first; a malformed batch rejects
/// as a whole with nothing committed. Individual records that fail
/// their table's validation are skipped with a warning so one bad
/// record cannot block valid records in other tables, while any store
/// failure aborts and rolls back the entire batch.
///
/// On success the device's clock row is touched to record the push.
/// Reapplying the same batch yields the same store state: every merge
/// either overwrites with identical data or skips.
pub fn apply_push(
    store: &MemoryStore,
    registry: &TableRegistry,
    user: &str,
    device_id: &str,
    changes: &[ChangeRecord],
) -> ServerResult<PushStats> {
    validate_batch(changes).map_err(|e| ServerError::InvalidRequest(e.to_string()))?;

    store.transaction::<PushStats, ServerError, _>(|txn| {
        let mut stats = PushStats::default();

        for change in changes {
            let handler = registry.handler(change.table).ok_or_else(|| {
                ServerError::Internal(format!("no handler registered for {}", change.table))
            })?;

            match handler.merge(txn, user, device_id, change.op, &change.record) {
                Ok(MergeDecision::Apply) => stats.applied += 1,
                Ok(MergeDecision::SkipStale) => stats.skipped_stale += 1,
                Ok(MergeDecision::SkipTombstoned) => stats.skipped_tombstoned += 1,
                Err(err) if err.is_record_error() => {
                    tracing::warn!(table = %change.table, error = %err, "skipping invalid record");
                    stats.skipped_invalid += 1;
                }
                Err(err) => return Err(ServerError::Store(err)),
            }
        }

        let mut clock = txn
            .device_clock(user, device_id)?
            .unwrap_or_else(|| DeviceClock::new(device_id));
        clock.updated_at = now_ms();
        txn.put_device_clock(user, clock)?;

        Ok(stats)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_model::{ChangeOp, Conversation, EntityKind, Syncable, TableName};
    use parley_store::get_record;
    use serde_json::json;

    const USER: &str = "user-1";
    const DEVICE: &str = "device-a";

    fn conversation_change(id: &str, title: &str, version: i64) -> ChangeRecord {
        ChangeRecord {
            table: TableName::Conversations,
            op: ChangeOp::Upsert,
            record: json!({"id": id, "title": title, "updatedAtMs": version}),
        }
    }

    fn setup() -> (MemoryStore, TableRegistry) {
        (MemoryStore::new(), TableRegistry::standard())
    }

    #[test]
    fn applies_batch_and_touches_clock() {
        let (store, registry) = setup();
        let changes = vec![
            conversation_change("c1", "hello", 100),
            conversation_change("c2", "world", 200),
        ];

        let stats = apply_push(&store, &registry, USER, DEVICE, &changes).unwrap();
        assert_eq!(stats.applied, 2);

        let clock = store.device_clock(USER, DEVICE).unwrap().unwrap();
        assert!(clock.updated_at > 0);
    }

    #[test]
    fn push_is_idempotent() {
        let (store, registry) = setup();
        let changes = vec![
            conversation_change("c1", "hello", 100),
            ChangeRecord {
                table: TableName::Tombstones,
                op: ChangeOp::Upsert,
                record: json!({"kind": "message", "targetId": "m1", "deletedAtMs": 50}),
            },
        ];

        apply_push(&store, &registry, USER, DEVICE, &changes).unwrap();
        apply_push(&store, &registry, USER, DEVICE, &changes).unwrap();

        // No duplicate rows, no duplicate tombstones.
        assert_eq!(store.row_count(USER), 2);
        assert_eq!(store.tombstones_since(USER, 0).unwrap().len(), 1);
    }

    #[test]
    fn lww_converges_regardless_of_order() {
        let (store_a, registry) = setup();
        let (store_b, _) = setup();

        let older = conversation_change("c1", "Hello", 100);
        let newer = conversation_change("c1", "World", 200);

        apply_push(&store_a, &registry, USER, DEVICE, std::slice::from_ref(&older)).unwrap();
        apply_push(&store_a, &registry, USER, DEVICE, std::slice::from_ref(&newer)).unwrap();

        apply_push(&store_b, &registry, USER, DEVICE, std::slice::from_ref(&newer)).unwrap();
        apply_push(&store_b, &registry, USER, DEVICE, std::slice::from_ref(&older)).unwrap();

        let a: Conversation = get_record(&store_a, USER, "c1").unwrap().unwrap();
        let b: Conversation = get_record(&store_b, USER, "c1").unwrap().unwrap();
        assert_eq!(a.title, "World");
        assert_eq!(b.title, "World");
        assert_eq!(a.version(), 200);
        assert_eq!(b.version(), 200);
    }

    #[test]
    fn delete_shadows_stale_update() {
        let (store, registry) = setup();

        let delete = ChangeRecord {
            table: TableName::Conversations,
            op: ChangeOp::Delete,
            record: json!({"id": "c2", "updatedAtMs": 300}),
        };
        apply_push(&store, &registry, USER, DEVICE, std::slice::from_ref(&delete)).unwrap();

        let stale = conversation_change("c2", "late edit", 250);
        let stats =
            apply_push(&store, &registry, USER, "device-b", std::slice::from_ref(&stale)).unwrap();
        assert_eq!(stats.skipped_tombstoned, 1);

        let read: Option<Conversation> = get_record(&store, USER, "c2").unwrap();
        assert!(read.is_none());

        let tombstone = store.tombstone(USER, EntityKind::Conversation, "c2").unwrap().unwrap();
        assert_eq!(tombstone.device_id, DEVICE);
    }

    #[test]
    fn invalid_record_skipped_without_blocking_others() {
        let (store, registry) = setup();
        let changes = vec![
            ChangeRecord {
                table: TableName::Groups,
                // Missing its identity field.
                op: ChangeOp::Upsert,
                record: json!({"name": "orphan", "updatedAtMs": 10}),
            },
            conversation_change("c1", "fine", 100),
        ];

        let stats = apply_push(&store, &registry, USER, DEVICE, &changes).unwrap();
        assert_eq!(stats.skipped_invalid, 1);
        assert_eq!(stats.applied, 1);

        let read: Option<Conversation> = get_record(&store, USER, "c1").unwrap();
        assert!(read.is_some());
    }

    #[test]
    fn oversized_batch_rejected_before_any_write() {
        let (store, registry) = setup();
        let change = conversation_change("c1", "x", 1);
        let batch: Vec<_> = std::iter::repeat(change)
            .take(parley_model::MAX_PUSH_BATCH + 1)
            .collect();

        let err = apply_push(&store, &registry, USER, DEVICE, &batch).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(store.row_count(USER), 0);
        assert!(store.device_clock(USER, DEVICE).unwrap().is_none());
    }

    #[test]
    fn user_isolation() {
        let (store, registry) = setup();
        apply_push(&store, &registry, USER, DEVICE, &[conversation_change("c1", "a", 1)]).unwrap();

        let other: Option<Conversation> = get_record(&store, "user-2", "c1").unwrap();
        assert!(other.is_none());
    }
}
