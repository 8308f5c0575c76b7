//! In-memory entity store.

use crate::error::StoreResult;
use crate::store::{EntityStore, StoredRow};
use parking_lot::{Mutex, RwLock};
use parley_model::{DeviceClock, EntityKind, Tombstone};
use serde_json::Value;
use std::collections::BTreeMap;

type RowKey = (String, EntityKind, String);

#[derive(Debug, Clone, Default)]
struct Inner {
    rows: BTreeMap<RowKey, StoredRow>,
    tombstones: BTreeMap<RowKey, Tombstone>,
    clocks: BTreeMap<(String, String), DeviceClock>,
}

/// An in-memory [`EntityStore`].
///
/// Reads and writes are atomic at the row level via a store-wide lock.
/// Whole-batch atomicity is available through [`MemoryStore::transaction`],
/// which runs a closure against a scratch copy and commits only on
/// success, so concurrent push batches for the same user serialize the
/// way a database transaction would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    txn_lock: Mutex<()>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` against a scratch copy of the store and commits the
    /// result only when `f` returns `Ok`. An `Err` discards every write
    /// the closure made. Transactions serialize against each other;
    /// plain reads outside a transaction are never blocked for long.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&MemoryStore) -> Result<T, E>,
    {
        let _guard = self.txn_lock.lock();
        let scratch = MemoryStore {
            inner: RwLock::new(self.inner.read().clone()),
            txn_lock: Mutex::new(()),
        };
        let out = f(&scratch)?;
        *self.inner.write() = scratch.inner.into_inner();
        Ok(out)
    }

    /// Number of rows (live and soft-deleted) stored for a user.
    pub fn row_count(&self, user: &str) -> usize {
        self.inner
            .read()
            .rows
            .keys()
            .filter(|(u, _, _)| u == user)
            .count()
    }
}

impl EntityStore for MemoryStore {
    fn get(&self, user: &str, kind: EntityKind, id: &str) -> StoreResult<Option<StoredRow>> {
        let inner = self.inner.read();
        Ok(inner
            .rows
            .get(&(user.to_string(), kind, id.to_string()))
            .cloned())
    }

    fn upsert(
        &self,
        user: &str,
        kind: EntityKind,
        id: &str,
        version: i64,
        record: Value,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.rows.insert(
            (user.to_string(), kind, id.to_string()),
            StoredRow::live(record, version),
        );
        Ok(())
    }

    fn soft_delete(
        &self,
        user: &str,
        kind: EntityKind,
        id: &str,
        deleted_at_ms: i64,
    ) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let key = (user.to_string(), kind, id.to_string());
        match inner.rows.get_mut(&key) {
            Some(row) => {
                row.deleted = true;
                row.version = deleted_at_ms;
            }
            None => {
                // No prior row: persist a bare deleted row so the
                // deletion clock still wins late comparisons.
                inner.rows.insert(
                    key,
                    StoredRow {
                        record: Value::Object(serde_json::Map::new()),
                        version: deleted_at_ms,
                        deleted: true,
                    },
                );
            }
        }
        Ok(())
    }

    fn modified_since(
        &self,
        user: &str,
        kind: EntityKind,
        since: i64,
    ) -> StoreResult<Vec<StoredRow>> {
        let inner = self.inner.read();
        Ok(inner
            .rows
            .iter()
            .filter(|((u, k, _), row)| u == user && *k == kind && !row.deleted && row.version > since)
            .map(|(_, row)| row.clone())
            .collect())
    }

    fn tombstone(
        &self,
        user: &str,
        kind: EntityKind,
        target_id: &str,
    ) -> StoreResult<Option<Tombstone>> {
        let inner = self.inner.read();
        Ok(inner
            .tombstones
            .get(&(user.to_string(), kind, target_id.to_string()))
            .cloned())
    }

    fn put_tombstone(&self, user: &str, tombstone: Tombstone) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner.tombstones.insert(
            (user.to_string(), tombstone.kind, tombstone.target_id.clone()),
            tombstone,
        );
        Ok(())
    }

    fn tombstones_since(&self, user: &str, since: i64) -> StoreResult<Vec<Tombstone>> {
        let inner = self.inner.read();
        Ok(inner
            .tombstones
            .iter()
            .filter(|((u, _, _), t)| u == user && t.deleted_at_ms > since)
            .map(|(_, t)| t.clone())
            .collect())
    }

    fn device_clock(&self, user: &str, device_id: &str) -> StoreResult<Option<DeviceClock>> {
        let inner = self.inner.read();
        Ok(inner
            .clocks
            .get(&(user.to_string(), device_id.to_string()))
            .cloned())
    }

    fn put_device_clock(&self, user: &str, clock: DeviceClock) -> StoreResult<()> {
        let mut inner = self.inner.write();
        inner
            .clocks
            .insert((user.to_string(), clock.device_id.clone()), clock);
        Ok(())
    }
}
