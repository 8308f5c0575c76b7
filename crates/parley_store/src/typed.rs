//! Typed access over the raw store.
//!
//! The store keeps wire-shaped JSON rows; these helpers move between
//! rows and the per-entity DTOs at the edges.

use crate::error::{StoreError, StoreResult};
use crate::store::EntityStore;
use parley_model::Syncable;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Writes a typed record through the raw store, stamping its version
/// from the record's own clock.
pub fn upsert_record<T: Syncable + Serialize>(
    store: &dyn EntityStore,
    user: &str,
    record: &T,
) -> StoreResult<()> {
    let value = serde_json::to_value(record).map_err(|e| StoreError::Backend(e.to_string()))?;
    store.upsert(user, T::KIND, record.entity_id(), record.version(), value)
}

/// Reads a typed record; soft-deleted rows read as absent.
pub fn get_record<T: Syncable + DeserializeOwned>(
    store: &dyn EntityStore,
    user: &str,
    id: &str,
) -> StoreResult<Option<T>> {
    let Some(row) = store.get(user, T::KIND, id)? else {
        return Ok(None);
    };
    if row.deleted {
        return Ok(None);
    }
    let typed = serde_json::from_value(row.record).map_err(|e| StoreError::CorruptRow {
        kind: T::KIND.as_str().to_string(),
        id: id.to_string(),
        message: e.to_string(),
    })?;
    Ok(Some(typed))
}

/// Lists typed records modified after `since`, skipping rows that no
/// longer decode (each skip is logged).
pub fn modified_records<T: Syncable + DeserializeOwned>(
    store: &dyn EntityStore,
    user: &str,
    since: i64,
) -> StoreResult<Vec<T>> {
    let rows = store.modified_since(user, T::KIND, since)?;
    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        match serde_json::from_value::<T>(row.record) {
            Ok(record) => records.push(record),
            Err(err) => {
                tracing::warn!(kind = %T::KIND, error = %err, "skipping undecodable row");
            }
        }
    }
    Ok(records)
}
