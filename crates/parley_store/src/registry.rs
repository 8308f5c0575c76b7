//! Typed per-table dispatch for change batches.
//!
//! Each wire table registers one handler implementing a common
//! validate + merge interface. Adding a table is a registration, not a
//! new branch in a conditional.

use crate::error::{StoreError, StoreResult};
use crate::store::{apply_tombstone, merge_upsert, EntityStore};
use parley_model::{
    ApiConfig, ChangeOp, Conversation, ConversationSetting, Group, MergeDecision, Message,
    ModelError, Syncable, TableName, Tombstone,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::marker::PhantomData;

/// A record that passed boundary validation.
#[derive(Debug, Clone)]
pub struct ValidRecord {
    /// Record identity.
    pub id: String,
    /// Version clock.
    pub version: i64,
    /// Canonical wire shape with defaults materialized.
    pub canonical: Value,
}

/// Per-table validate + merge behavior.
pub trait TableHandler: Send + Sync {
    /// The wire table this handler serves.
    fn table(&self) -> TableName;

    /// Validates an open record into identity, version, and canonical
    /// shape. Field coercion gaps are filled with documented defaults
    /// here; a missing identity or non-positive version rejects the
    /// record.
    fn validate(&self, record: &Value) -> StoreResult<ValidRecord>;

    /// Applies one change under the LWW + tombstone rule.
    fn merge(
        &self,
        store: &dyn EntityStore,
        user: &str,
        device_id: &str,
        op: ChangeOp,
        record: &Value,
    ) -> StoreResult<MergeDecision>;
}

/// Generic handler for the five entity tables.
pub struct EntityHandler<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> EntityHandler<T> {
    /// Creates the handler.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for EntityHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityHandler<T>
where
    T: Syncable + Serialize + DeserializeOwned + Send + Sync,
{
    fn decode(&self, record: &Value) -> StoreResult<T> {
        serde_json::from_value(record.clone()).map_err(|e| {
            StoreError::InvalidRecord(ModelError::MalformedRecord {
                table: self.table().as_str().to_string(),
                message: e.to_string(),
            })
        })
    }
}

impl<T> TableHandler for EntityHandler<T>
where
    T: Syncable + Serialize + DeserializeOwned + Send + Sync,
{
    fn table(&self) -> TableName {
        TableName::for_kind(T::KIND)
    }

    fn validate(&self, record: &Value) -> StoreResult<ValidRecord> {
        let typed = self.decode(record)?;
        if typed.entity_id().is_empty() {
            return Err(StoreError::InvalidRecord(ModelError::MissingIdentity {
                table: self.table().as_str().to_string(),
            }));
        }
        if typed.version() <= 0 {
            return Err(StoreError::InvalidRecord(ModelError::InvalidVersion {
                table: self.table().as_str().to_string(),
                id: typed.entity_id().to_string(),
                version: typed.version(),
            }));
        }
        let canonical =
            serde_json::to_value(&typed).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(ValidRecord {
            id: typed.entity_id().to_string(),
            version: typed.version(),
            canonical,
        })
    }

    fn merge(
        &self,
        store: &dyn EntityStore,
        user: &str,
        device_id: &str,
        op: ChangeOp,
        record: &Value,
    ) -> StoreResult<MergeDecision> {
        let valid = self.validate(record)?;
        match op {
            ChangeOp::Upsert => {
                merge_upsert(store, user, T::KIND, &valid.id, valid.version, valid.canonical)
            }
            ChangeOp::Delete => {
                // The record's version field carries the deletion time.
                let tombstone = Tombstone::new(T::KIND, valid.id, valid.version, device_id);
                let written = apply_tombstone(store, user, &tombstone)?;
                Ok(if written {
                    MergeDecision::Apply
                } else {
                    MergeDecision::SkipStale
                })
            }
        }
    }
}

/// Handler for the tombstones table.
///
/// Tombstones are append/overwrite only; a delete op against this table
/// is meaningless and treated as the same newer-wins upsert.
#[derive(Debug, Default)]
pub struct TombstoneHandler;

impl TableHandler for TombstoneHandler {
    fn table(&self) -> TableName {
        TableName::Tombstones
    }

    fn validate(&self, record: &Value) -> StoreResult<ValidRecord> {
        let tombstone: Tombstone = serde_json::from_value(record.clone()).map_err(|e| {
            StoreError::InvalidRecord(ModelError::MalformedRecord {
                table: "tombstones".to_string(),
                message: e.to_string(),
            })
        })?;
        if tombstone.target_id.is_empty() {
            return Err(StoreError::InvalidRecord(ModelError::MissingIdentity {
                table: "tombstones".to_string(),
            }));
        }
        if tombstone.deleted_at_ms <= 0 {
            return Err(StoreError::InvalidRecord(ModelError::InvalidVersion {
                table: "tombstones".to_string(),
                id: tombstone.target_id.clone(),
                version: tombstone.deleted_at_ms,
            }));
        }
        let canonical =
            serde_json::to_value(&tombstone).map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(ValidRecord {
            id: tombstone.target_id.clone(),
            version: tombstone.deleted_at_ms,
            canonical,
        })
    }

    fn merge(
        &self,
        store: &dyn EntityStore,
        user: &str,
        _device_id: &str,
        _op: ChangeOp,
        record: &Value,
    ) -> StoreResult<MergeDecision> {
        let valid = self.validate(record)?;
        let tombstone: Tombstone = serde_json::from_value(valid.canonical)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let written = apply_tombstone(store, user, &tombstone)?;
        Ok(if written {
            MergeDecision::Apply
        } else {
            MergeDecision::SkipStale
        })
    }
}

/// Registry mapping wire tables to their handlers.
pub struct TableRegistry {
    handlers: HashMap<TableName, Box<dyn TableHandler>>,
}

impl TableRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Creates the registry covering all six wire tables.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(EntityHandler::<Conversation>::new()));
        registry.register(Box::new(EntityHandler::<Message>::new()));
        registry.register(Box::new(EntityHandler::<ApiConfig>::new()));
        registry.register(Box::new(EntityHandler::<Group>::new()));
        registry.register(Box::new(EntityHandler::<ConversationSetting>::new()));
        registry.register(Box::new(TombstoneHandler));
        registry
    }

    /// Registers a handler under its table, replacing any existing one.
    pub fn register(&mut self, handler: Box<dyn TableHandler>) {
        self.handlers.insert(handler.table(), handler);
    }

    /// Looks up the handler for a table.
    pub fn handler(&self, table: TableName) -> Option<&dyn TableHandler> {
        self.handlers.get(&table).map(|h| h.as_ref())
    }
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
