//! Uniform change records for push batches.

use crate::entity::EntityKind;
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Maximum number of changes accepted in one push request.
///
/// Callers with more pending changes must chunk them across requests.
pub const MAX_PUSH_BATCH: usize = 2000;

/// The six wire tables a change may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TableName {
    /// Conversations table.
    Conversations,
    /// Messages table.
    Messages,
    /// Api configs table.
    ApiConfigs,
    /// Groups table.
    Groups,
    /// Conversation settings table.
    ConversationSettings,
    /// Tombstones table.
    Tombstones,
}

impl TableName {
    /// All wire tables, in pull-response order.
    pub const ALL: [TableName; 6] = [
        TableName::Conversations,
        TableName::Messages,
        TableName::ApiConfigs,
        TableName::Groups,
        TableName::ConversationSettings,
        TableName::Tombstones,
    ];

    /// Returns the wire name of the table.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::Conversations => "conversations",
            TableName::Messages => "messages",
            TableName::ApiConfigs => "apiConfigs",
            TableName::Groups => "groups",
            TableName::ConversationSettings => "conversationSettings",
            TableName::Tombstones => "tombstones",
        }
    }

    /// Returns the entity kind stored in this table, or `None` for the
    /// tombstones table.
    pub fn entity_kind(&self) -> Option<EntityKind> {
        match self {
            TableName::Conversations => Some(EntityKind::Conversation),
            TableName::Messages => Some(EntityKind::Message),
            TableName::ApiConfigs => Some(EntityKind::ApiConfig),
            TableName::Groups => Some(EntityKind::Group),
            TableName::ConversationSettings => Some(EntityKind::ConversationSetting),
            TableName::Tombstones => None,
        }
    }

    /// Returns the table holding the given entity kind.
    pub fn for_kind(kind: EntityKind) -> TableName {
        match kind {
            EntityKind::Conversation => TableName::Conversations,
            EntityKind::Message => TableName::Messages,
            EntityKind::ApiConfig => TableName::ApiConfigs,
            EntityKind::Group => TableName::Groups,
            EntityKind::ConversationSetting => TableName::ConversationSettings,
        }
    }

    /// Name of the record field carrying this table's version clock.
    pub fn version_field(&self) -> &'static str {
        match self {
            TableName::Messages => "timestampMs",
            TableName::Tombstones => "deletedAtMs",
            _ => "updatedAtMs",
        }
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of change carried by a [`ChangeRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// Insert or update the record.
    Upsert,
    /// Soft-delete the record and write its tombstone.
    Delete,
}

/// One change in a push batch.
///
/// The record payload stays an open JSON object on the wire; it is
/// validated into its per-table DTO exactly once, at the merge boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Target table.
    pub table: TableName,
    /// Upsert or delete.
    pub op: ChangeOp,
    /// Flat record payload matching the table's wire schema.
    pub record: serde_json::Value,
}

impl ChangeRecord {
    /// Creates an upsert change from a serializable record.
    pub fn upsert<T: Serialize>(table: TableName, record: &T) -> ChangeRecord {
        ChangeRecord {
            table,
            op: ChangeOp::Upsert,
            record: serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Creates a delete change from a serializable record.
    pub fn delete<T: Serialize>(table: TableName, record: &T) -> ChangeRecord {
        ChangeRecord {
            table,
            op: ChangeOp::Delete,
            record: serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Returns the record's version clock, read from the table's
    /// version field, if present and numeric.
    pub fn version(&self) -> Option<i64> {
        self.record.get(self.table.version_field()).and_then(|v| v.as_i64())
    }

    /// Checks that the payload is a JSON object.
    pub fn validate_shape(&self) -> ModelResult<()> {
        if self.record.is_object() {
            Ok(())
        } else {
            Err(ModelError::NotAnObject {
                table: self.table.as_str().to_string(),
            })
        }
    }
}

/// Validates the outer shape of a push batch.
///
/// Rejects the whole batch when it exceeds [`MAX_PUSH_BATCH`] or when any
/// change's payload is not an object. Field-level problems inside a
/// record are not checked here; those are handled per-record at merge
/// time.
pub fn validate_batch(changes: &[ChangeRecord]) -> ModelResult<()> {
    if changes.len() > MAX_PUSH_BATCH {
        return Err(ModelError::BatchTooLarge {
            len: changes.len(),
            max: MAX_PUSH_BATCH,
        });
    }
    for change in changes {
        change.validate_shape()?;
    }
    Ok(())
}
