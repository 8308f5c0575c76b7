//! Entity DTOs for the five synchronized tables.
//!
//! Every record carries a client-generated `id` (settings use the owning
//! `conversationId`) and a millisecond version clock. Fields other than
//! identity and version are lenient: a missing or mistyped value falls
//! back to a documented default at deserialization time instead of
//! rejecting the record, so batches from older or foreign clients still
//! apply. List-valued fields travel as JSON-encoded strings; see
//! [`crate::encode_list`].

use serde::{Deserialize, Serialize};

/// The five synchronized entity types, by wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    /// A chat conversation.
    Conversation,
    /// A single message inside a conversation.
    Message,
    /// A model/provider configuration.
    ApiConfig,
    /// A named group of conversations.
    Group,
    /// Per-conversation settings (1:1 with its conversation).
    ConversationSetting,
}

impl EntityKind {
    /// All entity kinds, in pull-response order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Conversation,
        EntityKind::Message,
        EntityKind::ApiConfig,
        EntityKind::Group,
        EntityKind::ConversationSetting,
    ];

    /// Returns the wire name used in tombstone `kind` fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Conversation => "conversation",
            EntityKind::Message => "message",
            EntityKind::ApiConfig => "apiConfig",
            EntityKind::Group => "group",
            EntityKind::ConversationSetting => "conversationSetting",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record that participates in LWW synchronization.
///
/// The version clock is the record's own millisecond timestamp field;
/// for messages the creation timestamp doubles as the version.
pub trait Syncable {
    /// The entity table this record belongs to.
    const KIND: EntityKind;

    /// Stable identity of the record.
    fn entity_id(&self) -> &str;

    /// Version clock in Unix milliseconds.
    fn version(&self) -> i64;

    /// Overwrites the version clock (used when a deletion timestamp
    /// becomes the row's new version).
    fn set_version(&mut self, version_ms: i64);
}

/// Conversation modality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConversationKind {
    /// Text chat conversation.
    #[default]
    Text,
    /// Image generation conversation.
    Image,
}

fn default_role() -> String {
    "user".to_string()
}

fn empty_list() -> String {
    "[]".to_string()
}

fn empty_object() -> String {
    "{}".to_string()
}

/// A chat conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Client-generated, globally unique identifier.
    pub id: String,
    /// Conversation modality. Defaults to TEXT.
    #[serde(rename = "type", default)]
    pub kind: ConversationKind,
    /// Display title. Missing titles default to empty.
    #[serde(default)]
    pub title: String,
    /// System prompt applied to the conversation.
    #[serde(default)]
    pub system_prompt: String,
    /// Creation time in Unix milliseconds.
    #[serde(default)]
    pub created_at_ms: i64,
    /// Whether the conversation is pinned.
    #[serde(default)]
    pub is_pinned: bool,
    /// Sort position among pinned conversations.
    #[serde(default)]
    pub pinned_order: i64,
    /// Version clock.
    #[serde(default)]
    pub updated_at_ms: i64,
}

impl Syncable for Conversation {
    const KIND: EntityKind = EntityKind::Conversation;

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.updated_at_ms
    }

    fn set_version(&mut self, version_ms: i64) {
        self.updated_at_ms = version_ms;
    }
}

/// A single chat message.
///
/// Messages hold a weak reference to their conversation: the referenced
/// conversation may not exist locally yet when the message arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Client-generated identifier.
    pub id: String,
    /// Owning conversation (weak reference, not enforced at sync time).
    #[serde(default)]
    pub conversation_id: String,
    /// Message body.
    #[serde(default)]
    pub text: String,
    /// Author role. Missing roles default to "user".
    #[serde(default = "default_role")]
    pub role: String,
    /// Model reasoning trace, when present.
    #[serde(default)]
    pub reasoning: String,
    /// Whether the message records a failed completion.
    #[serde(default)]
    pub is_error: bool,
    /// Attached images as a JSON-encoded string list.
    #[serde(default = "empty_list")]
    pub images_json: String,
    /// Creation time in Unix milliseconds; doubles as the version clock.
    #[serde(default)]
    pub timestamp_ms: i64,
}

impl Syncable for Message {
    const KIND: EntityKind = EntityKind::Message;

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.timestamp_ms
    }

    fn set_version(&mut self, version_ms: i64) {
        self.timestamp_ms = version_ms;
    }
}

/// A model/provider configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiConfig {
    /// Client-generated identifier.
    pub id: String,
    /// Provider name, e.g. "openai".
    #[serde(default)]
    pub provider: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// API base URL.
    #[serde(default)]
    pub base_url: String,
    /// API key. Carried verbatim; the sync layer does not interpret it.
    #[serde(default)]
    pub api_key: String,
    /// Available model names as a JSON-encoded string list.
    #[serde(default = "empty_list")]
    pub models_json: String,
    /// Provider channel or deployment variant.
    #[serde(default)]
    pub channel: String,
    /// Enabled tool definitions as a JSON-encoded string list.
    #[serde(default = "empty_list")]
    pub tools_json: String,
    /// Modality this config serves, e.g. "text" or "image".
    #[serde(default)]
    pub modality: String,
    /// Whether this is the default config for its modality.
    #[serde(default)]
    pub is_default: bool,
    /// Version clock.
    #[serde(default)]
    pub updated_at_ms: i64,
}

impl Syncable for ApiConfig {
    const KIND: EntityKind = EntityKind::ApiConfig;

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.updated_at_ms
    }

    fn set_version(&mut self, version_ms: i64) {
        self.updated_at_ms = version_ms;
    }
}

/// A named group of conversations.
///
/// Groups are identified by `id`; the `name` field is plain data and is
/// never used as an identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Client-generated identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Member conversation ids as a JSON-encoded string list
    /// (weak references).
    #[serde(default = "empty_list")]
    pub conversation_ids_json: String,
    /// Version clock.
    #[serde(default)]
    pub updated_at_ms: i64,
}

impl Syncable for Group {
    const KIND: EntityKind = EntityKind::Group;

    fn entity_id(&self) -> &str {
        &self.id
    }

    fn version(&self) -> i64 {
        self.updated_at_ms
    }

    fn set_version(&mut self, version_ms: i64) {
        self.updated_at_ms = version_ms;
    }
}

/// Per-conversation settings, keyed by the owning conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSetting {
    /// The owning conversation's id (this record's identity).
    pub conversation_id: String,
    /// Conversation modality the settings apply to.
    #[serde(rename = "type", default)]
    pub kind: ConversationKind,
    /// Text-mode settings as a JSON-encoded object.
    #[serde(default = "empty_object")]
    pub text_json: String,
    /// Image-mode settings as a JSON-encoded object.
    #[serde(default = "empty_object")]
    pub image_json: String,
    /// Version clock.
    #[serde(default)]
    pub updated_at_ms: i64,
}

impl Syncable for ConversationSetting {
    const KIND: EntityKind = EntityKind::ConversationSetting;

    fn entity_id(&self) -> &str {
        &self.conversation_id
    }

    fn version(&self) -> i64 {
        self.updated_at_ms
    }

    fn set_version(&mut self, version_ms: i64) {
        self.updated_at_ms = version_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_kind_wire_names() {
        assert_eq!(EntityKind::Conversation.as_str(), "conversation");
        assert_eq!(EntityKind::ApiConfig.as_str(), "apiConfig");
        assert_eq!(EntityKind::ConversationSetting.as_str(), "conversationSetting");

        let json = serde_json::to_string(&EntityKind::ApiConfig).unwrap();
        assert_eq!(json, "\"apiConfig\"");
    }

    #[test]
    fn conversation_defaults() {
        // Only identity present: every other field is coerced to a default.
        let conv: Conversation = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "updatedAtMs": 100
        }))
        .unwrap();

        assert_eq!(conv.kind, ConversationKind::Text);
        assert_eq!(conv.title, "");
        assert!(!conv.is_pinned);
        assert_eq!(conv.version(), 100);
    }

    #[test]
    fn conversation_missing_id_rejected() {
        let result: Result<Conversation, _> = serde_json::from_value(serde_json::json!({
            "title": "no identity",
            "updatedAtMs": 100
        }));
        assert!(result.is_err());
    }

    #[test]
    fn message_role_defaults_to_user() {
        let msg: Message = serde_json::from_value(serde_json::json!({
            "id": "m1",
            "conversationId": "c1",
            "text": "hi",
            "timestampMs": 5
        }))
        .unwrap();

        assert_eq!(msg.role, "user");
        assert_eq!(msg.images_json, "[]");
        assert_eq!(msg.version(), 5);
    }

    #[test]
    fn conversation_type_wire_values() {
        let conv: Conversation = serde_json::from_value(serde_json::json!({
            "id": "c1",
            "type": "IMAGE",
            "updatedAtMs": 1
        }))
        .unwrap();
        assert_eq!(conv.kind, ConversationKind::Image);

        let round = serde_json::to_value(&conv).unwrap();
        assert_eq!(round["type"], "IMAGE");
    }

    #[test]
    fn setting_identity_is_conversation_id() {
        let setting: ConversationSetting = serde_json::from_value(serde_json::json!({
            "conversationId": "c9",
            "updatedAtMs": 7
        }))
        .unwrap();
        assert_eq!(setting.entity_id(), "c9");
        assert_eq!(setting.text_json, "{}");
    }

    #[test]
    fn set_version_overwrites_clock() {
        let mut group: Group = serde_json::from_value(serde_json::json!({
            "id": "g1",
            "name": "work",
            "updatedAtMs": 10
        }))
        .unwrap();

        group.set_version(20);
        assert_eq!(group.version(), 20);
    }
}
