//! JSON bodies of the sync and auth endpoints.

use crate::change::ChangeRecord;
use crate::entity::{ApiConfig, Conversation, ConversationSetting, Group, Message, Syncable};
use crate::tombstone::Tombstone;
use serde::{Deserialize, Serialize};

/// Body of `POST /auth/google`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    /// External identity credential to exchange.
    pub id_token: String,
    /// Device registering for sync.
    pub device_id: String,
}

/// Successful response of `POST /auth/google`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Service-issued bearer token carrying the stable user id.
    pub access_token: String,
}

/// Body of `POST /sync/push`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    /// Device issuing the batch.
    pub device_id: String,
    /// Changes to apply, at most [`crate::MAX_PUSH_BATCH`].
    pub changes: Vec<ChangeRecord>,
}

/// Successful response of `POST /sync/push`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    /// Always true; errors are carried by [`ErrorBody`] instead.
    pub ok: bool,
}

impl PushResponse {
    /// The success response.
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// Error body returned by any endpoint on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error description.
    pub error: String,
}

impl ErrorBody {
    /// Creates an error body from any displayable error.
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

/// Response of `GET /sync/pull?since=<millis>`.
///
/// Record ordering inside each array is unspecified; clients must apply
/// tombstones before entity tables regardless of order here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Server-observed time at response creation, Unix milliseconds.
    /// Informational only: watermarks advance by record versions, not
    /// by this value.
    pub now: i64,
    /// Conversations with version above the watermark.
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    /// Messages with version above the watermark.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Api configs with version above the watermark.
    #[serde(default)]
    pub api_configs: Vec<ApiConfig>,
    /// Groups with version above the watermark.
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Conversation settings with version above the watermark.
    #[serde(default)]
    pub conversation_settings: Vec<ConversationSetting>,
    /// Tombstones with deletion time above the watermark.
    #[serde(default)]
    pub tombstones: Vec<Tombstone>,
}

impl PullResponse {
    /// Returns true when no table carries any record.
    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    /// Total number of records across all tables.
    pub fn record_count(&self) -> usize {
        self.conversations.len()
            + self.messages.len()
            + self.api_configs.len()
            + self.groups.len()
            + self.conversation_settings.len()
            + self.tombstones.len()
    }

    /// Highest version clock present in the response, if any.
    ///
    /// This is the value the next pull watermark advances to. Using the
    /// maximum version actually seen, rather than the server's `now`,
    /// means a record committed concurrently with the pull is picked up
    /// by the next cycle instead of being skipped forever.
    pub fn max_version(&self) -> Option<i64> {
        let mut max: Option<i64> = None;
        let mut observe = |v: i64| {
            max = Some(max.map_or(v, |m: i64| m.max(v)));
        };
        for c in &self.conversations {
            observe(c.version());
        }
        for m in &self.messages {
            observe(m.version());
        }
        for a in &self.api_configs {
            observe(a.version());
        }
        for g in &self.groups {
            observe(g.version());
        }
        for s in &self.conversation_settings {
            observe(s.version());
        }
        for t in &self.tombstones {
            observe(t.deleted_at_ms);
        }
        max
    }
}
