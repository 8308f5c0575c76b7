//! # Parley Model
//!
//! Shared entity schema and sync protocol types for Parley.
//!
//! This crate provides:
//! - Per-entity DTOs with documented field defaults
//! - Tombstone and device clock records
//! - `ChangeRecord` for the uniform push wire shape
//! - The LWW + tombstone merge decision rule
//! - The JSON-string list codec used for list-valued fields
//!
//! This is a pure schema crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod codec;
mod device;
mod entity;
mod error;
mod merge;
mod tombstone;
mod wire;

pub use change::{validate_batch, ChangeOp, ChangeRecord, TableName, MAX_PUSH_BATCH};
pub use codec::{decode_list, encode_list};
pub use device::DeviceClock;
pub use entity::{
    ApiConfig, Conversation, ConversationKind, ConversationSetting, EntityKind, Group, Message,
    Syncable,
};
pub use error::{ModelError, ModelResult};
pub use merge::{merge_decision, tombstone_governs, MergeDecision};
pub use tombstone::Tombstone;
pub use wire::{AuthRequest, AuthResponse, ErrorBody, PullResponse, PushRequest, PushResponse};

/// Generates a new client-side record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Returns the current wall-clock time as Unix milliseconds.
///
/// Client-supplied values of this clock are the sole ordering authority
/// for merges; see the crate-level discussion of clock skew in DESIGN.md.
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
