//! # Parley Engine
//!
//! Client-side sync engine for Parley.
//!
//! This crate provides:
//! - Local change collection since a push watermark
//! - Remote change application under the LWW + tombstone rule
//! - The sync coordinator state machine (idle, pushing, pulling)
//! - Retry with exponential backoff
//! - Transport abstraction with an HTTP JSON implementation
//!
//! ## Architecture
//!
//! One coordinator instance runs per process and drives a
//! **push-then-pull** cycle: collect everything modified since the last
//! successful push, push it in bounded batches, then pull and apply
//! remote changes since the last pull watermark. Watermarks advance only
//! after each step fully succeeds, so an interrupted cycle retries from
//! the same position. Pushes and pulls are idempotent; repeating either
//! is always safe.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod applier;
mod collector;
mod config;
mod coordinator;
mod error;
mod http;
mod transport;

pub use applier::{apply_pull, ApplyCounts};
pub use collector::{chunk_changes, collect_since};
pub use config::{EngineConfig, RetryConfig};
pub use coordinator::{SyncCoordinator, SyncOutcome, SyncStats, SyncStatus};
pub use error::{EngineError, EngineResult};
pub use http::{HttpApi, HttpClient, HttpResponse, ReqwestClient};
pub use transport::{MockApi, SyncApi};
