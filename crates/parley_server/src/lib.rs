//! # Parley Server
//!
//! Authoritative sync server for Parley.
//!
//! This crate provides:
//! - `POST /auth/google`: identity exchange for a bearer token
//! - `POST /sync/push`: transactional LWW merge of a change batch
//! - `GET /sync/pull`: watermark-filtered read across all tables
//! - HMAC-SHA256 bearer tokens
//!
//! # Architecture
//!
//! Each push request is applied inside one store transaction: every
//! change in the batch succeeds or the whole batch rolls back.
//! Correctness under concurrent pushes relies on the LWW comparison
//! being order-independent, not on arrival order; transactions only
//! serialize the writes. Pulls are read-only.
//!
//! The HTTP layer in [`router`] is a thin shell; every handler funnels
//! into [`SyncService`], which tests can also drive directly without a
//! socket.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod config;
mod error;
mod merge;
mod pull;
mod routes;
mod service;

pub use auth::{IdentityVerifier, InsecureVerifier, StaticVerifier, TokenAuthority, VerifiedIdentity};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use merge::{apply_push, PushStats};
pub use pull::pull_since;
pub use routes::router;
pub use service::SyncService;
