//! # Parley Store
//!
//! Entity store contract and in-memory implementation for Parley.
//!
//! This crate provides:
//! - The [`EntityStore`] CRUD contract shared by client and server
//! - [`MemoryStore`], a lock-guarded in-memory implementation with a
//!   transactional entry point
//! - The shared LWW + tombstone merge operations
//! - [`TableRegistry`], typed per-table dispatch for push batches
//!
//! Embedded storage engines beyond this contract are out of scope; any
//! backend that implements [`EntityStore`] plugs into the sync engine
//! and server unchanged.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod memory;
mod registry;
mod store;
mod typed;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use registry::{EntityHandler, TableHandler, TableRegistry, TombstoneHandler, ValidRecord};
pub use store::{apply_tombstone, delete_record, merge_upsert, EntityStore, StoredRow};
pub use typed::{get_record, modified_records, upsert_record};
