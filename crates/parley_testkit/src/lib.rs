//! # Parley Testkit
//!
//! Fixtures shared by the Parley test suites.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod fixtures;

pub use fixtures::{
    api_config, conversation, group, message, seeded_store, setting, tombstone,
};
