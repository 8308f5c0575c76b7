//! Server configuration.

use parley_model::MAX_PUSH_BATCH;
use std::time::Duration;

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: String,
    /// HMAC secret for bearer tokens.
    pub secret: Vec<u8>,
    /// Bearer token lifetime.
    pub token_expiry: Duration,
    /// Maximum changes accepted per push request.
    pub max_push_batch: usize,
}

impl ServerConfig {
    /// Creates a configuration with the given token secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".to_string(),
            secret: secret.into(),
            token_expiry: Duration::from_secs(24 * 60 * 60),
            max_push_batch: MAX_PUSH_BATCH,
        }
    }

    /// Sets the bind address.
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    /// Sets the token lifetime.
    pub fn with_token_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }

    /// Sets the per-request batch bound, clamped to the protocol limit.
    pub fn with_max_push_batch(mut self, max: usize) -> Self {
        self.max_push_batch = max.clamp(1, MAX_PUSH_BATCH);
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(b"parley-dev-secret-change-me".to_vec())
    }
}
