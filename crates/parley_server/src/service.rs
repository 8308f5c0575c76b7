//! The sync service behind the HTTP routes.

use crate::auth::{IdentityVerifier, TokenAuthority};
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::merge::{apply_push, PushStats};
use crate::pull::pull_since;
use parley_model::{AuthRequest, AuthResponse, DeviceClock, PullResponse, PushRequest, PushResponse};
use parley_store::{EntityStore, MemoryStore, TableRegistry};
use std::sync::Arc;

/// Request handling core for the sync server.
///
/// The HTTP layer is a thin shell over this type; tests drive it
/// directly. Every method is scoped to the user decoded from the
/// bearer token, never to anything the request body claims.
pub struct SyncService {
    config: ServerConfig,
    store: Arc<MemoryStore>,
    registry: TableRegistry,
    tokens: TokenAuthority,
    verifier: Arc<dyn IdentityVerifier>,
}

impl SyncService {
    /// Creates a service with a fresh store.
    pub fn new(config: ServerConfig, verifier: Arc<dyn IdentityVerifier>) -> Self {
        Self::with_store(config, verifier, Arc::new(MemoryStore::new()))
    }

    /// Creates a service over an existing store.
    pub fn with_store(
        config: ServerConfig,
        verifier: Arc<dyn IdentityVerifier>,
        store: Arc<MemoryStore>,
    ) -> Self {
        let tokens = TokenAuthority::new(config.secret.clone(), config.token_expiry);
        Self {
            config,
            store,
            registry: TableRegistry::standard(),
            tokens,
            verifier,
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// The configuration this service runs with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Exchanges an identity credential for a bearer token and
    /// guarantees a device clock row exists for `(user, device)`.
    pub fn handle_auth(&self, request: &AuthRequest) -> ServerResult<AuthResponse> {
        if request.device_id.is_empty() {
            return Err(ServerError::InvalidRequest("deviceId must not be empty".into()));
        }

        let identity = self.verifier.verify(&request.id_token)?;
        tracing::debug!(user = %identity.user_id, device = %request.device_id, "issuing token");

        if self
            .store
            .device_clock(&identity.user_id, &request.device_id)?
            .is_none()
        {
            self.store.put_device_clock(
                &identity.user_id,
                DeviceClock::new(request.device_id.clone()),
            )?;
        }

        let access_token = self.tokens.issue(&identity.user_id)?;
        Ok(AuthResponse { access_token })
    }

    /// Validates a bearer token and returns the user it belongs to.
    pub fn authorize(&self, bearer: Option<&str>) -> ServerResult<String> {
        let token = bearer.ok_or_else(|| ServerError::Unauthorized("missing bearer token".into()))?;
        self.tokens.verify(token)
    }

    /// Applies a push batch for an authenticated user.
    pub fn handle_push(&self, user: &str, request: &PushRequest) -> ServerResult<PushResponse> {
        if request.device_id.is_empty() {
            return Err(ServerError::InvalidRequest("deviceId must not be empty".into()));
        }
        if request.changes.len() > self.config.max_push_batch {
            return Err(ServerError::InvalidRequest(format!(
                "batch of {} changes exceeds the limit of {}",
                request.changes.len(),
                self.config.max_push_batch
            )));
        }

        let stats: PushStats = apply_push(
            &self.store,
            &self.registry,
            user,
            &request.device_id,
            &request.changes,
        )?;
        tracing::debug!(
            user,
            device = %request.device_id,
            applied = stats.applied,
            stale = stats.skipped_stale,
            tombstoned = stats.skipped_tombstoned,
            invalid = stats.skipped_invalid,
            "push applied"
        );
        Ok(PushResponse::ok())
    }

    /// Serves a pull for an authenticated user.
    pub fn handle_pull(&self, user: &str, since: i64) -> ServerResult<PullResponse> {
        pull_since(self.store.as_ref(), user, since)
    }
}
