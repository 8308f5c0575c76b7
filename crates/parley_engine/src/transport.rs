//! Transport abstraction for sync requests.

use crate::error::{EngineError, EngineResult};
use parking_lot::Mutex;
use parley_model::{AuthRequest, AuthResponse, PullResponse, PushRequest, PushResponse};
use std::sync::atomic::{AtomicBool, Ordering};

/// Network interface the coordinator drives.
///
/// Implement this to supply a different transport (the HTTP JSON
/// implementation lives in [`crate::HttpApi`]; tests route requests
/// straight into server handlers).
pub trait SyncApi: Send + Sync {
    /// Exchanges an external identity credential for a bearer token.
    fn authenticate(&self, request: &AuthRequest) -> EngineResult<AuthResponse>;

    /// Pushes a batch of changes.
    fn push(&self, request: &PushRequest) -> EngineResult<PushResponse>;

    /// Pulls changes with version above `since`.
    fn pull(&self, since: i64) -> EngineResult<PullResponse>;
}

/// A scriptable in-memory [`SyncApi`] for tests.
#[derive(Default)]
pub struct MockApi {
    pull_response: Mutex<PullResponse>,
    pushed: Mutex<Vec<PushRequest>>,
    fail_push: AtomicBool,
    fail_pull: AtomicBool,
}

impl MockApi {
    /// Creates a mock with an empty pull response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the response returned by every subsequent pull.
    pub fn set_pull_response(&self, response: PullResponse) {
        *self.pull_response.lock() = response;
    }

    /// Makes pushes fail with a retryable transport error.
    pub fn fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    /// Makes pulls fail with a retryable transport error.
    pub fn fail_pull(&self, fail: bool) {
        self.fail_pull.store(fail, Ordering::SeqCst);
    }

    /// Returns every push request received so far.
    pub fn pushed(&self) -> Vec<PushRequest> {
        self.pushed.lock().clone()
    }
}

impl SyncApi for MockApi {
    fn authenticate(&self, _request: &AuthRequest) -> EngineResult<AuthResponse> {
        Ok(AuthResponse {
            access_token: "mock-token".to_string(),
        })
    }

    fn push(&self, request: &PushRequest) -> EngineResult<PushResponse> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(EngineError::transport_retryable("mock push failure"));
        }
        self.pushed.lock().push(request.clone());
        Ok(PushResponse::ok())
    }

    fn pull(&self, _since: i64) -> EngineResult<PullResponse> {
        if self.fail_pull.load(Ordering::SeqCst) {
            return Err(EngineError::transport_retryable("mock pull failure"));
        }
        Ok(self.pull_response.lock().clone())
    }
}
