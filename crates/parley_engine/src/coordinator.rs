//! The sync coordinator state machine.

use crate::applier::{apply_pull, ApplyCounts};
use crate::collector::{chunk_changes, collect_since};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::transport::SyncApi;
use parking_lot::{Mutex, RwLock};
use parley_model::{DeviceClock, PushRequest};
use parley_store::{EntityStore, TableRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Observable state of the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No cycle in flight.
    Idle,
    /// Pushing local changes.
    Pushing,
    /// Pulling and applying remote changes.
    Pulling,
    /// The push step failed; waiting out backoff before retrying.
    PushFailed,
    /// The pull step failed; waiting out backoff before retrying.
    PullFailed,
}

impl SyncStatus {
    /// Returns true while a cycle is actively running.
    pub fn is_busy(&self) -> bool {
        matches!(self, SyncStatus::Pushing | SyncStatus::Pulling)
    }
}

/// Counters across the coordinator's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Completed push-then-pull cycles.
    pub cycles_completed: u64,
    /// Changes pushed to the server.
    pub changes_pushed: u64,
    /// Records received in pull responses.
    pub records_pulled: u64,
    /// Retries performed after transient failures.
    pub retries: u64,
    /// Message of the most recent failure, cleared on success.
    pub last_error: Option<String>,
}

/// Result of one successful cycle.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Changes pushed.
    pub pushed: usize,
    /// Records received in the pull response.
    pub pulled: usize,
    /// How the pulled records were applied.
    pub applied: ApplyCounts,
    /// Wall-clock duration of the cycle.
    pub duration: Duration,
}

/// Drives the push-then-pull cycle for one device.
///
/// Exactly one cycle runs at a time; triggering while a cycle is in
/// flight is a no-op. Watermarks live in the local store's device-clock
/// row and advance only after the corresponding step fully succeeds:
/// `updatedAt` after the server accepted every pushed batch, and
/// `lastPullAt` after the whole pull response was applied. A failure or
/// cancellation at any point leaves both watermarks where they were, so
/// the next trigger repeats the same (idempotent) work.
pub struct SyncCoordinator<A: SyncApi> {
    config: EngineConfig,
    api: Arc<A>,
    store: Arc<dyn EntityStore>,
    registry: TableRegistry,
    user: String,
    status: RwLock<SyncStatus>,
    stats: RwLock<SyncStats>,
    in_flight: Mutex<()>,
    cancelled: AtomicBool,
}

impl<A: SyncApi> SyncCoordinator<A> {
    /// Creates a coordinator for one user on one device.
    pub fn new(
        config: EngineConfig,
        api: A,
        store: Arc<dyn EntityStore>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            config,
            api: Arc::new(api),
            store,
            registry: TableRegistry::standard(),
            user: user.into(),
            status: RwLock::new(SyncStatus::Idle),
            stats: RwLock::new(SyncStats::default()),
            in_flight: Mutex::new(()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        *self.status.read()
    }

    /// The transport this coordinator drives.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Lifetime counters.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Requests cancellation of the in-flight cycle. The current
    /// network call still runs to completion; the cycle aborts at the
    /// next step boundary with watermarks untouched.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Triggers a sync cycle.
    ///
    /// Returns `Ok(None)` without doing anything when a cycle is
    /// already in flight. Transient failures are retried with backoff
    /// up to the configured attempt budget; exhausting it returns the
    /// last error, which the application layer should surface as a
    /// failed-sync state.
    pub fn trigger(&self) -> EngineResult<Option<SyncOutcome>> {
        let Some(_guard) = self.in_flight.try_lock() else {
            tracing::debug!("sync trigger ignored, cycle already in flight");
            return Ok(None);
        };
        self.cancelled.store(false, Ordering::SeqCst);
        let result = self.run_with_retry();
        match &result {
            Ok(outcome) => {
                tracing::debug!(
                    pushed = outcome.pushed,
                    pulled = outcome.pulled,
                    "sync cycle complete"
                );
            }
            Err(err) => {
                tracing::warn!(error = %err, "sync cycle failed");
            }
        }
        result.map(Some)
    }

    fn run_with_retry(&self) -> EngineResult<SyncOutcome> {
        let retry = self.config.retry.clone();
        let mut last_error = None;

        for attempt in 0..retry.max_attempts {
            if attempt > 0 {
                std::thread::sleep(retry.delay_for_attempt(attempt));
                self.stats.write().retries += 1;
            }
            self.check_cancelled()?;

            match self.run_cycle() {
                Ok(outcome) => {
                    let mut stats = self.stats.write();
                    stats.cycles_completed += 1;
                    stats.changes_pushed += outcome.pushed as u64;
                    stats.records_pulled += outcome.pulled as u64;
                    stats.last_error = None;
                    return Ok(outcome);
                }
                Err(err) => {
                    self.stats.write().last_error = Some(err.to_string());
                    if err.is_retryable() && attempt + 1 < retry.max_attempts {
                        last_error = Some(err);
                        continue;
                    }
                    self.set_status(SyncStatus::Idle);
                    return Err(err);
                }
            }
        }

        self.set_status(SyncStatus::Idle);
        Err(last_error.unwrap_or_else(|| EngineError::Protocol("no sync attempts made".into())))
    }

    fn run_cycle(&self) -> EngineResult<SyncOutcome> {
        let start = Instant::now();
        let device_id = self.config.device_id.clone();
        let mut clock = self
            .store
            .device_clock(&self.user, &device_id)?
            .unwrap_or_else(|| DeviceClock::new(device_id.clone()));

        // Push phase.
        self.set_status(SyncStatus::Pushing);
        let (pushed, push_ceiling) = match self.push_pending(&device_id, clock.updated_at) {
            Ok(v) => v,
            Err(err) => {
                self.set_status(SyncStatus::PushFailed);
                return Err(err);
            }
        };
        if push_ceiling > clock.updated_at {
            clock.updated_at = push_ceiling;
            self.store.put_device_clock(&self.user, clock.clone())?;
        }

        // Pull phase.
        self.set_status(SyncStatus::Pulling);
        let (pulled, max_version, applied) = match self.pull_and_apply(clock.last_pull_at) {
            Ok(v) => v,
            Err(err) => {
                self.set_status(SyncStatus::PullFailed);
                return Err(err);
            }
        };
        if let Some(max_version) = max_version {
            if max_version > clock.last_pull_at {
                clock.last_pull_at = max_version;
                self.store.put_device_clock(&self.user, clock)?;
            }
        }

        self.set_status(SyncStatus::Idle);
        Ok(SyncOutcome {
            pushed,
            pulled,
            applied,
            duration: start.elapsed(),
        })
    }

    /// Pushes everything modified since the push watermark. Returns the
    /// number of changes pushed and the highest version among them,
    /// which becomes the new watermark once the server has accepted
    /// every batch.
    fn push_pending(&self, device_id: &str, since: i64) -> EngineResult<(usize, i64)> {
        let changes = collect_since(self.store.as_ref(), &self.registry, &self.user, since)?;
        let ceiling = changes
            .iter()
            .filter_map(|change| change.version())
            .max()
            .unwrap_or(since);
        let total = changes.len();

        for batch in chunk_changes(changes, self.config.push_batch_size) {
            self.check_cancelled()?;
            self.api.push(&PushRequest {
                device_id: device_id.to_string(),
                changes: batch,
            })?;
        }
        Ok((total, ceiling))
    }

    /// Pulls changes since the pull watermark and applies them.
    fn pull_and_apply(&self, since: i64) -> EngineResult<(usize, Option<i64>, ApplyCounts)> {
        self.check_cancelled()?;
        let response = self.api.pull(since)?;
        let applied = apply_pull(self.store.as_ref(), &self.registry, &self.user, &response)?;
        Ok((response.record_count(), response.max_version(), applied))
    }

    fn set_status(&self, status: SyncStatus) {
        *self.status.write() = status;
    }

    fn check_cancelled(&self) -> EngineResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            self.set_status(SyncStatus::Idle);
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}
