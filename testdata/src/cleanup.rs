//! Per-test tracking of created entities and reverse-order teardown.
//!
//! The tracker observes every successful create during a test, keeps the
//! entries as a stack, and drains them last-in-first-out at test end so
//! dependents are always deleted before the entities they reference.
//! Draining is best-effort: individual failures are logged and aggregated,
//! never allowed to abort the remaining queue.

use crate::entity::{EntityError, EntityResult};
use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Deletes one remote resource by identifier on behalf of the tracker.
/// Implemented by `Repository<E>`, which applies the kind's delete policy.
#[async_trait]
pub trait CleanupHandle: Send + Sync {
    fn kind(&self) -> &'static str;

    async fn delete_identifier(&self, id: &str) -> EntityResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerPhase {
    Idle,
    Recording,
    Draining,
}

#[derive(Clone)]
struct TrackedEntity {
    kind: &'static str,
    id: String,
    handle: Arc<dyn CleanupHandle>,
}

#[derive(Debug)]
pub struct CleanupFailure {
    pub kind: &'static str,
    pub id: String,
    pub error: EntityError,
}

/// Aggregate outcome of one drain pass. Failures are diagnostics for the
/// suite, not a verdict on the test that just ran.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entities deleted", self.deleted)?;
        if self.failures.is_empty() {
            return Ok(());
        }
        write!(f, ", {} failed:", self.failures.len())?;
        for failure in &self.failures {
            write!(f, " [{} {}: {}]", failure.kind, failure.id, failure.error)?;
        }
        Ok(())
    }
}

struct TrackerState {
    phase: TrackerPhase,
    stack: Vec<TrackedEntity>,
}

/// Stack of `(kind, identifier, handle)` entries scoped to one test
/// execution. Never shared across concurrently running tests.
pub struct CleanupTracker {
    state: Mutex<TrackerState>,
}

impl CleanupTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState {
                phase: TrackerPhase::Idle,
                stack: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn phase(&self) -> TrackerPhase {
        self.lock().phase
    }

    pub fn tracked_count(&self) -> usize {
        self.lock().stack.len()
    }

    pub fn is_tracked(&self, kind: &str, id: &str) -> bool {
        self.lock()
            .stack
            .iter()
            .any(|entry| entry.kind == kind && entry.id == id)
    }

    pub fn on_test_start(&self) {
        let mut state = self.lock();
        state.stack.clear();
        state.phase = TrackerPhase::Recording;
    }

    pub fn on_entity_created(&self, kind: &'static str, id: String, handle: Arc<dyn CleanupHandle>) {
        let mut state = self.lock();
        if state.phase != TrackerPhase::Recording {
            warn!(kind, %id, "entity created outside a recording window; tracking anyway");
        }
        debug!(kind, %id, "tracking entity for cleanup");
        state.stack.push(TrackedEntity { kind, id, handle });
    }

    /// Manual-delete notification: the matching entry leaves the stack so
    /// the drain pass does not delete it a second time.
    pub fn on_entity_deleted(&self, kind: &str, id: &str) {
        let mut state = self.lock();
        if let Some(position) = state
            .stack
            .iter()
            .position(|entry| entry.kind == kind && entry.id == id)
        {
            state.stack.remove(position);
            debug!(kind, id, "entity removed from cleanup tracking");
        }
    }

    /// Drain the stack top-down, deleting every tracked entity through its
    /// handle. `NotFound` counts as success (the resource is already gone);
    /// other failures are recorded and the drain continues. The stack is
    /// empty and the tracker idle afterwards regardless of outcome.
    pub async fn on_test_end(&self) -> CleanupReport {
        let drained = {
            let mut state = self.lock();
            state.phase = TrackerPhase::Draining;
            std::mem::take(&mut state.stack)
        };

        let mut report = CleanupReport::default();
        for entry in drained.into_iter().rev() {
            match entry.handle.delete_identifier(&entry.id).await {
                Ok(()) => {
                    debug!(kind = entry.kind, id = %entry.id, "cleaned up entity");
                    report.deleted += 1;
                }
                Err(EntityError::NotFound { .. }) => {
                    debug!(kind = entry.kind, id = %entry.id, "entity already gone");
                    report.deleted += 1;
                }
                Err(error) => {
                    warn!(kind = entry.kind, id = %entry.id, %error, "cleanup deletion failed");
                    report.failures.push(CleanupFailure {
                        kind: entry.kind,
                        id: entry.id,
                        error,
                    });
                }
            }
        }

        {
            let mut state = self.lock();
            state.stack.clear();
            state.phase = TrackerPhase::Idle;
        }

        if !report.is_clean() {
            warn!(%report, "test data cleanup finished with failures");
        }
        report
    }
}

impl Default for CleanupTracker {
    fn default() -> Self {
        Self::new()
    }
}
