//! Human-readable rotation progress, published lock-free.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use common::record::{RecordKind, RecordRef};
use uuid::Uuid;

/// Snapshot of the most recent rotation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationStatus {
    /// No rotation has run in this process.
    Idle,
    Running {
        job_id: Uuid,
        total: usize,
        completed: usize,
    },
    Completed {
        job_id: Uuid,
        succeeded: usize,
        skipped: usize,
    },
    CompletedWithErrors {
        job_id: Uuid,
        succeeded: usize,
        skipped: usize,
        failed: Vec<RecordRef>,
        unlisted_kinds: Vec<RecordKind>,
    },
}

impl RotationStatus {
    /// Machine-readable state name.
    pub fn state(&self) -> &'static str {
        match self {
            RotationStatus::Idle => "idle",
            RotationStatus::Running { .. } => "running",
            RotationStatus::Completed { .. } => "completed",
            RotationStatus::CompletedWithErrors { .. } => "completed-with-errors",
        }
    }
}

impl fmt::Display for RotationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationStatus::Idle => f.write_str("no rotation has run"),
            RotationStatus::Running {
                total, completed, ..
            } => write!(f, "re-encrypting {total} items… ({completed}/{total} done)"),
            RotationStatus::Completed {
                succeeded, skipped, ..
            } => write!(
                f,
                "rotation completed: {succeeded} re-encrypted, {skipped} unencrypted skipped"
            ),
            RotationStatus::CompletedWithErrors {
                succeeded,
                skipped,
                failed,
                unlisted_kinds,
                ..
            } => {
                write!(
                    f,
                    "rotation completed with errors: {succeeded} re-encrypted, \
                     {skipped} unencrypted skipped, {} failed",
                    failed.len()
                )?;
                if !failed.is_empty() {
                    let ids: Vec<String> = failed.iter().map(ToString::to_string).collect();
                    write!(f, " ({})", ids.join(", "))?;
                }
                if !unlisted_kinds.is_empty() {
                    let kinds: Vec<&str> = unlisted_kinds.iter().map(|k| k.as_str()).collect();
                    write!(f, "; could not list {}", kinds.join(", "))?;
                }
                Ok(())
            }
        }
    }
}

/// Shared board holding the latest [`RotationStatus`].
///
/// Backed by [`ArcSwap`] so status readers never block the rotation tasks.
#[derive(Clone, Debug)]
pub struct StatusBoard {
    inner: Arc<ArcSwap<RotationStatus>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(RotationStatus::Idle)),
        }
    }

    /// Current snapshot.
    pub fn current(&self) -> Arc<RotationStatus> {
        self.inner.load_full()
    }

    /// Replace the snapshot.
    pub fn publish(&self, status: RotationStatus) {
        self.inner.store(Arc::new(status));
    }

    /// Count one more settled record for the running job `job_id`.
    ///
    /// A no-op if the board no longer shows that job as running.
    pub fn advance(&self, job_id: Uuid) {
        self.inner.rcu(|current| match **current {
            RotationStatus::Running {
                job_id: running,
                total,
                completed,
            } if running == job_id => Arc::new(RotationStatus::Running {
                job_id,
                total,
                completed: completed + 1,
            }),
            _ => Arc::clone(current),
        });
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
