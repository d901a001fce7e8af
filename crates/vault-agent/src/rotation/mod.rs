//! Passphrase rotation across every record kind a user owns.
//!
//! # Protocol
//!
//! 1. Reject empty or identical passphrases (and an empty owner id) before any
//!    record is touched.
//! 2. List every [`RecordKind`] for the owner.
//! 3. Unencrypted records are reported as skipped and never written.
//! 4. Each encrypted record is rotated independently in its own task:
//!    decrypt under the old passphrase, re-encrypt under the new one with a
//!    fresh iv and salt, then `update_envelope`. A failure is recorded as data
//!    and never affects another record. Nothing is retried.
//! 5. After every task has settled, the new passphrase becomes active in the
//!    session and the full report is returned.
//!
//! # Partial failure
//!
//! The new passphrase is activated even when some records failed. Those
//! records stay encrypted under the old passphrase; the report (and the
//! terminal [`RotationStatus`]) names each of them so the caller can run a
//! corrective rotation with the old passphrase.

pub mod status;

pub use status::{RotationStatus, StatusBoard};

use std::sync::Arc;

use common::envelope::Envelope;
use common::protocol::{RotateResponse, RotationOutcome};
use common::record::{DiscoveryError, OutcomeStatus, RecordKind, RecordOutcome, RecordRef};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::crypto::{self, Passphrase};
use crate::records::{RecordStore, UpdateOutcome};
use crate::session::{PassphraseSession, RotationGuard, SessionError};

/// Default upper bound on concurrently running per-record tasks.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Errors that end a rotation without a report.
#[derive(Debug, Error)]
pub enum RotationError {
    /// Missing owner or passphrase, or old and new passphrases are equal.
    #[error("invalid rotation request: {0}")]
    InvalidRequest(&'static str),

    /// The session refused the rotation (another rotation is running).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The rotation task panicked before producing a report.
    #[error("rotation task did not complete")]
    Aborted,
}

/// Everything a rotation run produced.
#[derive(Debug, Clone)]
pub struct RotationReport {
    pub job_id: Uuid,
    /// One entry per listed record, in no particular order.
    pub outcomes: Vec<RecordOutcome>,
    /// Kinds whose listing failed; none of their records were visited.
    pub discovery_errors: Vec<DiscoveryError>,
}

impl RotationReport {
    fn count(&self, status: OutcomeStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(OutcomeStatus::Success)
    }

    pub fn skipped(&self) -> usize {
        self.count(OutcomeStatus::SkippedUnencrypted)
    }

    /// Records that are still encrypted under the old passphrase.
    pub fn failed(&self) -> Vec<RecordRef> {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
            .map(RecordOutcome::record_ref)
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.discovery_errors.is_empty() || self.count(OutcomeStatus::Failed) > 0
    }

    pub fn outcome(&self) -> RotationOutcome {
        if self.has_failures() {
            RotationOutcome::CompletedWithErrors
        } else {
            RotationOutcome::Completed
        }
    }

    /// Terminal status for the progress board.
    pub fn status(&self) -> RotationStatus {
        if self.has_failures() {
            RotationStatus::CompletedWithErrors {
                job_id: self.job_id,
                succeeded: self.succeeded(),
                skipped: self.skipped(),
                failed: self.failed(),
                unlisted_kinds: self.discovery_errors.iter().map(|e| e.kind).collect(),
            }
        } else {
            RotationStatus::Completed {
                job_id: self.job_id,
                succeeded: self.succeeded(),
                skipped: self.skipped(),
            }
        }
    }
}

impl From<RotationReport> for RotateResponse {
    fn from(report: RotationReport) -> Self {
        RotateResponse {
            job_id: report.job_id,
            status: report.outcome(),
            message: report.status().to_string(),
            outcomes: report.outcomes,
            discovery_errors: report.discovery_errors,
        }
    }
}

/// Drives decrypt-under-old / encrypt-under-new over all of a user's records.
#[derive(Clone)]
pub struct RotationCoordinator {
    store: Arc<dyn RecordStore>,
    session: PassphraseSession,
    status: StatusBoard,
    concurrency: usize,
}

impl RotationCoordinator {
    /// Create a coordinator. `concurrency` is clamped to at least 1.
    pub fn new(
        store: Arc<dyn RecordStore>,
        session: PassphraseSession,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            session,
            status: StatusBoard::new(),
            concurrency: concurrency.max(1),
        }
    }

    /// Progress board for the most recent run.
    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Rotate every encrypted record of `owner_id` from `old` to `new`.
    ///
    /// Only the precondition check can fail; per-record and per-kind failures
    /// are returned inside the [`RotationReport`].
    ///
    /// Once the session is held, the sweep and the activation run in a
    /// detached task. Dropping the returned future (a client disconnect, a
    /// caller timeout) does not cancel the run: the records, the session and
    /// the status board still reach the same terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`RotationError::InvalidRequest`] for an empty owner id, an
    /// empty passphrase, or equal passphrases, [`RotationError::Session`]
    /// if another rotation is already running, and [`RotationError::Aborted`]
    /// if the rotation task panicked.
    pub async fn rotate(
        &self,
        owner_id: &str,
        old: &str,
        new: &str,
    ) -> Result<RotationReport, RotationError> {
        let (old, new) = validate(owner_id, old, new)?;
        let guard = self.session.begin_rotation().await?;
        let job_id = Uuid::new_v4();

        let coordinator = self.clone();
        let owner_id = owner_id.to_owned();
        let run = tokio::spawn(
            async move { coordinator.run(guard, job_id, &owner_id, old, new).await }
                .instrument(info_span!("rotation", %job_id)),
        );
        run.await.map_err(|e| {
            error!(%job_id, error = %e, "rotation task did not complete");
            RotationError::Aborted
        })
    }

    async fn run(
        &self,
        guard: RotationGuard,
        job_id: Uuid,
        owner_id: &str,
        old: Passphrase,
        new: Passphrase,
    ) -> RotationReport {
        let report = self.sweep(job_id, owner_id, old, new.clone()).await;

        guard.activate(new).await;
        self.status.publish(report.status());

        if report.has_failures() {
            warn!(
                succeeded = report.succeeded(),
                failed = report.failed().len(),
                unlisted_kinds = report.discovery_errors.len(),
                "rotation completed with errors; new passphrase is active"
            );
        } else {
            info!(
                succeeded = report.succeeded(),
                skipped = report.skipped(),
                "rotation completed"
            );
        }
        report
    }

    async fn sweep(
        &self,
        job_id: Uuid,
        owner_id: &str,
        old: Passphrase,
        new: Passphrase,
    ) -> RotationReport {
        let mut outcomes = Vec::new();
        let mut discovery_errors = Vec::new();
        let mut eligible = Vec::new();

        for kind in RecordKind::ALL {
            match self.store.list(kind, owner_id).await {
                Ok(records) => {
                    for record in records {
                        if record.encrypted {
                            eligible.push((kind, record.id, record.envelope));
                        } else {
                            outcomes.push(RecordOutcome::skipped(kind, record.id));
                        }
                    }
                }
                Err(e) => {
                    warn!(%kind, error = %e, "failed to list records; kind not rotated");
                    discovery_errors.push(DiscoveryError {
                        kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        let total = eligible.len();
        self.status.publish(RotationStatus::Running {
            job_id,
            total,
            completed: 0,
        });
        info!(total, skipped = outcomes.len(), "re-encrypting {total} items");

        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::with_capacity(total);
        for (kind, record_id, envelope) in eligible {
            let store = Arc::clone(&self.store);
            let permits = Arc::clone(&permits);
            let board = self.status.clone();
            let owner_id = owner_id.to_owned();
            let (old, new) = (old.clone(), new.clone());
            let id = record_id.clone();

            let handle = tokio::spawn(
                async move {
                    let _permit = permits.acquire_owned().await.ok();
                    let outcome =
                        rotate_record(store.as_ref(), kind, id, &owner_id, envelope, old, new)
                            .await;
                    board.advance(job_id);
                    outcome
                }
                .in_current_span(),
            );
            tasks.push((kind, record_id, handle));
        }

        outcomes.reserve(tasks.len());
        for (kind, record_id, handle) in tasks {
            let outcome = handle.await.unwrap_or_else(|e| {
                error!(%kind, record_id = %record_id, error = %e, "rotation task did not complete");
                RecordOutcome::failed(kind, record_id, "rotation task aborted")
            });
            outcomes.push(outcome);
        }

        RotationReport {
            job_id,
            outcomes,
            discovery_errors,
        }
    }
}

fn validate(
    owner_id: &str,
    old: &str,
    new: &str,
) -> Result<(Passphrase, Passphrase), RotationError> {
    if owner_id.trim().is_empty() {
        return Err(RotationError::InvalidRequest("owner id is required"));
    }
    let old = Passphrase::new(old)
        .map_err(|_| RotationError::InvalidRequest("old passphrase is required"))?;
    let new = Passphrase::new(new)
        .map_err(|_| RotationError::InvalidRequest("new passphrase is required"))?;
    if old.same_as(&new) {
        return Err(RotationError::InvalidRequest(
            "new passphrase must differ from the old passphrase",
        ));
    }
    Ok((old, new))
}

/// Rotate one record. Never fails; every error becomes a `failed` outcome.
async fn rotate_record(
    store: &dyn RecordStore,
    kind: RecordKind,
    record_id: String,
    owner_id: &str,
    envelope: Option<Envelope>,
    old: Passphrase,
    new: Passphrase,
) -> RecordOutcome {
    let Some(envelope) = envelope else {
        warn!(%kind, record_id = %record_id, "record flagged encrypted has no envelope");
        return RecordOutcome::failed(kind, record_id, "encrypted record has no envelope");
    };

    let value: serde_json::Value = match crypto::decrypt_offloaded(envelope, old).await {
        Ok(v) => v,
        Err(e) => {
            warn!(%kind, record_id = %record_id, "could not open record with old passphrase");
            return RecordOutcome::failed(kind, record_id, e.to_string());
        }
    };

    let fresh = match crypto::encrypt_offloaded(value, new).await {
        Ok(env) => env,
        Err(e) => {
            error!(%kind, record_id = %record_id, "re-encryption failed");
            return RecordOutcome::failed(kind, record_id, e.to_string());
        }
    };

    match store.update_envelope(kind, &record_id, owner_id, &fresh).await {
        Ok(UpdateOutcome::Updated) => RecordOutcome::success(kind, record_id),
        Ok(UpdateOutcome::NotFound) => {
            warn!(%kind, record_id = %record_id, "record vanished before envelope update");
            RecordOutcome::failed(kind, record_id, "record not found")
        }
        Err(e) => {
            warn!(%kind, record_id = %record_id, error = %e, "envelope update rejected");
            RecordOutcome::failed(kind, record_id, e.to_string())
        }
    }
}
