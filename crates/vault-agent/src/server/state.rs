//! Shared application state injected into every Axum handler.

use crate::rotation::RotationCoordinator;
use crate::session::PassphraseSession;

/// Application state shared across all request handlers.
///
/// Both fields are handles over `Arc`-backed state, so the per-request clone
/// Axum performs is cheap and every handler sees the same session.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide passphrase session.
    pub session: PassphraseSession,
    /// Rotation driver; shares `session` and owns the progress board.
    pub rotation: RotationCoordinator,
}

impl AppState {
    pub fn new(session: PassphraseSession, rotation: RotationCoordinator) -> Self {
        Self { session, rotation }
    }
}

#[cfg(test)]
impl AppState {
    /// Unset session over an in-memory passphrase store, rotating against `records`.
    pub fn for_tests(records: std::sync::Arc<dyn crate::records::RecordStore>) -> Self {
        use crate::session::store::memory::MemoryStore;

        let session = PassphraseSession::new(std::sync::Arc::new(MemoryStore::default()));
        let rotation = RotationCoordinator::new(
            records,
            session.clone(),
            crate::rotation::DEFAULT_CONCURRENCY,
        );
        Self::new(session, rotation)
    }
}
