//! Process-wide passphrase session.
//!
//! # Lifecycle
//!
//! ```text
//!   Unset ──set_passphrase──► Active ──clear_passphrase──► Unset
//!              ▲                 │
//!              └─set_passphrase──┘
//! ```
//!
//! 1. `main` constructs exactly one [`PassphraseSession`] and calls
//!    [`PassphraseSession::restore`] to pick up a persisted passphrase.
//! 2. Handlers and the rotation coordinator receive clones of the same handle.
//! 3. Encrypt/decrypt fail fast with [`SessionError::NoActivePassphrase`] while
//!    Unset; there is no plaintext fallback.
//!
//! # Rotation guard
//!
//! While a [`RotationGuard`] is alive the passphrase can only be written
//! through the guard, once, after the sweep settles. `set_passphrase`,
//! `clear_passphrase` and a second `begin_rotation` are rejected with
//! [`SessionError::RotationInProgress`].

pub mod store;

pub use store::{FileStore, PassphraseStore, PASSPHRASE_KEY};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use common::Envelope;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::crypto::{self, CryptoError, Passphrase};

/// Errors produced by the session layer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Encrypt/decrypt attempted while Unset.
    #[error("no active passphrase")]
    NoActivePassphrase,

    /// A rotation holds the session.
    #[error("a passphrase rotation is in progress")]
    RotationInProgress,

    /// The cipher layer rejected the operation.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The local passphrase store failed.
    #[error("passphrase store failure: {0}")]
    Persistence(#[source] std::io::Error),
}

/// Holder of the active passphrase and gate for all encrypt/decrypt calls.
///
/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct PassphraseSession {
    current: Arc<RwLock<Option<Passphrase>>>,
    rotating: Arc<AtomicBool>,
    store: Arc<dyn PassphraseStore>,
}

impl PassphraseSession {
    /// Create an Unset session backed by `store`.
    pub fn new(store: Arc<dyn PassphraseStore>) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            rotating: Arc::new(AtomicBool::new(false)),
            store,
        }
    }

    /// Load a persisted passphrase, if any, and become Active.
    ///
    /// Returns `true` if a passphrase was restored.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Persistence`] if the store cannot be read.
    pub async fn restore(&self) -> Result<bool, SessionError> {
        let loaded = self
            .store
            .load(PASSPHRASE_KEY)
            .await
            .map_err(SessionError::Persistence)?;
        let Some(value) = loaded else {
            return Ok(false);
        };
        let passphrase = Passphrase::new(value)?;
        let mut lock = self.current.write().await;
        *lock = Some(passphrase);
        info!("passphrase session restored from local store");
        Ok(true)
    }

    /// Returns `true` if a passphrase is active.
    pub async fn is_active(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// Returns `true` while a rotation holds the session.
    pub fn is_rotating(&self) -> bool {
        self.rotating.load(Ordering::SeqCst)
    }

    /// Activate `passphrase`, replacing any previous one, and persist it.
    ///
    /// Persistence is best effort: a store failure is logged and the session
    /// still becomes Active.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Crypto`] wrapping
    /// [`CryptoError::InvalidKeyMaterial`] for an empty passphrase and
    /// [`SessionError::RotationInProgress`] while a rotation is running.
    pub async fn set_passphrase(&self, passphrase: &str) -> Result<(), SessionError> {
        let passphrase = Passphrase::new(passphrase)?;
        let mut lock = self.current.write().await;
        if self.is_rotating() {
            return Err(SessionError::RotationInProgress);
        }
        self.persist(&passphrase).await;
        *lock = Some(passphrase);
        info!("passphrase activated");
        Ok(())
    }

    /// Drop the active passphrase and remove the persisted copy.
    ///
    /// The in-memory passphrase is gone even if removal from the store fails.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RotationInProgress`] while a rotation is running
    /// and [`SessionError::Persistence`] if the persisted copy could not be
    /// removed.
    pub async fn clear_passphrase(&self) -> Result<(), SessionError> {
        let mut lock = self.current.write().await;
        if self.is_rotating() {
            return Err(SessionError::RotationInProgress);
        }
        *lock = None;
        info!("passphrase cleared");
        self.store
            .remove(PASSPHRASE_KEY)
            .await
            .map_err(SessionError::Persistence)
    }

    /// Seal `value` under the active passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActivePassphrase`] while Unset; cipher errors
    /// propagate as [`SessionError::Crypto`].
    pub async fn encrypt_payload<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<Envelope, SessionError> {
        let passphrase = self.active().await?;
        let value = serde_json::to_value(value).map_err(|_| CryptoError::Serialization)?;
        Ok(crypto::encrypt_offloaded(value, passphrase).await?)
    }

    /// Open `envelope` with the active passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoActivePassphrase`] while Unset; cipher errors
    /// (including the generic [`CryptoError::DecryptionFailed`]) propagate as
    /// [`SessionError::Crypto`].
    pub async fn decrypt_payload<T>(&self, envelope: &Envelope) -> Result<T, SessionError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let passphrase = self.active().await?;
        Ok(crypto::decrypt_offloaded(envelope.clone(), passphrase).await?)
    }

    /// Take exclusive write access to the passphrase for one rotation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::RotationInProgress`] if another rotation holds it.
    pub async fn begin_rotation(&self) -> Result<RotationGuard, SessionError> {
        let _lock = self.current.write().await;
        self.rotating
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| SessionError::RotationInProgress)?;
        Ok(RotationGuard {
            session: self.clone(),
        })
    }

    async fn active(&self) -> Result<Passphrase, SessionError> {
        self.current
            .read()
            .await
            .clone()
            .ok_or(SessionError::NoActivePassphrase)
    }

    async fn persist(&self, passphrase: &Passphrase) {
        if let Err(e) = self.store.save(PASSPHRASE_KEY, passphrase.expose()).await {
            warn!(error = %e, "failed to persist passphrase; session will not survive a restart");
        }
    }
}

/// Exclusive permission to replace the passphrase after a rotation sweep.
///
/// Dropping the guard without calling [`RotationGuard::activate`] releases the
/// session unchanged.
pub struct RotationGuard {
    session: PassphraseSession,
}

impl RotationGuard {
    /// Make `passphrase` the active one, persist it, and release the session.
    pub async fn activate(self, passphrase: Passphrase) {
        let mut lock = self.session.current.write().await;
        self.session.persist(&passphrase).await;
        *lock = Some(passphrase);
        info!("rotated passphrase activated");
    }
}

impl Drop for RotationGuard {
    fn drop(&mut self) {
        self.session.rotating.store(false, Ordering::SeqCst);
    }
}
