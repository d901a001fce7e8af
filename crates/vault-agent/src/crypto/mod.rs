//! Passphrase-based envelope encryption.
//!
//! This module is intentionally free of HTTP, session and record-store
//! dependencies. It provides the pure derive/encrypt/decrypt operations used
//! by the session and the rotation coordinator.
//!
//! # Envelope contract
//!
//! ```text
//! key        = PBKDF2-HMAC-SHA256(passphrase, salt[16], 120_000 iterations) -> 32 bytes
//! ciphertext = AES-256-GCM(key, iv[12], json(value))
//! ```
//!
//! See [`common::envelope`] for the wire format.

pub mod cipher;
pub mod kdf;
pub mod passphrase;

pub use cipher::{decrypt, encrypt};
pub use passphrase::Passphrase;

use common::Envelope;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors produced by the crypto layer.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Empty passphrase or wrong-length salt passed to derivation. A caller bug.
    #[error("invalid key material")]
    InvalidKeyMaterial,

    /// Wrong passphrase, tampered envelope, or malformed envelope.
    /// Never says which.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The value could not be serialised to JSON.
    #[error("value is not serialisable")]
    Serialization,

    /// AES-GCM encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,
}

/// [`encrypt`] on the blocking thread pool.
///
/// Key derivation is slow; running it inline would stall
/// the async executor for every other request.
pub async fn encrypt_offloaded(
    value: serde_json::Value,
    passphrase: Passphrase,
) -> Result<Envelope, CryptoError> {
    tokio::task::spawn_blocking(move || encrypt(&value, passphrase.expose()))
        .await
        .map_err(|_| CryptoError::EncryptionFailed)?
}

/// [`decrypt`] on the blocking thread pool.
pub async fn decrypt_offloaded<T>(
    envelope: Envelope,
    passphrase: Passphrase,
) -> Result<T, CryptoError>
where
    T: DeserializeOwned + Send + 'static,
{
    tokio::task::spawn_blocking(move || decrypt(&envelope, passphrase.expose()))
        .await
        .map_err(|_| CryptoError::DecryptionFailed)?
}
