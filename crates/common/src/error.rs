//! Common error types shared across crates.

use thiserror::Error;

/// Top-level error type surfaced by the local agent API.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::NoActivePassphrase`] → 409
/// - [`ServiceError::RotationInProgress`] → 409
/// - [`ServiceError::DecryptionFailed`] → 422
/// - [`ServiceError::Internal`] → 500
///
/// Messages are safe to show to users; they never carry cryptographic detail.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input: invalid JSON, empty passphrase, bad rotation request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Encrypt/decrypt attempted while no passphrase is set.
    #[error("no active passphrase")]
    NoActivePassphrase,

    /// A rotation is in flight; the passphrase cannot change until it settles.
    #[error("a passphrase rotation is already in progress")]
    RotationInProgress,

    /// Wrong passphrase, tampered or malformed envelope. Always generic.
    #[error("decryption failed")]
    DecryptionFailed,

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::NoActivePassphrase => 409,
            ServiceError::RotationInProgress => 409,
            ServiceError::DecryptionFailed => 422,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::NoActivePassphrase => "no_active_passphrase",
            ServiceError::RotationInProgress => "rotation_in_progress",
            ServiceError::DecryptionFailed => "decryption_failed",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_codes() {
        assert_eq!(ServiceError::BadRequest("x".into()).http_status(), 400);
        assert_eq!(ServiceError::NoActivePassphrase.http_status(), 409);
        assert_eq!(ServiceError::RotationInProgress.http_status(), 409);
        assert_eq!(ServiceError::DecryptionFailed.http_status(), 422);
        assert_eq!(ServiceError::Internal("x".into()).http_status(), 500);
    }

    #[test]
    fn display_includes_message() {
        let e = ServiceError::BadRequest("passphrases must differ".into());
        assert!(e.to_string().contains("passphrases must differ"));
    }

    #[test]
    fn decryption_failure_is_generic() {
        assert_eq!(ServiceError::DecryptionFailed.to_string(), "decryption failed");
        assert_eq!(ServiceError::DecryptionFailed.code(), "decryption_failed");
    }
}
