//! Request and response types of the local agent API.
//!
//! These types are serialised as JSON between device-local UI code and the
//! agent. Field names are camelCase on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::Envelope;
use crate::record::{DiscoveryError, RecordOutcome};

// ---------------------------------------------------------------------------
// Encrypt / decrypt
// ---------------------------------------------------------------------------

/// Request body for `POST /encrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptRequest {
    /// Arbitrary JSON value to seal under the active passphrase.
    pub value: serde_json::Value,
}

/// Response body for `POST /encrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptResponse {
    pub envelope: Envelope,
}

/// Request body for `POST /decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptRequest {
    pub envelope: Envelope,
}

/// Response body for `POST /decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub value: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Passphrase session
// ---------------------------------------------------------------------------

/// Request body for `PUT /passphrase`.
#[derive(Clone, Serialize, Deserialize)]
pub struct SetPassphraseRequest {
    pub passphrase: String,
}

impl fmt::Debug for SetPassphraseRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetPassphraseRequest")
            .field("passphrase", &"[REDACTED]")
            .finish()
    }
}

/// Response body for `GET /passphrase`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassphraseStatusResponse {
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Request body for `POST /rotate`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateRequest {
    pub owner_id: String,
    pub old_passphrase: String,
    pub new_passphrase: String,
}

impl fmt::Debug for RotateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RotateRequest")
            .field("owner_id", &self.owner_id)
            .field("old_passphrase", &"[REDACTED]")
            .field("new_passphrase", &"[REDACTED]")
            .finish()
    }
}

/// Terminal state of a rotation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RotationOutcome {
    /// Every encrypted record was re-encrypted.
    Completed,
    /// At least one record or record kind failed; see the outcome lists.
    CompletedWithErrors,
}

/// Response body for `POST /rotate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotateResponse {
    pub job_id: Uuid,
    pub status: RotationOutcome,
    /// Human-readable summary, e.g. `"completed with errors: 4 re-encrypted, 1 failed"`.
    pub message: String,
    pub outcomes: Vec<RecordOutcome>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discovery_errors: Vec<DiscoveryError>,
}

/// Response body for `GET /rotate/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationStatusResponse {
    /// `"idle"`, `"running"`, `"completed"` or `"completed-with-errors"`.
    pub state: String,
    /// Human-readable progress text.
    pub message: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// `"ok"` when a passphrase is active, `"locked"` otherwise.
    pub status: String,
    pub passphrase_active: bool,
    pub rotation_running: bool,
}
