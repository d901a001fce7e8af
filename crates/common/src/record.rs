//! Record kinds, the record wire type, and per-record rotation outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;

/// Every collection of user records that may carry an encrypted envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Income,
    Spending,
    Loans,
    Clients,
    Todos,
}

impl RecordKind {
    /// All registered kinds, in discovery order.
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Income,
        RecordKind::Spending,
        RecordKind::Loans,
        RecordKind::Clients,
        RecordKind::Todos,
    ];

    /// Lowercase name, also used as the record store path segment.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Income => "income",
            RecordKind::Spending => "spending",
            RecordKind::Loans => "loans",
            RecordKind::Clients => "clients",
            RecordKind::Todos => "todos",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as returned by the record store.
///
/// Plaintext records carry their domain fields directly; encrypted records
/// carry `encrypted: true` and an [`Envelope`]. Any other fields are kept in
/// `fields` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    pub owner_id: String,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<Envelope>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Identifies one record across all kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRef {
    pub kind: RecordKind,
    pub record_id: String,
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.record_id)
    }
}

/// Terminal state of one record within a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutcomeStatus {
    Success,
    SkippedUnencrypted,
    Failed,
}

/// Result of rotating a single record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordOutcome {
    pub kind: RecordKind,
    pub record_id: String,
    pub status: OutcomeStatus,
    /// Generic, user-safe failure reason. Never contains key material.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RecordOutcome {
    pub fn success(kind: RecordKind, record_id: impl Into<String>) -> Self {
        Self {
            kind,
            record_id: record_id.into(),
            status: OutcomeStatus::Success,
            error: None,
        }
    }

    pub fn skipped(kind: RecordKind, record_id: impl Into<String>) -> Self {
        Self {
            kind,
            record_id: record_id.into(),
            status: OutcomeStatus::SkippedUnencrypted,
            error: None,
        }
    }

    pub fn failed(
        kind: RecordKind,
        record_id: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            record_id: record_id.into(),
            status: OutcomeStatus::Failed,
            error: Some(error.into()),
        }
    }

    pub fn record_ref(&self) -> RecordRef {
        RecordRef {
            kind: self.kind,
            record_id: self.record_id.clone(),
        }
    }
}

/// A record kind whose listing failed, so none of its records were visited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryError {
    pub kind: RecordKind,
    pub error: String,
}
