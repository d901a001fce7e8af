//! Record-store boundary.
//!
//! The record store is external and untrusted: it persists envelopes and sees
//! record metadata, never plaintext. This module defines the two operations
//! the agent consumes and an HTTP implementation of them.
//!
//! # Contract
//!
//! - `list` returns every record of one kind owned by one user, plaintext and
//!   encrypted alike.
//! - `update_envelope` replaces only the envelope of an existing record scoped
//!   to `(record_id, owner_id)`. It never creates records.
//!
//! No version or etag is checked on update: a concurrent writer editing the
//! same record during a rotation can be overwritten.

pub mod http;
#[cfg(test)]
pub mod memory;

pub use http::HttpRecordStore;

use async_trait::async_trait;
use common::{Envelope, RecordKind, StoredRecord};
use thiserror::Error;

/// Errors produced by a record store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The request could not be built (invalid base URL or identifier).
    #[error("invalid record store request: {0}")]
    Request(String),

    /// The store could not be reached.
    #[error("record store unreachable: {0}")]
    Transport(String),

    /// The store answered with an unexpected HTTP status.
    #[error("record store returned HTTP {0}")]
    Status(u16),

    /// The store's response body was not the expected JSON.
    #[error("record store response could not be decoded: {0}")]
    Decode(String),
}

/// Result of an envelope update that reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    /// No record with that id belongs to that owner.
    NotFound,
}

/// Operations the agent needs from the record store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch every record of `kind` owned by `owner_id`.
    async fn list(&self, kind: RecordKind, owner_id: &str) -> Result<Vec<StoredRecord>, StoreError>;

    /// Replace the envelope of record `record_id` owned by `owner_id`.
    async fn update_envelope(
        &self,
        kind: RecordKind,
        record_id: &str,
        owner_id: &str,
        envelope: &Envelope,
    ) -> Result<UpdateOutcome, StoreError>;
}
