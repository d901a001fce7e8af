//! Envelope format, record types, protocol definitions, and errors shared
//! across `vault-agent` crates.

pub mod envelope;
pub mod error;
pub mod protocol;
pub mod record;

pub use envelope::Envelope;
pub use error::ServiceError;
pub use record::{RecordKind, RecordOutcome, StoredRecord};
