//! Tracing setup: structured JSON logs, optionally exported as OTLP traces.
//!
//! # Telemetry invariants
//!
//! - **No passphrase, key material or decrypted value** may appear in any
//!   span attribute or log field. Record ids and owner ids are fine.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
