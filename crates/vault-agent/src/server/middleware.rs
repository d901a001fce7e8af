//! Axum middleware settings applied to the router.
//!
//! Includes request tracing, timeout enforcement, and response compression.

use std::time::Duration;

/// Per-request timeout for every route except `POST /rotate`.
///
/// A rotation runs one key derivation per record in each direction and may
/// legitimately take far longer than this.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
