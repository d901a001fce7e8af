//! Local HTTP API, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Inject shared application state (`AppState`) into handlers.
//! - Render every layer error as a `{code, message}` body with a fitting status.
//!
//! The API binds to loopback by default; it carries passphrases in request
//! bodies and must not be exposed beyond the device.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;
