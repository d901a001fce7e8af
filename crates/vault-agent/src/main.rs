//! `vault-agent`: device-local binary entry point.
//!
//! Startup sequence:
//! 1. Load and validate [`Config`] from environment variables.
//! 2. Initialise the telemetry pipeline (tracing, optional OTLP export).
//! 3. Build the [`PassphraseSession`] over the on-disk store and restore any
//!    persisted passphrase.
//! 4. Build the [`HttpRecordStore`] client and the [`RotationCoordinator`].
//! 5. Build the Axum router and serve the local API until Ctrl-C.

mod config;
mod crypto;
mod records;
mod rotation;
mod server;
mod session;
mod telemetry;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use config::Config;
use records::HttpRecordStore;
use rotation::RotationCoordinator;
use server::state::AppState;
use session::{FileStore, PassphraseSession};

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 2. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init_telemetry(cfg.otel_exporter_otlp_endpoint.as_deref(), &cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen_addr = %cfg.listen_addr,
        record_store = %cfg.record_store_url,
        "vault-agent starting"
    );

    // -----------------------------------------------------------------------
    // 3. Passphrase session
    // -----------------------------------------------------------------------
    let session = PassphraseSession::new(Arc::new(FileStore::new(cfg.state_dir.clone())));
    match session.restore().await {
        Ok(true) => {}
        Ok(false) => info!("no persisted passphrase; session locked until one is set"),
        Err(e) => warn!(error = %e, "could not restore persisted passphrase; session locked"),
    }

    // -----------------------------------------------------------------------
    // 4. Record store + rotation
    // -----------------------------------------------------------------------
    let records = HttpRecordStore::new(&cfg.record_store_url, cfg.record_store_token.clone())
        .context("failed to build record store client")?
        .with_timeout(Duration::from_secs(cfg.record_store_timeout_secs));
    let rotation =
        RotationCoordinator::new(Arc::new(records), session.clone(), cfg.rotation_concurrency);

    // -----------------------------------------------------------------------
    // 5. HTTP server
    // -----------------------------------------------------------------------
    let router = server::router::build(AppState::new(session, rotation));

    let addr = cfg.listen_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(addr = %addr, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("vault-agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C; running until killed");
        std::future::pending::<()>().await;
    }
}
