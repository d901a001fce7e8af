//! Configuration loading and validation for the agent.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Validated agent configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// Base URL of the remote record store. **Required.**
    pub record_store_url: String,

    /// Bearer token sent with every record store request.
    #[serde(default)]
    pub record_store_token: Option<String>,

    /// Per-request timeout (seconds) for record store calls.
    #[serde(default = "default_record_store_timeout")]
    pub record_store_timeout_secs: u64,

    /// Address the local API binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Directory holding the persisted passphrase.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Maximum number of records rotated concurrently.
    #[serde(default = "default_rotation_concurrency")]
    pub rotation_concurrency: usize,

    /// OTLP endpoint for trace export. Traces are only logged when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`) used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("record_store_url", &self.record_store_url)
            .field(
                "record_store_token",
                &self.record_store_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("record_store_timeout_secs", &self.record_store_timeout_secs)
            .field("listen_addr", &self.listen_addr)
            .field("state_dir", &self.state_dir)
            .field("rotation_concurrency", &self.rotation_concurrency)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn default_record_store_timeout() -> u64 {
    30
}
fn default_listen_addr() -> String {
    "127.0.0.1:8787".into()
}
fn default_state_dir() -> PathBuf {
    PathBuf::from(".vault-agent")
}
fn default_rotation_concurrency() -> usize {
    crate::rotation::DEFAULT_CONCURRENCY
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Parsed [`Config::listen_addr`].
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a `host:port` socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen_addr
            .parse()
            .with_context(|| format!("LISTEN_ADDR is not a socket address: {}", self.listen_addr))
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.record_store_url, "RECORD_STORE_URL")?;
        let url = self.record_store_url.as_str();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!("RECORD_STORE_URL must start with http:// or https://");
        }
        if self.record_store_timeout_secs == 0 {
            anyhow::bail!("RECORD_STORE_TIMEOUT_SECS must be > 0");
        }
        if self.rotation_concurrency == 0 {
            anyhow::bail!("ROTATION_CONCURRENCY must be > 0");
        }
        if self.state_dir.as_os_str().is_empty() {
            anyhow::bail!("STATE_DIR must not be empty");
        }
        self.listen_addr()?;
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            record_store_url: "https://records.example/api".into(),
            record_store_token: Some("t0ken".into()),
            record_store_timeout_secs: default_record_store_timeout(),
            listen_addr: default_listen_addr(),
            state_dir: default_state_dir(),
            rotation_concurrency: default_rotation_concurrency(),
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_record_store_timeout(), 30);
        assert_eq!(default_listen_addr(), "127.0.0.1:8787");
        assert_eq!(default_state_dir(), PathBuf::from(".vault-agent"));
        assert_eq!(default_rotation_concurrency(), 8);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn valid_config_passes() {
        let cfg = valid();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.listen_addr().unwrap().port(), 8787);
    }

    #[test]
    fn validate_rejects_empty_store_url() {
        let cfg = Config {
            record_store_url: " ".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_http_store_url() {
        let cfg = Config {
            record_store_url: "records.example".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_store_timeout() {
        let cfg = Config {
            record_store_timeout_secs: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let cfg = Config {
            rotation_concurrency: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_listen_addr() {
        let cfg = Config {
            listen_addr: "localhost".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn debug_redacts_token() {
        assert!(!format!("{:?}", valid()).contains("t0ken"));
    }
}
