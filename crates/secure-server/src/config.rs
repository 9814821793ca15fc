//! Configuration loading and validation for the server.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any variable is invalid.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::ReplayGuard;
use crate::keys::KeyCache;

/// Validated server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP(S) server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// PEM certificate chain. HTTPS is served only when this and
    /// `tls_key_path` are both set.
    #[serde(default)]
    pub tls_cert_path: Option<String>,

    /// PEM private key matching `tls_cert_path`.
    #[serde(default)]
    pub tls_key_path: Option<String>,

    /// Maximum number of cached session keys.
    #[serde(default = "default_key_cache_capacity")]
    pub key_cache_capacity: usize,

    /// Lifetime (seconds) of a derived key.
    #[serde(default = "default_key_ttl")]
    pub key_ttl_secs: u64,

    /// How often (seconds) expired keys are purged in the background.
    #[serde(default = "default_key_sweep_interval")]
    pub key_sweep_interval_secs: u64,

    /// Oldest accepted request timestamp (seconds before now).
    #[serde(default = "default_replay_max_age")]
    pub replay_max_age_secs: u64,

    /// Furthest a request timestamp may run ahead of the server (milliseconds).
    #[serde(default = "default_replay_max_skew")]
    pub replay_max_skew_ms: u64,

    /// Upper bound on request and response bodies read by the gateway.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// OTLP/gRPC endpoint for span export. Logs only when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_key_cache_capacity() -> usize {
    1000
}
fn default_key_ttl() -> u64 {
    3600
}
fn default_key_sweep_interval() -> u64 {
    300
}
fn default_replay_max_age() -> u64 {
    300
}
fn default_replay_max_skew() -> u64 {
    5000
}
fn default_max_body_bytes() -> usize {
    1024 * 1024
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
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

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        match (&self.tls_cert_path, &self.tls_key_path) {
            (Some(cert), Some(key)) => {
                ensure_non_empty(cert, "TLS_CERT_PATH")?;
                ensure_non_empty(key, "TLS_KEY_PATH")?;
            }
            (None, None) => {}
            _ => anyhow::bail!("TLS_CERT_PATH and TLS_KEY_PATH must be set together"),
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }

        if self.key_cache_capacity == 0 {
            anyhow::bail!("KEY_CACHE_CAPACITY must be > 0");
        }
        if self.key_ttl_secs == 0 {
            anyhow::bail!("KEY_TTL_SECS must be > 0");
        }
        if self.key_sweep_interval_secs == 0 {
            anyhow::bail!("KEY_SWEEP_INTERVAL_SECS must be > 0");
        }
        if self.replay_max_age_secs == 0 {
            anyhow::bail!("REPLAY_MAX_AGE_SECS must be > 0");
        }
        if self.max_body_bytes == 0 {
            anyhow::bail!("MAX_BODY_BYTES must be > 0");
        }
        Ok(())
    }

    /// Whether HTTPS should be served.
    pub fn tls_enabled(&self) -> bool {
        self.tls_cert_path.is_some() && self.tls_key_path.is_some()
    }

    /// Build the key cache described by this configuration.
    pub fn key_cache(&self) -> KeyCache {
        KeyCache::with_limits(self.key_cache_capacity, Duration::from_secs(self.key_ttl_secs))
    }

    /// Build the replay guard described by this configuration.
    pub fn replay_guard(&self) -> ReplayGuard {
        ReplayGuard::new(
            Duration::from_secs(self.replay_max_age_secs),
            Duration::from_millis(self.replay_max_skew_ms),
        )
    }

    /// Interval of the background key sweeper.
    pub fn key_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.key_sweep_interval_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            tls_cert_path: None,
            tls_key_path: None,
            key_cache_capacity: default_key_cache_capacity(),
            key_ttl_secs: default_key_ttl(),
            key_sweep_interval_secs: default_key_sweep_interval(),
            replay_max_age_secs: default_replay_max_age(),
            replay_max_skew_ms: default_replay_max_skew(),
            max_body_bytes: default_max_body_bytes(),
            otel_exporter_otlp_endpoint: None,
            log_level: default_log_level(),
        }
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} must not be empty when set");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 8080);
        assert_eq!(default_key_cache_capacity(), 1000);
        assert_eq!(default_key_ttl(), 3600);
        assert_eq!(default_key_sweep_interval(), 300);
        assert_eq!(default_replay_max_age(), 300);
        assert_eq!(default_replay_max_skew(), 5000);
        assert_eq!(default_max_body_bytes(), 1_048_576);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn default_config_is_valid_and_plain_http() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
        assert!(!cfg.tls_enabled());
    }

    #[test]
    fn default_guard_matches_replay_defaults() {
        assert_eq!(Config::default().replay_guard(), ReplayGuard::default());
    }

    #[test]
    fn validate_rejects_cert_without_key() {
        let cfg = Config {
            tls_cert_path: Some("/etc/tls/server.crt".into()),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_cert_and_key() {
        let cfg = Config {
            tls_cert_path: Some("/etc/tls/server.crt".into()),
            tls_key_path: Some("/etc/tls/server.key".into()),
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
        assert!(cfg.tls_enabled());
    }

    #[test]
    fn validate_rejects_zero_capacity() {
        let cfg = Config {
            key_cache_capacity: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_intervals() {
        for cfg in [
            Config {
                key_ttl_secs: 0,
                ..Config::default()
            },
            Config {
                key_sweep_interval_secs: 0,
                ..Config::default()
            },
            Config {
                replay_max_age_secs: 0,
                ..Config::default()
            },
            Config {
                max_body_bytes: 0,
                ..Config::default()
            },
        ] {
            assert!(cfg.validate().is_err());
        }
    }

    #[test]
    fn validate_rejects_blank_otlp_endpoint() {
        let cfg = Config {
            otel_exporter_otlp_endpoint: Some("  ".into()),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
