//! Bingo Controller configuration.
//!
//! Configuration is loaded from environment variables. Every value has a
//! default, so an empty environment yields a working single-hall server.

use crate::game::{ClaimPolicy, PoolRange, SessionConfig, DEFAULT_POOL_MAX, DEFAULT_POOL_MIN};
use common::config::ObservabilityConfig;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default WebSocket bind address.
pub const DEFAULT_WS_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8081";

/// Default session actor mailbox capacity.
pub const DEFAULT_SESSION_MAILBOX_SIZE: usize = 500;

/// Default time allowed for connections to drain on shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECONDS: u64 = 10;

/// Bingo Controller configuration.
#[derive(Clone)]
pub struct Config {
    /// WebSocket server bind address (default: "0.0.0.0:5000").
    pub ws_bind_address: String,

    /// Health endpoint bind address (default: "0.0.0.0:8081").
    pub health_bind_address: String,

    /// Drawable numbers (default: 1..=75).
    pub pool_range: PoolRange,

    /// Claim adjudication policy (default: marks).
    pub claim_policy: ClaimPolicy,

    /// Session actor mailbox capacity (default: 500).
    pub session_mailbox_size: usize,

    /// Shutdown drain timeout in seconds (default: 10).
    pub shutdown_timeout_seconds: u64,

    /// Log output settings.
    pub observability: ObservabilityConfig,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("ws_bind_address", &self.ws_bind_address)
            .field("health_bind_address", &self.health_bind_address)
            .field(
                "pool_range",
                &format_args!("{}..={}", self.pool_range.min(), self.pool_range.max()),
            )
            .field("claim_policy", &self.claim_policy.as_str())
            .field("session_mailbox_size", &self.session_mailbox_size)
            .field("shutdown_timeout_seconds", &self.shutdown_timeout_seconds)
            .field("log_format", &self.observability.log_format)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let ws_bind_address = vars
            .get("BC_WS_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_WS_BIND_ADDRESS.to_string());

        let health_bind_address = vars
            .get("BC_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let pool_min = vars
            .get("BC_POOL_MIN")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POOL_MIN);

        let pool_max = vars
            .get("BC_POOL_MAX")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POOL_MAX);

        let pool_range = PoolRange::new(pool_min, pool_max)
            .map_err(|e| ConfigError::InvalidValue(format!("BC_POOL_MIN/BC_POOL_MAX: {e}")))?;

        let claim_policy = match vars.get("BC_CLAIM_POLICY") {
            Some(raw) => raw
                .parse::<ClaimPolicy>()
                .map_err(|e| ConfigError::InvalidValue(format!("BC_CLAIM_POLICY: {e}")))?,
            None => ClaimPolicy::default(),
        };

        let session_mailbox_size = vars
            .get("BC_SESSION_MAILBOX_SIZE")
            .and_then(|s| s.parse().ok())
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_SESSION_MAILBOX_SIZE);

        let shutdown_timeout_seconds = vars
            .get("BC_SHUTDOWN_TIMEOUT_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECONDS);

        let observability = ObservabilityConfig::from_vars(vars)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        Ok(Config {
            ws_bind_address,
            health_bind_address,
            pool_range,
            claim_policy,
            session_mailbox_size,
            shutdown_timeout_seconds,
            observability,
        })
    }

    /// Game settings for the session.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            pool_range: self.pool_range,
            claim_policy: self.claim_policy,
        }
    }
}
