//! Common configuration types for Bingo Hall components.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_VAR: &str = "BC_LOG_FORMAT";

/// Log output format for the tracing fmt layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field output.
    #[default]
    Pretty,
    /// One JSON object per line, for log shippers.
    Json,
}

/// Error returned when a log format name is not recognised.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown log format: {0} (expected \"pretty\" or \"json\")")]
pub struct UnknownLogFormat(pub String);

impl FromStr for LogFormat {
    type Err = UnknownLogFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(UnknownLogFormat(other.to_string())),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log output format
    pub log_format: LogFormat,
}

impl ObservabilityConfig {
    /// Read observability settings from a variable map.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLogFormat` if `BC_LOG_FORMAT` is set to an unsupported value.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, UnknownLogFormat> {
        let log_format = match vars.get(LOG_FORMAT_VAR) {
            Some(value) => value.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self { log_format })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_pretty() {
        let config = ObservabilityConfig::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_parses_json_case_insensitively() {
        let vars = HashMap::from([(LOG_FORMAT_VAR.to_string(), "JSON".to_string())]);
        let config = ObservabilityConfig::from_vars(&vars).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_rejects_unknown_format() {
        let vars = HashMap::from([(LOG_FORMAT_VAR.to_string(), "xml".to_string())]);
        let err = ObservabilityConfig::from_vars(&vars).unwrap_err();
        assert_eq!(err, UnknownLogFormat("xml".to_string()));
    }
}
