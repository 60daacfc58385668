//! Configuration loading and representation.

use std::path::PathBuf;

use thiserror::Error;

use supplychain_observability::LogFormat;

pub const ENV_LOG_PATH: &str = "SUPPLYCHAIN_LOG_PATH";
pub const ENV_SYNC_WRITES: &str = "SUPPLYCHAIN_SYNC_WRITES";
pub const ENV_LOG_FORMAT: &str = "SUPPLYCHAIN_LOG_FORMAT";

pub const DEFAULT_LOG_PATH: &str = "supplychain-events.jsonl";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for a file-backed ledger process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// JSON-lines event log location.
    pub event_log_path: PathBuf,
    /// `sync_data` after every append.
    pub sync_writes: bool,
    pub log_format: LogFormat,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            event_log_path: PathBuf::from(DEFAULT_LOG_PATH),
            sync_writes: true,
            log_format: LogFormat::default(),
        }
    }
}

impl LedgerConfig {
    /// Read settings from the process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup` (environment-shaped key/value source).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_LOG_PATH).filter(|p| !p.trim().is_empty()) {
            config.event_log_path = PathBuf::from(path);
        }

        if let Some(raw) = lookup(ENV_SYNC_WRITES) {
            config.sync_writes = parse_bool(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: ENV_SYNC_WRITES,
                value: raw.clone(),
                reason: "expected true/false/1/0".to_string(),
            })?;
        }

        if let Some(raw) = lookup(ENV_LOG_FORMAT) {
            config.log_format = raw.parse().map_err(|e: supplychain_observability::ParseLogFormatError| {
                ConfigError::InvalidValue {
                    key: ENV_LOG_FORMAT,
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        Ok(config)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = LedgerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.event_log_path, PathBuf::from(DEFAULT_LOG_PATH));
        assert!(config.sync_writes);
    }

    #[test]
    fn reads_every_key() {
        let config = LedgerConfig::from_lookup(lookup(&[
            (ENV_LOG_PATH, "/var/lib/supplychain/log.jsonl"),
            (ENV_SYNC_WRITES, "0"),
            (ENV_LOG_FORMAT, "text"),
        ]))
        .unwrap();
        assert_eq!(config.event_log_path, PathBuf::from("/var/lib/supplychain/log.jsonl"));
        assert!(!config.sync_writes);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn rejects_bad_values() {
        let err = LedgerConfig::from_lookup(lookup(&[(ENV_SYNC_WRITES, "sometimes")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_SYNC_WRITES, .. }));

        let err = LedgerConfig::from_lookup(lookup(&[(ENV_LOG_FORMAT, "xml")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_LOG_FORMAT, .. }));
    }
}
