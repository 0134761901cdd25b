//! Configuration management infrastructure
//!
//! Hierarchical configuration using figment:
//! programmatic defaults ← yaml file ← `ROOMWARDEN_*` environment variables.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::Config;

/// Default config file looked up next to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "roomwarden.yaml";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("homeserver.base_url must be set")]
    MissingHomeserver,

    #[error("homeserver.access_token must be set (ROOMWARDEN_HOMESERVER__ACCESS_TOKEN)")]
    MissingAccessToken,

    #[error("Invalid concurrency limit {0}: must be at least 1")]
    InvalidConcurrency(usize),

    #[error("Invalid recency retention 0: omit the key to keep ids forever")]
    InvalidRetention,

    #[error("Invalid backfill limit 0")]
    InvalidBackfillLimit,

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. The yaml file (explicit path or `roomwarden.yaml`)
    /// 3. Environment variables (`ROOMWARDEN_*` prefix, `__` nesting)
    pub fn load(path: Option<&std::path::Path>) -> Result<Config> {
        let file = path
            .map(std::path::Path::to_path_buf)
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.into());

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed("ROOMWARDEN_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.homeserver.base_url.trim().is_empty() {
            return Err(ConfigError::MissingHomeserver);
        }
        if config.homeserver.access_token.trim().is_empty() {
            return Err(ConfigError::MissingAccessToken);
        }

        if config.queue.redactions == 0 {
            return Err(ConfigError::InvalidConcurrency(config.queue.redactions));
        }
        if config.queue.log_messages == 0 {
            return Err(ConfigError::InvalidConcurrency(config.queue.log_messages));
        }
        if config.queue.recency_retention == Some(0) {
            return Err(ConfigError::InvalidRetention);
        }

        if config.reconciler.backfill_limit == 0 {
            return Err(ConfigError::InvalidBackfillLimit);
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        match config.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ConfigError::InvalidLogLevel(other.to_string())),
        }
        match config.logging.format.as_str() {
            "json" | "pretty" => {}
            other => return Err(ConfigError::InvalidLogFormat(other.to_string())),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_yaml() -> &'static str {
        "homeserver:\n  base_url: https://matrix.example.org\n  access_token: syt_secret\nqueue:\n  policy: fifo\n  redactions: 3\n"
    }

    #[test]
    fn loads_yaml_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(valid_yaml().as_bytes()).unwrap();

        let config = ConfigLoader::load(Some(file.path())).unwrap();
        assert_eq!(config.homeserver.base_url, "https://matrix.example.org");
        assert_eq!(config.queue.redactions, 3);
        // untouched keys keep their defaults
        assert_eq!(config.queue.log_messages, 1);
        assert_eq!(config.shutdown_timeout_secs, 5);
    }

    #[test]
    fn missing_token_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(b"homeserver:\n  base_url: https://matrix.example.org\n")
            .unwrap();

        let err = ConfigLoader::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("access_token"));
    }

    #[test]
    fn zero_permits_are_rejected() {
        let mut config = crate::domain::models::Config::default();
        config.homeserver.base_url = "https://matrix.example.org".into();
        config.homeserver.access_token = "tok".into();
        config.queue.redactions = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidConcurrency(0))
        ));
    }

    #[test]
    fn inverted_backoff_is_rejected() {
        let mut config = crate::domain::models::Config::default();
        config.homeserver.base_url = "https://matrix.example.org".into();
        config.homeserver.access_token = "tok".into();
        config.retry.initial_backoff_ms = 10_000;
        config.retry.max_backoff_ms = 1_000;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidBackoff(10_000, 1_000))
        ));
    }
}
