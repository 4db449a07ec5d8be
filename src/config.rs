//! `ServerConfig`/`MasterConfig` (§6): the process configuration surface
//! for the two assemblies, following the `RouterConfig` preset/builder/
//! validate/JSON pattern.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::broker::BrokerConfig;
use crate::domain_types::{ComponentName, MessageCap};
use crate::error::ConfigError;

/// Configuration for the single-stage, non-broker [`crate::server::Server`]
/// assembly (§0 supplemented functionality).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Identity used in framing and logging.
    pub name: ComponentName,
    /// External ingress endpoint.
    pub pull_address: String,
    /// External egress endpoint.
    pub next_address: String,
    /// `CacheService` endpoint.
    pub db_address: String,
    /// `LogCollector` side-channel endpoint, if wired.
    pub log_address: Option<String>,
    /// `PerformanceCollector` side-channel endpoint, if wired.
    pub perf_address: Option<String>,
    /// `PingCollector` side-channel endpoint, if wired.
    pub ping_address: Option<String>,
    /// Whether payloads arriving here are wrapped `PalmMessage`s.
    pub palm: bool,
    /// Loop cap (for deterministic tests).
    pub messages: MessageCap,
}

impl ServerConfig {
    /// Builds a config, defaulting side channels to unwired and `palm` to
    /// true (the common case for a server exposed to PALM clients).
    #[must_use]
    pub fn new(name: ComponentName, pull_address: impl Into<String>, next_address: impl Into<String>, db_address: impl Into<String>) -> Self {
        Self {
            name,
            pull_address: pull_address.into(),
            next_address: next_address.into(),
            db_address: db_address.into(),
            log_address: None,
            perf_address: None,
            ping_address: None,
            palm: true,
            messages: MessageCap::unbounded(),
        }
    }

    /// Validates cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pull_address.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "pull_address",
                reason: "must not be empty".to_string(),
            });
        }
        if self.next_address.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "next_address",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Saves this configuration as pretty JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }
}

/// Configuration for the broker-based [`crate::master::Master`] assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Identity used in framing and logging.
    pub name: ComponentName,
    /// External ingress endpoint (`PullService`/`RepService`).
    pub pull_address: String,
    /// External egress endpoint (`PushConnection`).
    pub next_address: String,
    /// Worker fleet results endpoint (`WorkerPullService`).
    pub worker_pull_address: String,
    /// Worker fleet dispatch endpoint (`WorkerPushService`).
    pub worker_push_address: String,
    /// `CacheService` endpoint.
    pub db_address: String,
    /// `LogCollector` side-channel endpoint, if wired.
    pub log_address: Option<String>,
    /// `PerformanceCollector` side-channel endpoint, if wired.
    pub perf_address: Option<String>,
    /// `PingCollector` side-channel endpoint, if wired.
    pub ping_address: Option<String>,
    /// Whether ingress payloads are wrapped `PalmMessage`s.
    pub palm: bool,
    /// Loop cap applied to every component (for deterministic tests).
    pub messages: MessageCap,
    /// The broker's own configuration.
    pub broker: BrokerConfig,
}

impl MasterConfig {
    /// Builds a config with a production broker preset and side channels
    /// unwired.
    #[must_use]
    pub fn new(
        name: ComponentName,
        pull_address: impl Into<String>,
        next_address: impl Into<String>,
        worker_pull_address: impl Into<String>,
        worker_push_address: impl Into<String>,
        db_address: impl Into<String>,
    ) -> Self {
        Self {
            name,
            pull_address: pull_address.into(),
            next_address: next_address.into(),
            worker_pull_address: worker_pull_address.into(),
            worker_push_address: worker_push_address.into(),
            db_address: db_address.into(),
            log_address: None,
            perf_address: None,
            ping_address: None,
            palm: true,
            messages: MessageCap::unbounded(),
            broker: BrokerConfig::production(),
        }
    }

    /// A deterministic preset for tests: a `testing()` broker and a
    /// finite component loop cap.
    #[must_use]
    pub fn testing(
        name: ComponentName,
        pull_address: impl Into<String>,
        next_address: impl Into<String>,
        worker_pull_address: impl Into<String>,
        worker_push_address: impl Into<String>,
        db_address: impl Into<String>,
    ) -> Self {
        let mut config = Self::new(name, pull_address, next_address, worker_pull_address, worker_push_address, db_address);
        config.broker = BrokerConfig::testing();
        config.messages = MessageCap::new(1_000);
        config
    }

    /// Validates cross-field invariants, including the broker's own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("pull_address", &self.pull_address),
            ("next_address", &self.next_address),
            ("worker_pull_address", &self.worker_pull_address),
            ("worker_push_address", &self.worker_push_address),
            ("db_address", &self.db_address),
        ] {
            if value.is_empty() {
                return Err(ConfigError::InvalidField {
                    field,
                    reason: "must not be empty".to_string(),
                });
            }
        }
        self.broker.validate()
    }

    /// Saves this configuration as pretty JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn name(s: &str) -> ComponentName {
        ComponentName::try_new(s.to_string()).unwrap()
    }

    #[test]
    fn server_config_rejects_empty_addresses() {
        let config = ServerConfig::new(name("srv"), "", "inproc://out", "inproc://db");
        assert!(config.validate().is_err());
    }

    #[test]
    fn master_config_round_trips_through_json() {
        let file = NamedTempFile::new().unwrap();
        let original = MasterConfig::testing(
            name("master"),
            "inproc://in",
            "inproc://out",
            "inproc://wpull",
            "inproc://wpush",
            "inproc://db",
        );
        original.save_to_file(file.path()).unwrap();
        let loaded = MasterConfig::load_from_file(file.path()).unwrap();
        assert_eq!(loaded.name, original.name);
        assert_eq!(loaded.broker.max_buffer_size, original.broker.max_buffer_size);
    }
}
