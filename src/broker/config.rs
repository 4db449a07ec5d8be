//! `BrokerConfig`, following the `RouterConfig` pattern: `development()`/
//! `production()`/`testing()` presets, a `Builder`, `validate()`, and
//! JSON `save_to_file`/`load_from_file`.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain_types::{FlushIntervalSecs, MaxBufferSize, MessageCap, RedundancyTarget, MIN_BUFFER_SIZE};
use crate::error::ConfigError;

/// Configuration governing one [`crate::broker::Broker`] instance and the
/// [`crate::resilience::ResilienceService`] paired with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Total buffered-payload cap across all outbound peers (§3, §4.1).
    pub max_buffer_size: MaxBufferSize,
    /// Backlog fraction (as a denominator, i.e. `1/resume_fraction`) at
    /// which the broker re-arms inbound reads after buffering (§5: "10%
    /// of the cap").
    pub resume_fraction: u32,
    /// Loop cap for the dispatch loop; production uses an effectively
    /// unbounded cap, tests supply a finite one.
    pub messages: MessageCap,
    /// How often the resilience flush timer fires (§4.5).
    pub flush_interval: FlushIntervalSecs,
    /// Declared-but-unenforced resend ratio target (§4.5, §9 Open
    /// Question 4).
    pub redundancy: RedundancyTarget,
}

impl BrokerConfig {
    /// The production-sized preset: a generous buffer, unbounded loop.
    #[must_use]
    pub fn production() -> Self {
        Self {
            max_buffer_size: MaxBufferSize::clamped(10_000),
            resume_fraction: 10,
            messages: MessageCap::unbounded(),
            flush_interval: FlushIntervalSecs::default(),
            redundancy: RedundancyTarget::default(),
        }
    }

    /// A development preset: a smaller buffer, still unbounded loop, for
    /// faster local feedback on backpressure behavior.
    #[must_use]
    pub fn development() -> Self {
        Self {
            max_buffer_size: MaxBufferSize::clamped(MIN_BUFFER_SIZE),
            resume_fraction: 10,
            messages: MessageCap::unbounded(),
            flush_interval: FlushIntervalSecs::default(),
            redundancy: RedundancyTarget::default(),
        }
    }

    /// A deterministic preset for tests: the minimum buffer and a finite
    /// loop cap the caller is expected to override via [`BrokerConfigBuilder`].
    #[must_use]
    pub fn testing() -> Self {
        Self {
            max_buffer_size: MaxBufferSize::clamped(MIN_BUFFER_SIZE),
            resume_fraction: 10,
            messages: MessageCap::new(1_000),
            flush_interval: FlushIntervalSecs::try_new(1).unwrap_or_default(),
            redundancy: RedundancyTarget::default(),
        }
    }

    /// Validates cross-field invariants beyond what `nutype` enforces on
    /// individual fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resume_fraction == 0 {
            return Err(ConfigError::InvalidField {
                field: "resume_fraction",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Saves this configuration as pretty JSON.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Loads and validates a configuration from a JSON file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Starts a builder seeded from this configuration.
    #[must_use]
    pub fn builder(self) -> BrokerConfigBuilder {
        BrokerConfigBuilder { config: self }
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::production()
    }
}

/// Fluent builder over [`BrokerConfig`], seeded from a preset.
#[derive(Debug, Clone)]
pub struct BrokerConfigBuilder {
    config: BrokerConfig,
}

impl BrokerConfigBuilder {
    /// Sets `max_buffer_size`, clamping below the floor rather than
    /// rejecting it.
    #[must_use]
    pub fn max_buffer_size(mut self, requested: usize) -> Self {
        self.config.max_buffer_size = MaxBufferSize::clamped(requested);
        self
    }

    /// Sets `resume_fraction`.
    #[must_use]
    pub fn resume_fraction(mut self, fraction: u32) -> Self {
        self.config.resume_fraction = fraction;
        self
    }

    /// Sets the dispatch loop's message cap.
    #[must_use]
    pub fn messages(mut self, cap: MessageCap) -> Self {
        self.config.messages = cap;
        self
    }

    /// Validates and returns the built configuration.
    pub fn build(self) -> Result<BrokerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
