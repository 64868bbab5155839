// File: testnode/src/config.rs
//
// Harness Configuration
//
// Tunables for the height waiters and the block filler. Defaults reproduce the
// reference cadence (1s polls, 10s default timeout) and the reference sizing
// constants (248-byte message shares, 300-byte fixed overhead).

use crate::error::{HarnessError, Result};
use crate::shares::MSG_SHARE_SIZE;
use crate::signer::DEFAULT_GAS_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::time::Duration;

/// Env var overriding [`WaitConfig::poll_interval_ms`]
pub const ENV_POLL_INTERVAL_MS: &str = "TESTNODE_POLL_INTERVAL_MS";
/// Env var overriding [`WaitConfig::default_timeout_ms`]
pub const ENV_TIMEOUT_MS: &str = "TESTNODE_TIMEOUT_MS";

/// Polling cadence and deadline used by the height waiters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// Delay between two status queries
    pub poll_interval_ms: u64,
    /// Timeout applied by `wait_for_height` and `wait_for_next_block`
    pub default_timeout_ms: u64,
}

impl WaitConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Reject a cadence the waiters cannot tick on.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(HarnessError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.default_timeout_ms < self.poll_interval_ms {
            return Err(HarnessError::Config(format!(
                "default_timeout_ms ({}) must be at least poll_interval_ms ({})",
                self.default_timeout_ms, self.poll_interval_ms
            )));
        }
        Ok(())
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1_000,
            default_timeout_ms: 10_000,
        }
    }
}

/// Sizing and transaction options used by the block filler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillConfig {
    /// Raw payload bytes held by one capacity unit (one message share)
    pub share_size: usize,
    /// Bytes deducted from each payload for the transaction envelope
    pub fixed_overhead: usize,
    /// Gas limit applied to every pay-for-data transaction
    pub gas_limit: u64,
    /// Namespace draws allowed before giving up on the randomness source
    pub max_namespace_attempts: usize,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            share_size: MSG_SHARE_SIZE,
            fixed_overhead: 300,
            gas_limit: DEFAULT_GAS_LIMIT,
            max_namespace_attempts: 1024,
        }
    }
}

/// Complete harness configuration
///
/// # Example
///
/// ```yaml
/// wait:
///   poll_interval_ms: 250
///   default_timeout_ms: 5000
/// fill:
///   fixed_overhead: 300
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub wait: WaitConfig,
    pub fill: FillConfig,
}

impl HarnessConfig {
    /// Parse a YAML document; missing fields keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| HarnessError::Config(format!("failed to parse YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file and apply environment overrides on top of it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&raw)?.with_env_overrides()
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup` (env vars in production).
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_POLL_INTERVAL_MS) {
            self.wait.poll_interval_ms = parse_millis(ENV_POLL_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.wait.default_timeout_ms = parse_millis(ENV_TIMEOUT_MS, &value)?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Reject values the waiters or the filler cannot work with.
    pub fn validate(&self) -> Result<()> {
        self.wait.validate()?;
        if self.fill.share_size == 0 {
            return Err(HarnessError::Config(
                "share_size must be greater than zero".to_string(),
            ));
        }
        if self.fill.max_namespace_attempts == 0 {
            return Err(HarnessError::Config(
                "max_namespace_attempts must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| HarnessError::Config(format!("{} must be milliseconds: {}", key, e)))
}
