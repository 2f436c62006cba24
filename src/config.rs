//! Configuration management for Emberchain

use crate::error::ChainError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub miner: MinerConfig,
}

/// How a batch operation reacts to a failing item.
///
/// The peer-merge and block-application paths historically stopped at the
/// first failing entry; `Continue` processes the remaining entries instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    FailFast,
    Continue,
}

#[derive(Debug, Deserialize)]
pub struct SyncConfig {
    /// Seconds between peer synchronization passes.
    #[serde(default = "default_sync_interval")]
    pub interval_secs: u64,
    /// Per-request timeout for peer HTTP calls. Unset means no timeout, in
    /// which case an unresponsive peer stalls the rest of that sync pass.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            interval_secs: default_sync_interval(),
            request_timeout_secs: None,
            failure_policy: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MinerConfig {
    /// Hex address credited with rewards and fees for blocks this node mines.
    #[serde(default)]
    pub beneficiary_address: String,
    #[serde(default = "default_mining_reward")]
    pub mining_reward: u64,
}

impl Default for MinerConfig {
    fn default() -> Self {
        MinerConfig {
            beneficiary_address: String::new(),
            mining_reward: default_mining_reward(),
        }
    }
}

/// Loads configuration from a TOML file, falling back to defaults when the
/// file is absent.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ChainError> {
    let config_str = fs::read_to_string(path).unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        Config::default()
    } else {
        toml::from_str(&config_str).map_err(|e| ChainError::ConfigError(e.to_string()))?
    };

    if config.sync.interval_secs == 0 {
        return Err(ChainError::ConfigError(
            "sync.interval_secs must be greater than zero".to_string(),
        ));
    }

    Ok(config)
}

fn default_sync_interval() -> u64 {
    10
}

fn default_mining_reward() -> u64 {
    700
}
