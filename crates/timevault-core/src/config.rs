//! Beacon configuration loaded from `timevault.toml` and the environment.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use timevault_tlock::{ChainConfig, ChainParameters};

use crate::error::ConfigError;

/// Default configuration file, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "timevault.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TIMEVAULT_";

/// Beacon settings. Loaded once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub beacon_url: String,
    pub chain_hash: String,
    pub public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_time: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

impl Settings {
    /// Load from `timevault.toml` (if present), overridden by `TIMEVAULT_*`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from the given TOML file (if present), overridden by `TIMEVAULT_*`.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings: Settings = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        settings.chain_parameters_if_complete()?;
        Ok(settings)
    }

    /// Like [`load_from`](Self::load_from), but layered over drand quicknet
    /// so every option becomes optional.
    pub fn load_over_quicknet(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::quicknet()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()?;
        settings.chain_parameters_if_complete()?;
        Ok(settings)
    }

    /// drand quicknet with timing pinned.
    pub fn quicknet() -> Self {
        Self::from(ChainConfig::quicknet())
    }

    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            beacon_url: self.beacon_url.clone(),
            chain_hash: self.chain_hash.clone(),
            public_key: self.public_key.clone(),
            genesis_time: self.genesis_time,
            period: self.period,
            scheme: self.scheme.clone(),
        }
    }

    /// Validate eagerly when timing is pinned; otherwise the remaining
    /// checks run once the beacon reports its timing.
    fn chain_parameters_if_complete(&self) -> Result<(), ConfigError> {
        let config = self.chain_config();
        if config.has_timing() {
            ChainParameters::from_config(&config)?;
        } else {
            ChainParameters::from_config_with_timing(
                &config,
                config.genesis_time.unwrap_or(0),
                config.period.unwrap_or(1),
            )?;
        }
        Ok(())
    }
}

impl From<ChainConfig> for Settings {
    fn from(config: ChainConfig) -> Self {
        Self {
            beacon_url: config.beacon_url,
            chain_hash: config.chain_hash,
            public_key: config.public_key,
            genesis_time: config.genesis_time,
            period: config.period,
            scheme: config.scheme,
        }
    }
}
