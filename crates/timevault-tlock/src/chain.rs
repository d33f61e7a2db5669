//! Beacon chain parameters.
//!
//! `ChainConfig` is what an operator writes down (URL, chain hash, public
//! key, optionally genesis and period). `ChainParameters` is the validated,
//! immutable form shared by every encrypt/decrypt call.

use serde::{Deserialize, Serialize};

use crate::error::ChainConfigError;

/// Length of a chain hash in bytes (SHA-256).
pub const CHAIN_HASH_LENGTH: usize = 32;

/// Minimum accepted length of the hex-encoded chain public key.
pub const MIN_PUBLIC_KEY_HEX_LENGTH: usize = 128;

/// Scheme assumed when the configuration does not name one.
pub const DEFAULT_SCHEME: &str = "bls-unchained-g1-rfc9380";

/// drand quicknet: 3 second rounds, unchained G1 signatures.
pub mod quicknet {
    pub const BEACON_URL: &str = "https://api.drand.sh";
    pub const CHAIN_HASH: &str = "52db9ba70e0cc0f6eaf7803dd07447a1f5477735fd3f661792ba94600c84e971";
    pub const PUBLIC_KEY: &str = "83cf0f2896adee7eb8b5f01fcad3912212c437e0073e911fb90022d3e760183c8c4b450b6a0a6c3ac6a5776a2d1064510d1fec758c921cc22b0e17e63aaf4bcb5ed66304de9cf809bd274ca73bab4af5a6e9c76a4bc09e76eae8991ef5ece45a";
    pub const GENESIS_TIME: u64 = 1692803367;
    pub const PERIOD: u64 = 3;
}

/// Operator-supplied chain configuration, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub beacon_url: String,
    /// 64 hex characters.
    pub chain_hash: String,
    /// Hex-encoded BLS public key (at least 128 characters).
    pub public_key: String,
    /// Unix seconds. Fetched from the beacon when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genesis_time: Option<u64>,
    /// Seconds between rounds. Fetched from the beacon when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
}

impl ChainConfig {
    /// Configuration for drand quicknet with genesis and period pinned.
    pub fn quicknet() -> Self {
        Self {
            beacon_url: quicknet::BEACON_URL.to_string(),
            chain_hash: quicknet::CHAIN_HASH.to_string(),
            public_key: quicknet::PUBLIC_KEY.to_string(),
            genesis_time: Some(quicknet::GENESIS_TIME),
            period: Some(quicknet::PERIOD),
            scheme: Some(DEFAULT_SCHEME.to_string()),
        }
    }

    /// True when round arithmetic can run without asking the beacon.
    pub fn has_timing(&self) -> bool {
        self.genesis_time.is_some() && self.period.is_some()
    }
}

/// Validated, immutable description of a beacon chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParameters {
    beacon_url: String,
    chain_hash: [u8; CHAIN_HASH_LENGTH],
    public_key: Vec<u8>,
    genesis_time: u64,
    period: u64,
    scheme: String,
}

impl ChainParameters {
    /// Validate a configuration that already carries genesis time and period.
    pub fn from_config(config: &ChainConfig) -> Result<Self, ChainConfigError> {
        let genesis_time = config
            .genesis_time
            .ok_or(ChainConfigError::MissingField {
                field: "genesis_time",
            })?;
        let period = config
            .period
            .ok_or(ChainConfigError::MissingField { field: "period" })?;
        Self::from_parts(config, genesis_time, period)
    }

    /// Validate a configuration, taking timing from an external source
    /// (normally the beacon's chain info). Values pinned in the
    /// configuration must agree with the source.
    pub fn from_config_with_timing(
        config: &ChainConfig,
        genesis_time: u64,
        period: u64,
    ) -> Result<Self, ChainConfigError> {
        if let Some(pinned) = config.genesis_time {
            if pinned != genesis_time {
                return Err(ChainConfigError::ChainMismatch(format!(
                    "genesis_time: configured {}, beacon reports {}",
                    pinned, genesis_time
                )));
            }
        }
        if let Some(pinned) = config.period {
            if pinned != period {
                return Err(ChainConfigError::ChainMismatch(format!(
                    "period: configured {}, beacon reports {}",
                    pinned, period
                )));
            }
        }
        Self::from_parts(config, genesis_time, period)
    }

    fn from_parts(
        config: &ChainConfig,
        genesis_time: u64,
        period: u64,
    ) -> Result<Self, ChainConfigError> {
        let beacon_url = validate_url(&config.beacon_url)?;
        let chain_hash = decode_chain_hash(&config.chain_hash)?;
        let public_key = decode_public_key(&config.public_key)?;
        if period == 0 {
            return Err(ChainConfigError::InvalidPeriod);
        }
        let scheme = match config.scheme.as_deref() {
            Some(s) if !s.is_empty() => s.to_string(),
            _ => DEFAULT_SCHEME.to_string(),
        };

        Ok(Self {
            beacon_url,
            chain_hash,
            public_key,
            genesis_time,
            period,
            scheme,
        })
    }

    pub fn beacon_url(&self) -> &str {
        &self.beacon_url
    }

    /// URL of this chain's HTTP API: `{beacon_url}/{chain_hash}`.
    ///
    /// A beacon URL that already ends in the chain hash is used as is.
    pub fn chain_url(&self) -> String {
        let hash_hex = self.chain_hash_hex();
        if self.beacon_url.ends_with(&hash_hex) {
            self.beacon_url.clone()
        } else {
            format!("{}/{}", self.beacon_url, hash_hex)
        }
    }

    pub fn chain_hash(&self) -> &[u8; CHAIN_HASH_LENGTH] {
        &self.chain_hash
    }

    pub fn chain_hash_hex(&self) -> String {
        hex::encode(self.chain_hash)
    }

    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// Genesis time in unix seconds.
    pub fn genesis_time(&self) -> u64 {
        self.genesis_time
    }

    /// Seconds between rounds.
    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }
}

fn validate_url(url: &str) -> Result<String, ChainConfigError> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ChainConfigError::MissingField {
            field: "beacon_url",
        });
    }
    if !(trimmed.starts_with("https://") || trimmed.starts_with("http://")) {
        return Err(ChainConfigError::InvalidUrl(format!(
            "expected http(s) URL, got {}",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

fn decode_chain_hash(hash: &str) -> Result<[u8; CHAIN_HASH_LENGTH], ChainConfigError> {
    if hash.is_empty() {
        return Err(ChainConfigError::MissingField {
            field: "chain_hash",
        });
    }
    if hash.len() != CHAIN_HASH_LENGTH * 2 {
        return Err(ChainConfigError::InvalidChainHash(format!(
            "{} characters",
            hash.len()
        )));
    }
    let mut out = [0u8; CHAIN_HASH_LENGTH];
    hex::decode_to_slice(hash, &mut out)
        .map_err(|e| ChainConfigError::InvalidChainHash(e.to_string()))?;
    Ok(out)
}

fn decode_public_key(key: &str) -> Result<Vec<u8>, ChainConfigError> {
    if key.is_empty() {
        return Err(ChainConfigError::MissingField {
            field: "public_key",
        });
    }
    if key.len() < MIN_PUBLIC_KEY_HEX_LENGTH {
        return Err(ChainConfigError::InvalidPublicKey(format!(
            "expected at least {} hex characters, got {}",
            MIN_PUBLIC_KEY_HEX_LENGTH,
            key.len()
        )));
    }
    hex::decode(key).map_err(|e| ChainConfigError::InvalidPublicKey(e.to_string()))
}
