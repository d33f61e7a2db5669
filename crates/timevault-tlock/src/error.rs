use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainConfigError {
    #[error("Invalid chain configuration: missing {field}")]
    MissingField { field: &'static str },

    #[error("Invalid chain hash: expected 64 hex characters, got {0}")]
    InvalidChainHash(String),

    #[error("Invalid chain public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid beacon URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid beacon period: must be a positive number of seconds")]
    InvalidPeriod,

    #[error("Beacon chain info does not match configuration: {0}")]
    ChainMismatch(String),
}

#[derive(Debug, Error)]
pub enum OracleError {
    /// The beacon has not published a signature for this round yet.
    #[error("Round {round} not yet available (published at {available_at})")]
    NotYetAvailable {
        round: u64,
        available_at: DateTime<Utc>,
    },

    #[error("Beacon unreachable: {0}")]
    Network(String),

    #[error("Beacon chain mismatch: {0}")]
    ChainMismatch(String),

    #[error("Beacon verification failed: {0}")]
    Verification(String),

    #[error("Malformed time-locked blob: {0}")]
    Malformed(String),

    #[error("Time-lock encryption failed: {0}")]
    Encryption(String),

    #[error("Invalid round: {0}")]
    InvalidRound(u64),

    #[error("Chain configuration error: {0}")]
    Config(#[from] ChainConfigError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] timevault_crypto::CryptoError),
}

impl OracleError {
    /// True when retrying after the beacon advances can succeed.
    pub fn is_not_yet_available(&self) -> bool {
        matches!(self, OracleError::NotYetAvailable { .. })
    }
}
