use chrono::{DateTime, Utc};
use thiserror::Error;

use timevault_crypto::CryptoError;
use timevault_tlock::OracleError;

/// Failure of a lock or unlock operation.
///
/// Every failure aborts the operation; nothing is retried internally and no
/// partial output is produced.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Time-lock failed: {0}")]
    TimeLock(String),

    /// Gate 1 is still closed. Retry once the beacon reaches `round`.
    #[error("Time-lock not yet available: round {round} is published at {available_at}")]
    TimeLockNotYetAvailable {
        round: u64,
        available_at: DateTime<Utc>,
    },

    #[error("Incorrect password")]
    Password,

    #[error("Payload integrity check failed: {0}")]
    PayloadIntegrity(String),

    #[error("Invalid bundle: {0}")]
    InvalidBundle(String),
}

/// Fieldless discriminant of [`LockError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockErrorKind {
    KeyGeneration,
    Encryption,
    TimeLock,
    TimeLockNotYetAvailable,
    Password,
    PayloadIntegrity,
    InvalidBundle,
}

impl LockError {
    pub fn kind(&self) -> LockErrorKind {
        match self {
            LockError::KeyGeneration(_) => LockErrorKind::KeyGeneration,
            LockError::Encryption(_) => LockErrorKind::Encryption,
            LockError::TimeLock(_) => LockErrorKind::TimeLock,
            LockError::TimeLockNotYetAvailable { .. } => LockErrorKind::TimeLockNotYetAvailable,
            LockError::Password => LockErrorKind::Password,
            LockError::PayloadIntegrity(_) => LockErrorKind::PayloadIntegrity,
            LockError::InvalidBundle(_) => LockErrorKind::InvalidBundle,
        }
    }

    /// True when waiting for the beacon can make a retry succeed.
    pub fn is_not_yet_available(&self) -> bool {
        matches!(self, LockError::TimeLockNotYetAvailable { .. })
    }

    /// Gate 1 failure.
    pub(crate) fn from_oracle(err: OracleError) -> Self {
        match err {
            OracleError::NotYetAvailable {
                round,
                available_at,
            } => LockError::TimeLockNotYetAvailable {
                round,
                available_at,
            },
            other => LockError::TimeLock(other.to_string()),
        }
    }

    /// Gate 2 failure.
    pub(crate) fn from_unlock(err: CryptoError) -> Self {
        match err {
            CryptoError::WrongPassphrase | CryptoError::EmptyPassphrase => LockError::Password,
            // Gate 1 authenticated these bytes, so anything else is corruption
            other => LockError::PayloadIntegrity(other.to_string()),
        }
    }
}

/// An unlock spec string that is neither a preset, `custom:<ms>`, nor an
/// RFC 3339 instant.
#[derive(Debug, Error)]
pub enum UnlockSpecError {
    #[error("Unrecognized unlock spec {0:?}: expected a preset (1min, 1hour, 1day, 1week, 1month, 1year), custom:<ms>, or an RFC 3339 instant")]
    Unrecognized(String),

    #[error("Invalid custom duration {0:?}: expected a non-negative number of milliseconds")]
    InvalidCustom(String),
}

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid chain configuration: {0}")]
    Chain(#[from] timevault_tlock::ChainConfigError),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(err.to_string())
    }
}
