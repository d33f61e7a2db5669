//! Dual-factor temporal access control.
//!
//! A bundle produced by [`HybridLock::encrypt`] opens only when both hold:
//! the caller knows the password, and the beacon has published the round
//! the bundle was locked to.

pub mod bundle;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod poll;
pub mod unlock;

pub use bundle::EncryptedBundle;
pub use config::Settings;
pub use error::{ConfigError, LockError, LockErrorKind, UnlockSpecError};
pub use orchestrator::{DrandLock, HybridLock};
pub use poll::{decrypt_when_unlocked, PollOptions};
pub use unlock::{DurationPreset, UnlockSpec};

pub use timevault_crypto::{AsymmetricCryptosystem, P256Cryptosystem, PassphraseParams};
pub use timevault_tlock::{
    fetch_chain_parameters, ChainConfig, ChainParameters, DrandOracle, OracleError,
    SimulatedBeacon, TimeLockOracle,
};
