//! Time-lock layer for timevault.
//!
//! This crate knows about beacon chains: their parameters, how wall-clock
//! instants map to rounds, and how to lock bytes to a round so they only
//! open once the beacon publishes that round's signature.
//!
//! Two oracles implement [`TimeLockOracle`]:
//! - [`DrandOracle`] talks to a drand network over HTTP
//! - [`SimulatedBeacon`] keeps everything in process, for tests and demos

mod chain;
mod drand;
mod error;
mod oracle;
mod round;
mod simulated;

pub use chain::{
    quicknet, ChainConfig, ChainParameters, CHAIN_HASH_LENGTH, DEFAULT_SCHEME,
    MIN_PUBLIC_KEY_HEX_LENGTH,
};
pub use drand::{fetch_chain_parameters, DrandOracle};
pub use error::{ChainConfigError, OracleError};
pub use oracle::TimeLockOracle;
pub use round::{current_round, round_at, round_instant};
pub use simulated::SimulatedBeacon;
