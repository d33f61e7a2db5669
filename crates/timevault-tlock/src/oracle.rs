//! The time-lock capability consumed by the hybrid lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::chain::ChainParameters;
use crate::error::OracleError;
use crate::round::{round_at, round_instant};

/// Identity-based time-lock encryption against a beacon chain.
///
/// Blobs are text-safe strings. `time_lock_decrypt` takes the round the
/// blob was locked for; it must fail with
/// [`OracleError::NotYetAvailable`] while that round is unpublished and
/// must never return bytes for a blob locked to a different round.
#[async_trait]
pub trait TimeLockOracle: Send + Sync {
    /// Parameters of the chain this oracle locks against.
    fn chain(&self) -> &ChainParameters;

    /// First round published at or after `instant`. Pure, no network.
    fn round_for_instant(&self, instant: DateTime<Utc>) -> u64 {
        round_at(instant, self.chain())
    }

    /// Instant at which `round` is published.
    fn round_available_at(&self, round: u64) -> DateTime<Utc> {
        round_instant(round, self.chain())
    }

    async fn time_lock_encrypt(&self, bytes: &[u8], round: u64) -> Result<String, OracleError>;

    async fn time_lock_decrypt(&self, blob: &str, round: u64) -> Result<Vec<u8>, OracleError>;
}
