//! Caller-side waiting for a bundle to unlock.
//!
//! [`HybridLock::decrypt`] never retries. This helper retries only while the
//! time-lock gate reports the round as unpublished, sleeping one interval
//! between attempts.

use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::debug;

use timevault_crypto::AsymmetricCryptosystem;
use timevault_tlock::TimeLockOracle;

use crate::bundle::EncryptedBundle;
use crate::error::LockError;
use crate::orchestrator::HybridLock;

/// Shortest allowed wait between attempts.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default)]
pub struct PollOptions {
    /// Wait between attempts. Defaults to the chain period, never below
    /// [`MIN_POLL_INTERVAL`].
    pub interval: Option<Duration>,
    /// Give up after this long. `None` waits indefinitely.
    pub deadline: Option<Duration>,
}

/// Decrypt `bundle`, waiting while its round is unpublished.
///
/// Every error other than [`LockError::TimeLockNotYetAvailable`] is returned
/// at once. When the deadline passes, the last not-yet-available error is
/// returned.
pub async fn decrypt_when_unlocked<C, O>(
    lock: &HybridLock<C, O>,
    bundle: &EncryptedBundle,
    password: &str,
    options: PollOptions,
) -> Result<Vec<u8>, LockError>
where
    C: AsymmetricCryptosystem + 'static,
    C::PrivateKey: 'static,
    O: TimeLockOracle,
{
    let period = Duration::from_secs(lock.oracle().chain().period());
    let interval = options.interval.unwrap_or(period).max(MIN_POLL_INTERVAL);
    let give_up_at = options.deadline.map(|d| Instant::now() + d);
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        let err = match lock.decrypt(bundle, password).await {
            Ok(plaintext) => return Ok(plaintext),
            Err(err) if err.is_not_yet_available() => err,
            Err(err) => return Err(err),
        };

        let wake_at = Instant::now() + interval;
        if let Some(limit) = give_up_at {
            if wake_at > limit {
                debug!(attempt, "deadline reached while waiting for round");
                return Err(err);
            }
        }
        if let LockError::TimeLockNotYetAvailable { round, available_at } = &err {
            let remaining = (*available_at - Utc::now()).num_seconds().max(0);
            debug!(attempt, round, remaining_secs = remaining, "round not yet published, waiting");
        }
        tokio::time::sleep_until(wake_at).await;
    }
}
