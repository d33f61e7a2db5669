//! The hybrid lock: password gate composed with a time-lock gate.
//!
//! Encryption generates a fresh keypair per call, encrypts the plaintext to
//! its public key, and time-locks the passphrase-protected private key to
//! the beacon round of the unlock instant. Decryption runs the gates in
//! order: time-lock first (it yields the protected key), then password,
//! then the payload.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use timevault_crypto::{AsymmetricCryptosystem, P256Cryptosystem};
use timevault_tlock::{ChainParameters, DrandOracle, TimeLockOracle};

use crate::bundle::EncryptedBundle;
use crate::error::LockError;
use crate::unlock::UnlockSpec;

/// Composes an asymmetric cryptosystem with a time-lock oracle.
///
/// Holds only shared, read-only handles; any number of `encrypt`/`decrypt`
/// calls may run concurrently.
pub struct HybridLock<C, O> {
    crypto: Arc<C>,
    oracle: Arc<O>,
}

/// P-256 + drand, the production combination.
pub type DrandLock = HybridLock<P256Cryptosystem, DrandOracle>;

impl DrandLock {
    /// Lock against a drand chain with default Argon2id costs.
    pub fn drand(chain: Arc<ChainParameters>) -> Self {
        HybridLock::new(
            Arc::new(P256Cryptosystem::default()),
            Arc::new(DrandOracle::new(chain)),
        )
    }
}

impl<C, O> Clone for HybridLock<C, O> {
    fn clone(&self) -> Self {
        Self {
            crypto: Arc::clone(&self.crypto),
            oracle: Arc::clone(&self.oracle),
        }
    }
}

impl<C, O> HybridLock<C, O>
where
    C: AsymmetricCryptosystem + 'static,
    C::PrivateKey: 'static,
    O: TimeLockOracle,
{
    pub fn new(crypto: Arc<C>, oracle: Arc<O>) -> Self {
        Self { crypto, oracle }
    }

    pub fn crypto(&self) -> &Arc<C> {
        &self.crypto
    }

    pub fn oracle(&self) -> &Arc<O> {
        &self.oracle
    }

    /// Round a bundle created now with `unlock` would be locked to.
    pub fn round_for(&self, unlock: UnlockSpec) -> u64 {
        self.oracle.round_for_instant(unlock.resolve(Utc::now()))
    }

    /// Encrypt `plaintext` so it opens only with `password` and only once
    /// the unlock instant has passed on the beacon.
    pub async fn encrypt(
        &self,
        plaintext: &[u8],
        password: &str,
        unlock: UnlockSpec,
    ) -> Result<EncryptedBundle, LockError> {
        self.encrypt_at(plaintext, password, unlock, Utc::now()).await
    }

    /// [`encrypt`](Self::encrypt) with relative unlock specs resolved
    /// against `now`.
    #[instrument(level = "debug", skip(self, plaintext, password), fields(len = plaintext.len(), %unlock))]
    pub async fn encrypt_at(
        &self,
        plaintext: &[u8],
        password: &str,
        unlock: UnlockSpec,
        now: DateTime<Utc>,
    ) -> Result<EncryptedBundle, LockError> {
        let crypto = Arc::clone(&self.crypto);
        let passphrase = Zeroizing::new(password.to_string());
        let keypair = tokio::task::spawn_blocking(move || {
            crypto.generate_protected_keypair(passphrase.as_str())
        })
        .await
        .map_err(|e| LockError::KeyGeneration(format!("key generation task: {}", e)))?
        .map_err(|e| LockError::KeyGeneration(e.to_string()))?;
        debug!("generated ephemeral keypair");

        let encrypted_payload = self
            .crypto
            .encrypt_to_public_key(plaintext, &keypair.public_key)
            .map_err(|e| LockError::Encryption(e.to_string()))?;

        let unlock_instant = unlock.resolve(now);
        let round_number = self.oracle.round_for_instant(unlock_instant);
        debug!(%unlock_instant, round_number, "resolved unlock round");

        let time_locked_private_key = self
            .oracle
            .time_lock_encrypt(&keypair.protected_private_key, round_number)
            .await
            .map_err(|e| LockError::TimeLock(e.to_string()))?;
        debug!(round_number, "time-locked private key");

        Ok(EncryptedBundle {
            public_key: keypair.public_key,
            encrypted_payload,
            time_locked_private_key,
            unlock_instant,
            round_number,
        })
    }

    /// Open a bundle. Fails with
    /// [`LockError::TimeLockNotYetAvailable`] before the bundle's round is
    /// published, regardless of the password. Never retries.
    #[instrument(level = "debug", skip_all, fields(round = bundle.round_number))]
    pub async fn decrypt(
        &self,
        bundle: &EncryptedBundle,
        password: &str,
    ) -> Result<Vec<u8>, LockError> {
        bundle.validate()?;

        let protected = self
            .oracle
            .time_lock_decrypt(&bundle.time_locked_private_key, bundle.round_number)
            .await
            .map_err(LockError::from_oracle)?;
        debug!("time-lock gate open");

        let crypto = Arc::clone(&self.crypto);
        let passphrase = Zeroizing::new(password.to_string());
        let private_key = tokio::task::spawn_blocking(move || {
            crypto.unlock_private_key(&protected, passphrase.as_str())
        })
        .await
        .map_err(|e| LockError::PayloadIntegrity(format!("unlock task: {}", e)))?
        .map_err(LockError::from_unlock)?;
        debug!("password gate open");

        let recovered_public_key = self
            .crypto
            .public_key_for(&private_key)
            .map_err(|e| LockError::PayloadIntegrity(e.to_string()))?;
        if recovered_public_key != bundle.public_key {
            return Err(LockError::PayloadIntegrity(
                "publicKey does not match the time-locked private key".to_string(),
            ));
        }

        self.crypto
            .decrypt_with_private_key(&bundle.encrypted_payload, &private_key)
            .map_err(|e| LockError::PayloadIntegrity(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LockErrorKind;
    use crate::unlock::DurationPreset;
    use chrono::Duration;
    use timevault_crypto::PassphraseParams;
    use timevault_tlock::{ChainConfig, SimulatedBeacon};

    fn lock() -> HybridLock<P256Cryptosystem, SimulatedBeacon> {
        let chain = Arc::new(ChainParameters::from_config(&ChainConfig::quicknet()).unwrap());
        HybridLock::new(
            Arc::new(P256Cryptosystem::new(PassphraseParams::insecure_fast())),
            Arc::new(SimulatedBeacon::manual(chain, [9u8; 32])),
        )
    }

    #[tokio::test]
    async fn bundle_round_matches_unlock_instant() {
        let lock = lock();
        let now = Utc::now();
        let bundle = lock
            .encrypt_at(b"x", "pw", DurationPreset::OneHour.into(), now)
            .await
            .unwrap();
        assert_eq!(bundle.unlock_instant, now + Duration::hours(1));
        assert_eq!(
            bundle.round_number,
            lock.oracle().round_for_instant(bundle.unlock_instant)
        );
        bundle.validate().unwrap();
    }

    #[tokio::test]
    async fn empty_password_is_key_generation_failure() {
        let err = lock()
            .encrypt(b"x", "", UnlockSpec::AfterMillis(0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), LockErrorKind::KeyGeneration);
    }

    #[tokio::test]
    async fn each_encryption_uses_a_fresh_keypair() {
        let lock = lock();
        let a = lock.encrypt(b"x", "pw", UnlockSpec::AfterMillis(0)).await.unwrap();
        let b = lock.encrypt(b"x", "pw", UnlockSpec::AfterMillis(0)).await.unwrap();
        assert_ne!(a.public_key, b.public_key);
        assert_ne!(a.time_locked_private_key, b.time_locked_private_key);
    }

    #[tokio::test]
    async fn decrypt_after_release() {
        let lock = lock();
        let bundle = lock
            .encrypt(b"payload", "pw", UnlockSpec::AfterMillis(10_000))
            .await
            .unwrap();
        lock.oracle().release_round(bundle.round_number);
        assert_eq!(lock.decrypt(&bundle, "pw").await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn invalid_bundle_short_circuits() {
        let lock = lock();
        let mut bundle = lock
            .encrypt(b"payload", "pw", UnlockSpec::AfterMillis(0))
            .await
            .unwrap();
        bundle.round_number = 0;
        assert_eq!(
            lock.decrypt(&bundle, "pw").await.unwrap_err().kind(),
            LockErrorKind::InvalidBundle
        );
    }

    #[tokio::test]
    async fn clones_share_the_oracle() {
        let lock = lock();
        let other = lock.clone();
        assert!(Arc::ptr_eq(lock.oracle(), other.oracle()));
    }
}
