//! The asymmetric capability consumed by the hybrid lock.

use tracing::debug;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::jwe::{decrypt_jwe, encrypt_jwe};
use crate::keypair::{
    export_public_key, generate_p256_secret, import_public_key, secret_from_unlocked,
    secret_scalar,
};
use crate::passphrase::{protect_private_key, unlock_private_key};
use crate::types::{PassphraseParams, ProtectedKeypair, UnlockedPrivateKey};

/// Public-key encryption with passphrase-protected private keys.
///
/// Implementations must report a passphrase mismatch from
/// [`unlock_private_key`](AsymmetricCryptosystem::unlock_private_key) as
/// [`CryptoError::WrongPassphrase`] so callers can tell it apart from a
/// corrupted key.
pub trait AsymmetricCryptosystem: Send + Sync {
    /// Unlocked private key handed from `unlock_private_key` to
    /// `decrypt_with_private_key`.
    type PrivateKey: Send;

    fn generate_protected_keypair(&self, passphrase: &str)
        -> Result<ProtectedKeypair, CryptoError>;

    fn encrypt_to_public_key(&self, plaintext: &[u8], public_key: &str)
        -> Result<String, CryptoError>;

    fn unlock_private_key(
        &self,
        protected_private_key: &[u8],
        passphrase: &str,
    ) -> Result<Self::PrivateKey, CryptoError>;

    fn decrypt_with_private_key(
        &self,
        ciphertext: &str,
        private_key: &Self::PrivateKey,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Encoded public key matching `private_key`, in the same form
    /// `generate_protected_keypair` returns.
    fn public_key_for(&self, private_key: &Self::PrivateKey) -> Result<String, CryptoError>;
}

/// P-256 / ECDH-ES+A256KW cryptosystem with Argon2id key protection.
#[derive(Debug, Clone, Default)]
pub struct P256Cryptosystem {
    params: PassphraseParams,
}

impl P256Cryptosystem {
    pub fn new(params: PassphraseParams) -> Self {
        Self { params }
    }

    /// Argon2id costs used for newly generated keys.
    pub fn params(&self) -> &PassphraseParams {
        &self.params
    }
}

impl AsymmetricCryptosystem for P256Cryptosystem {
    type PrivateKey = UnlockedPrivateKey;

    fn generate_protected_keypair(
        &self,
        passphrase: &str,
    ) -> Result<ProtectedKeypair, CryptoError> {
        if passphrase.is_empty() {
            return Err(CryptoError::EmptyPassphrase);
        }
        let secret = generate_p256_secret();
        let public_key = export_public_key(&secret.public_key());

        let mut scalar = secret_scalar(&secret);
        let protected = protect_private_key(&scalar, passphrase, &self.params);
        scalar.zeroize();

        debug!(
            m_cost = self.params.m_cost,
            t_cost = self.params.t_cost,
            "generated protected P-256 keypair"
        );
        Ok(ProtectedKeypair {
            public_key,
            protected_private_key: protected?,
        })
    }

    fn encrypt_to_public_key(
        &self,
        plaintext: &[u8],
        public_key: &str,
    ) -> Result<String, CryptoError> {
        let recipient = import_public_key(public_key)?;
        encrypt_jwe(plaintext, &recipient)
    }

    fn unlock_private_key(
        &self,
        protected_private_key: &[u8],
        passphrase: &str,
    ) -> Result<UnlockedPrivateKey, CryptoError> {
        let unlocked = unlock_private_key(protected_private_key, passphrase)?;
        // Reject scalars that are not valid P-256 keys before handing them out
        secret_from_unlocked(&unlocked)?;
        Ok(unlocked)
    }

    fn decrypt_with_private_key(
        &self,
        ciphertext: &str,
        private_key: &UnlockedPrivateKey,
    ) -> Result<Vec<u8>, CryptoError> {
        let secret = secret_from_unlocked(private_key)?;
        decrypt_jwe(ciphertext, &secret)
    }

    fn public_key_for(&self, private_key: &UnlockedPrivateKey) -> Result<String, CryptoError> {
        let secret = secret_from_unlocked(private_key)?;
        Ok(export_public_key(&secret.public_key()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn system() -> P256Cryptosystem {
        P256Cryptosystem::new(PassphraseParams::insecure_fast())
    }

    #[test]
    fn full_round_trip() {
        let sys = system();
        let pair = sys.generate_protected_keypair("p1").unwrap();
        let ct = sys.encrypt_to_public_key(b"Hello", &pair.public_key).unwrap();
        let key = sys.unlock_private_key(&pair.protected_private_key, "p1").unwrap();
        assert_eq!(sys.decrypt_with_private_key(&ct, &key).unwrap(), b"Hello");
    }

    #[test]
    fn unlocked_key_matches_public_key() {
        let sys = system();
        let pair = sys.generate_protected_keypair("p1").unwrap();
        let key = sys.unlock_private_key(&pair.protected_private_key, "p1").unwrap();
        assert_eq!(sys.public_key_for(&key).unwrap(), pair.public_key);
    }

    #[test]
    fn wrong_passphrase_reports_mismatch() {
        let sys = system();
        let pair = sys.generate_protected_keypair("p1").unwrap();
        let err = sys
            .unlock_private_key(&pair.protected_private_key, "p2")
            .unwrap_err();
        assert!(matches!(err, CryptoError::WrongPassphrase));
    }

    #[test]
    fn empty_passphrase_rejected() {
        let err = system().generate_protected_keypair("").unwrap_err();
        assert!(matches!(err, CryptoError::EmptyPassphrase));
    }

    #[test]
    fn keypairs_are_fresh() {
        let sys = system();
        let a = sys.generate_protected_keypair("pw").unwrap();
        let b = sys.generate_protected_keypair("pw").unwrap();
        assert_ne!(a.public_key, b.public_key);
        assert_ne!(a.protected_private_key, b.protected_private_key);
    }

    #[test]
    fn key_from_other_pair_cannot_decrypt() {
        let sys = system();
        let a = sys.generate_protected_keypair("pw").unwrap();
        let b = sys.generate_protected_keypair("pw").unwrap();
        let ct = sys.encrypt_to_public_key(b"data", &a.public_key).unwrap();
        let key_b = sys.unlock_private_key(&b.protected_private_key, "pw").unwrap();
        assert!(sys.decrypt_with_private_key(&ct, &key_b).is_err());
    }

    #[test]
    fn rejects_garbage_public_key() {
        let err = system()
            .encrypt_to_public_key(b"data", "not-a-key")
            .unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidPublicKey(_) | CryptoError::Encoding(_)
        ));
    }

    #[test]
    fn default_params_are_owasp() {
        let sys = P256Cryptosystem::default();
        assert_eq!(sys.params().m_cost, 19 * 1024);
        assert_eq!(sys.params().t_cost, 2);
    }
}
