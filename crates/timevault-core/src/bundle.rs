//! The encrypted bundle: everything needed to attempt a decryption.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use timevault_crypto::{base64url_decode, import_public_key, split_compact_jwe};

use crate::error::LockError;

/// Output of one encryption. Immutable once produced.
///
/// `round_number` is the only cryptographic binding to time;
/// `unlock_instant` is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedBundle {
    /// base64url SEC1 uncompressed P-256 point.
    pub public_key: String,
    /// Compact JWE of the plaintext under `public_key`.
    pub encrypted_payload: String,
    /// Time-lock ciphertext of the passphrase-protected private key.
    pub time_locked_private_key: String,
    pub unlock_instant: DateTime<Utc>,
    pub round_number: u64,
}

impl EncryptedBundle {
    /// Check the bundle's shape. Purely local; no network, no secrets.
    pub fn validate(&self) -> Result<(), LockError> {
        if self.round_number == 0 {
            return Err(LockError::InvalidBundle(
                "roundNumber must be positive".to_string(),
            ));
        }
        if self.public_key.is_empty() {
            return Err(LockError::InvalidBundle("publicKey is empty".to_string()));
        }
        import_public_key(&self.public_key)
            .map_err(|e| LockError::InvalidBundle(format!("publicKey: {}", e)))?;

        if self.encrypted_payload.is_empty() {
            return Err(LockError::InvalidBundle(
                "encryptedPayload is empty".to_string(),
            ));
        }
        split_compact_jwe(&self.encrypted_payload)
            .map_err(|e| LockError::InvalidBundle(format!("encryptedPayload: {}", e)))?;

        if self.time_locked_private_key.is_empty() {
            return Err(LockError::InvalidBundle(
                "timeLockedPrivateKey is empty".to_string(),
            ));
        }
        base64url_decode(&self.time_locked_private_key)
            .map_err(|e| LockError::InvalidBundle(format!("timeLockedPrivateKey: {}", e)))?;
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, LockError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LockError::InvalidBundle(format!("serialize: {}", e)))
    }

    /// Parse and validate a bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, LockError> {
        let bundle: EncryptedBundle = serde_json::from_str(json)
            .map_err(|e| LockError::InvalidBundle(format!("parse: {}", e)))?;
        bundle.validate()?;
        Ok(bundle)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LockError> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .map_err(|e| LockError::InvalidBundle(format!("write {}: {}", path.display(), e)))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LockError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| LockError::InvalidBundle(format!("read {}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }
}
