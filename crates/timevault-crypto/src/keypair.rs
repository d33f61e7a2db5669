//! Ephemeral P-256 keypairs and their text encodings.
//!
//! Public keys travel as base64url (unpadded) SEC1 uncompressed points:
//! 0x04 || x(32) || y(32).

use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use zeroize::Zeroize;

use crate::base64url::{base64url_decode, base64url_encode};
use crate::error::CryptoError;
use crate::types::{UnlockedPrivateKey, P256_SCALAR_LENGTH, P256_UNCOMPRESSED_POINT_LENGTH};

/// Generate a fresh P-256 secret key from the OS RNG.
pub fn generate_p256_secret() -> SecretKey {
    SecretKey::random(&mut p256::elliptic_curve::rand_core::OsRng)
}

/// Export a public key as base64url SEC1 uncompressed bytes.
pub fn export_public_key(key: &PublicKey) -> String {
    let point = key.to_encoded_point(false);
    base64url_encode(point.as_bytes())
}

/// Import a public key from its base64url SEC1 uncompressed encoding.
pub fn import_public_key(encoded: &str) -> Result<PublicKey, CryptoError> {
    let bytes = base64url_decode(encoded)?;
    if bytes.len() != P256_UNCOMPRESSED_POINT_LENGTH || bytes[0] != 0x04 {
        return Err(CryptoError::InvalidPublicKey(format!(
            "expected {} byte uncompressed point, got {} bytes",
            P256_UNCOMPRESSED_POINT_LENGTH,
            bytes.len()
        )));
    }
    PublicKey::from_sec1_bytes(&bytes)
        .map_err(|e| CryptoError::InvalidPublicKey(format!("P-256 point: {}", e)))
}

/// Copy the secret scalar out of a key. Caller owns zeroizing the result.
pub(crate) fn secret_scalar(key: &SecretKey) -> [u8; P256_SCALAR_LENGTH] {
    let mut field_bytes = key.to_bytes();
    let mut scalar = [0u8; P256_SCALAR_LENGTH];
    scalar.copy_from_slice(field_bytes.as_slice());
    field_bytes.as_mut_slice().zeroize();
    scalar
}

/// Rebuild a secret key from an unlocked private key.
pub(crate) fn secret_from_unlocked(key: &UnlockedPrivateKey) -> Result<SecretKey, CryptoError> {
    SecretKey::from_slice(key.scalar())
        .map_err(|e| CryptoError::InvalidProtectedKey(format!("invalid P-256 scalar: {}", e)))
}
