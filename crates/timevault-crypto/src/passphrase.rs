//! Passphrase protection for private keys.
//!
//! sealKey = Argon2id(passphrase, salt, m_cost, t_cost, p_cost)
//! blob    = [magic "TVPK"][version=1][m_cost:4 BE][t_cost:4 BE][p_cost:4 BE][salt:16][IV:12][AES-256-GCM(sealKey, scalar)]
//!
//! The header (everything before the IV) is bound as AAD, so a blob whose
//! cost parameters were edited fails to open instead of deriving a new key.

use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroize;

use crate::aes_gcm::{aes_gcm_decrypt, aes_gcm_encrypt};
use crate::error::CryptoError;
use crate::types::{
    PassphraseParams, UnlockedPrivateKey, AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, AES_KEY_LENGTH,
    P256_SCALAR_LENGTH, PROTECTED_KEY_MAGIC, PROTECTED_KEY_VERSION, SALT_LENGTH,
    SUPPORTED_PROTECTED_KEY_VERSIONS,
};

const HEADER_LENGTH: usize = 4 + 1 + 4 + 4 + 4 + SALT_LENGTH;

/// Exact length of a protected P-256 private key blob.
pub const PROTECTED_KEY_LENGTH: usize =
    HEADER_LENGTH + AES_GCM_IV_LENGTH + P256_SCALAR_LENGTH + AES_GCM_TAG_LENGTH;

fn derive_seal_key(
    passphrase: &str,
    salt: &[u8],
    params: &PassphraseParams,
) -> Result<[u8; AES_KEY_LENGTH], CryptoError> {
    let argon_params = Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(AES_KEY_LENGTH),
    )
    .map_err(|e| CryptoError::KeyDerivation(format!("invalid Argon2 parameters: {}", e)))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = [0u8; AES_KEY_LENGTH];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(format!("Argon2 failed: {}", e)))?;
    Ok(key)
}

/// Seal a private scalar under a passphrase.
pub fn protect_private_key(
    scalar: &[u8],
    passphrase: &str,
    params: &PassphraseParams,
) -> Result<Vec<u8>, CryptoError> {
    if passphrase.is_empty() {
        return Err(CryptoError::EmptyPassphrase);
    }
    if scalar.len() != P256_SCALAR_LENGTH {
        return Err(CryptoError::InvalidKeyLength {
            expected: P256_SCALAR_LENGTH,
            got: scalar.len(),
        });
    }

    let mut salt = [0u8; SALT_LENGTH];
    getrandom::getrandom(&mut salt).map_err(|e| CryptoError::RngFailed(e.to_string()))?;

    let mut header = Vec::with_capacity(PROTECTED_KEY_LENGTH);
    header.extend_from_slice(PROTECTED_KEY_MAGIC);
    header.push(PROTECTED_KEY_VERSION);
    header.extend_from_slice(&params.m_cost.to_be_bytes());
    header.extend_from_slice(&params.t_cost.to_be_bytes());
    header.extend_from_slice(&params.p_cost.to_be_bytes());
    header.extend_from_slice(&salt);

    let mut seal_key = derive_seal_key(passphrase, &salt, params)?;
    let sealed = aes_gcm_encrypt(&seal_key, scalar, &header);
    seal_key.zeroize();

    let mut blob = header;
    blob.extend_from_slice(&sealed?);
    Ok(blob)
}

/// Read the cost parameters out of a protected key header.
pub fn peek_params(protected: &[u8]) -> Result<PassphraseParams, CryptoError> {
    if protected.len() < HEADER_LENGTH {
        return Err(CryptoError::InvalidProtectedKey(format!(
            "expected {} bytes, got {}",
            PROTECTED_KEY_LENGTH,
            protected.len()
        )));
    }
    if &protected[..4] != PROTECTED_KEY_MAGIC {
        return Err(CryptoError::InvalidProtectedKey("bad magic".to_string()));
    }
    let version = protected[4];
    if !SUPPORTED_PROTECTED_KEY_VERSIONS.contains(&version) {
        return Err(CryptoError::UnsupportedVersion(version));
    }

    let read_u32 = |offset: usize| {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&protected[offset..offset + 4]);
        u32::from_be_bytes(buf)
    };
    Ok(PassphraseParams {
        m_cost: read_u32(5),
        t_cost: read_u32(9),
        p_cost: read_u32(13),
    })
}

/// Unlock a protected private key with its passphrase.
///
/// A passphrase mismatch is reported as [`CryptoError::WrongPassphrase`];
/// structural problems with the blob are [`CryptoError::InvalidProtectedKey`].
pub fn unlock_private_key(
    protected: &[u8],
    passphrase: &str,
) -> Result<UnlockedPrivateKey, CryptoError> {
    let params = peek_params(protected)?;
    if protected.len() != PROTECTED_KEY_LENGTH {
        return Err(CryptoError::InvalidProtectedKey(format!(
            "expected {} bytes, got {}",
            PROTECTED_KEY_LENGTH,
            protected.len()
        )));
    }
    if !params.within_limits() {
        return Err(CryptoError::InvalidProtectedKey(format!(
            "Argon2 cost parameters out of range: m={} t={} p={}",
            params.m_cost, params.t_cost, params.p_cost
        )));
    }
    if passphrase.is_empty() {
        return Err(CryptoError::WrongPassphrase);
    }

    let header = &protected[..HEADER_LENGTH];
    let salt = &header[HEADER_LENGTH - SALT_LENGTH..];
    let mut seal_key = derive_seal_key(passphrase, salt, &params)?;
    let opened = aes_gcm_decrypt(&seal_key, &protected[HEADER_LENGTH..], header);
    seal_key.zeroize();

    let mut scalar_bytes = opened.map_err(|_| CryptoError::WrongPassphrase)?;
    let mut scalar = [0u8; P256_SCALAR_LENGTH];
    scalar.copy_from_slice(&scalar_bytes);
    scalar_bytes.zeroize();
    Ok(UnlockedPrivateKey::from_scalar(scalar))
}
