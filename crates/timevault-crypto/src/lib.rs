//! Asymmetric primitives for timevault.
//!
//! - Ephemeral P-256 keypair generation
//! - Argon2id + AES-256-GCM passphrase protection of private keys
//! - Compact JWE (ECDH-ES+A256KW / A256GCM) public-key encryption
//! - HKDF-SHA256 and raw AES-256-GCM helpers shared with the simulated beacon

pub mod aes_gcm;
pub mod base64url;
pub mod cryptosystem;
pub mod error;
pub mod hkdf;
pub mod jwe;
pub mod keypair;
pub mod passphrase;
pub mod types;

pub use crate::aes_gcm::{aes_gcm_decrypt, aes_gcm_encrypt};
pub use base64url::{base64url_decode, base64url_encode};
pub use cryptosystem::{AsymmetricCryptosystem, P256Cryptosystem};
pub use error::CryptoError;
pub use crate::hkdf::hkdf_derive;
pub use jwe::{decrypt_jwe, encrypt_jwe, parse_compact_jwe, split_compact_jwe};
pub use keypair::{export_public_key, generate_p256_secret, import_public_key};
pub use passphrase::{peek_params, protect_private_key, unlock_private_key, PROTECTED_KEY_LENGTH};
pub use types::{
    PassphraseParams, ProtectedKeypair, UnlockedPrivateKey, AES_KEY_LENGTH,
    PROTECTED_KEY_VERSION,
};
