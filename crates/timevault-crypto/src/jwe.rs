//! Public-key encryption as compact JWE with ECDH-ES+A256KW / A256GCM.
//!
//! Implements compact JWE format per RFC 7516 with:
//! - Key agreement: ECDH-ES+A256KW (RFC 7518 §4.6)
//! - Content encryption: A256GCM (RFC 7518 §5.3)
//!
//! The key agreement uses Concat KDF (NIST SP 800-56A §5.8.1) to derive
//! a 256-bit KEK from the ECDH shared secret, then AES-KW wraps the CEK.

use aes_gcm::aead::{Aead, Payload};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use aes_kw::Kek;
use p256::ecdh::EphemeralSecret;
use p256::elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint};
use p256::{EncodedPoint, PublicKey, SecretKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::base64url::{base64url_decode, base64url_encode};
use crate::error::CryptoError;
use crate::types::{AES_GCM_IV_LENGTH, AES_GCM_TAG_LENGTH, AES_KEY_LENGTH};

/// Algorithm identifier for Concat KDF (RFC 7518 §4.6.2).
const ALG_ID: &str = "ECDH-ES+A256KW";
const ENC_ID: &str = "A256GCM";
/// AES-KW output for 32-byte key: 32 + 8 = 40 bytes.
const AES_KW_OUTPUT_LENGTH: usize = 40;

/// Encrypt plaintext to a P-256 public key as a compact JWE.
///
/// Returns `header.encrypted_key.iv.ciphertext.tag`, each part base64url.
pub fn encrypt_jwe(plaintext: &[u8], recipient: &PublicKey) -> Result<String, CryptoError> {
    let ephemeral_secret = EphemeralSecret::random(&mut p256::elliptic_curve::rand_core::OsRng);
    let ephemeral_point = PublicKey::from(&ephemeral_secret).to_encoded_point(false);

    let shared_secret = ephemeral_secret.diffie_hellman(recipient);
    let mut kek_bytes = concat_kdf(shared_secret.raw_secret_bytes().as_slice(), ALG_ID, 256);

    let mut cek = [0u8; AES_KEY_LENGTH];
    getrandom::getrandom(&mut cek).map_err(|e| CryptoError::RngFailed(e.to_string()))?;

    let kek = Kek::from(kek_bytes);
    kek_bytes.zeroize();

    let mut wrapped_cek = [0u8; AES_KW_OUTPUT_LENGTH];
    kek.wrap(&cek, &mut wrapped_cek)
        .map_err(|e| CryptoError::EncryptionFailed(format!("AES-KW wrap failed: {:?}", e)))?;

    let header = serde_json::json!({
        "alg": ALG_ID,
        "enc": ENC_ID,
        "epk": encode_point_as_jwk(&ephemeral_point)?,
    });
    // AAD for AES-GCM is the base64url-encoded header (RFC 7516 §5.1 step 14)
    let header_json = serde_json::to_string(&header)
        .map_err(|e| CryptoError::EncryptionFailed(format!("header serialization: {}", e)))?;
    let header_b64 = base64url_encode(header_json.as_bytes());

    let mut iv = [0u8; AES_GCM_IV_LENGTH];
    getrandom::getrandom(&mut iv).map_err(|e| CryptoError::RngFailed(e.to_string()))?;

    let cipher = Aes256Gcm::new_from_slice(&cek)
        .map_err(|e| CryptoError::EncryptionFailed(format!("AES-GCM init: {:?}", e)))?;
    cek.zeroize();

    let ciphertext_with_tag = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext,
                aad: header_b64.as_bytes(),
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed(format!("AES-GCM encrypt: {:?}", e)))?;

    let tag_offset = ciphertext_with_tag.len() - AES_GCM_TAG_LENGTH;
    Ok(format!(
        "{}.{}.{}.{}.{}",
        header_b64,
        base64url_encode(&wrapped_cek),
        base64url_encode(&iv),
        base64url_encode(&ciphertext_with_tag[..tag_offset]),
        base64url_encode(&ciphertext_with_tag[tag_offset..])
    ))
}

/// Split a compact JWE into its five parts, checking shape only.
///
/// Every part must use the base64url alphabet and all but the ciphertext
/// must be non-empty. Nothing is decoded, so a corrupted part surfaces when
/// the JWE is decrypted.
pub fn split_compact_jwe(jwe: &str) -> Result<[&str; 5], CryptoError> {
    let parts: Vec<&str> = jwe.split('.').collect();
    let parts: [&str; 5] = parts
        .try_into()
        .map_err(|p: Vec<&str>| CryptoError::JweFormat(format!("expected 5 parts, got {}", p.len())))?;

    for (index, part) in parts.iter().enumerate() {
        // Part 3 is empty for an empty plaintext
        if part.is_empty() && index != 3 {
            return Err(CryptoError::JweFormat(format!("part {} is empty", index)));
        }
        if !part
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(CryptoError::JweFormat(format!(
                "part {} is not base64url",
                index
            )));
        }
    }
    Ok(parts)
}

/// Split a compact JWE and check its header, without touching any key.
///
/// Returns the five parts on success.
pub fn parse_compact_jwe(jwe: &str) -> Result<[&str; 5], CryptoError> {
    let parts = split_compact_jwe(jwe)?;

    let header_bytes = base64url_decode(parts[0])?;
    let header: serde_json::Value = serde_json::from_slice(&header_bytes)
        .map_err(|e| CryptoError::JweFormat(format!("header: {}", e)))?;

    let alg = header["alg"]
        .as_str()
        .ok_or_else(|| CryptoError::JweFormat("missing alg in header".to_string()))?;
    let enc = header["enc"]
        .as_str()
        .ok_or_else(|| CryptoError::JweFormat("missing enc in header".to_string()))?;
    if alg != ALG_ID {
        return Err(CryptoError::JweUnsupportedAlgorithm(format!(
            "alg: expected {}, got {}",
            ALG_ID, alg
        )));
    }
    if enc != ENC_ID {
        return Err(CryptoError::JweUnsupportedAlgorithm(format!(
            "enc: expected {}, got {}",
            ENC_ID, enc
        )));
    }
    if header.get("epk").is_none() {
        return Err(CryptoError::JweFormat("missing epk in header".to_string()));
    }

    Ok(parts)
}

/// Decrypt a compact JWE with the recipient's P-256 secret key.
pub fn decrypt_jwe(jwe: &str, recipient: &SecretKey) -> Result<Vec<u8>, CryptoError> {
    let [header_b64, encrypted_key_b64, iv_b64, ciphertext_b64, tag_b64] =
        parse_compact_jwe(jwe)?;

    let header_bytes = base64url_decode(header_b64)?;
    let header: serde_json::Value = serde_json::from_slice(&header_bytes)
        .map_err(|e| CryptoError::JweFormat(format!("header: {}", e)))?;
    let sender_public_key = import_p256_public_jwk(&header["epk"])?;

    let shared_secret = p256::ecdh::diffie_hellman(
        recipient.to_nonzero_scalar(),
        sender_public_key.as_affine(),
    );
    let mut kek_bytes = concat_kdf(shared_secret.raw_secret_bytes().as_slice(), ALG_ID, 256);
    let kek = Kek::from(kek_bytes);
    kek_bytes.zeroize();

    let encrypted_key = base64url_decode(encrypted_key_b64)?;
    if encrypted_key.len() != AES_KW_OUTPUT_LENGTH {
        return Err(CryptoError::JweFormat(format!(
            "encrypted key: expected {} bytes, got {}",
            AES_KW_OUTPUT_LENGTH,
            encrypted_key.len()
        )));
    }
    let mut cek = [0u8; AES_KEY_LENGTH];
    kek.unwrap(&encrypted_key, &mut cek)
        .map_err(|e| CryptoError::DecryptionFailed(format!("AES-KW unwrap failed: {:?}", e)))?;

    let iv = base64url_decode(iv_b64)?;
    if iv.len() != AES_GCM_IV_LENGTH {
        return Err(CryptoError::JweFormat(format!(
            "iv: expected {} bytes, got {}",
            AES_GCM_IV_LENGTH,
            iv.len()
        )));
    }
    let mut ct_with_tag = base64url_decode(ciphertext_b64)?;
    let tag = base64url_decode(tag_b64)?;
    if tag.len() != AES_GCM_TAG_LENGTH {
        return Err(CryptoError::JweFormat(format!(
            "tag: expected {} bytes, got {}",
            AES_GCM_TAG_LENGTH,
            tag.len()
        )));
    }
    ct_with_tag.extend_from_slice(&tag);

    let cipher = Aes256Gcm::new_from_slice(&cek)
        .map_err(|e| CryptoError::DecryptionFailed(format!("AES-GCM init: {:?}", e)))?;
    cek.zeroize();

    cipher
        .decrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: &ct_with_tag,
                aad: header_b64.as_bytes(),
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed(format!("AES-GCM decrypt: {:?}", e)))
}

/// Concat KDF (NIST SP 800-56A, single-pass for <=256 bits).
///
///   SHA-256(00000001 || Z || algID || partyUInfo || partyVInfo || suppPubInfo)
fn concat_kdf(z: &[u8], alg: &str, key_data_len_bits: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(1u32.to_be_bytes());
    hasher.update(z);
    hasher.update((alg.len() as u32).to_be_bytes());
    hasher.update(alg.as_bytes());
    // PartyUInfo and PartyVInfo are empty
    hasher.update(0u32.to_be_bytes());
    hasher.update(0u32.to_be_bytes());
    hasher.update(key_data_len_bits.to_be_bytes());
    hasher.finalize().into()
}

/// Import a P-256 public key from a JWK JSON value.
fn import_p256_public_jwk(jwk: &serde_json::Value) -> Result<PublicKey, CryptoError> {
    let x_b64 = jwk["x"]
        .as_str()
        .ok_or_else(|| CryptoError::JweFormat("epk missing x coordinate".to_string()))?;
    let y_b64 = jwk["y"]
        .as_str()
        .ok_or_else(|| CryptoError::JweFormat("epk missing y coordinate".to_string()))?;

    let x_bytes = base64url_decode(x_b64)?;
    let y_bytes = base64url_decode(y_b64)?;
    if x_bytes.len() > 32 || y_bytes.len() > 32 {
        return Err(CryptoError::JweFormat("epk coordinate too long".to_string()));
    }

    // Left-pad coordinates to 32 bytes; JWKs may omit leading zeros
    let mut uncompressed = Vec::with_capacity(65);
    uncompressed.push(0x04);
    uncompressed.extend(std::iter::repeat_n(0u8, 32 - x_bytes.len()));
    uncompressed.extend_from_slice(&x_bytes);
    uncompressed.extend(std::iter::repeat_n(0u8, 32 - y_bytes.len()));
    uncompressed.extend_from_slice(&y_bytes);

    let point = EncodedPoint::from_bytes(&uncompressed)
        .map_err(|e| CryptoError::JweFormat(format!("invalid EC point: {}", e)))?;

    PublicKey::from_encoded_point(&point)
        .into_option()
        .ok_or_else(|| CryptoError::JweFormat("epk not on P-256 curve".to_string()))
}

/// Encode an uncompressed EC point as a JWK JSON value.
fn encode_point_as_jwk(point: &EncodedPoint) -> Result<serde_json::Value, CryptoError> {
    let (x, y) = match (point.x(), point.y()) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            return Err(CryptoError::EncryptionFailed(
                "ephemeral point is not uncompressed".to_string(),
            ))
        }
    };

    Ok(serde_json::json!({
        "kty": "EC",
        "crv": "P-256",
        "x": base64url_encode(x.as_slice()),
        "y": base64url_encode(y.as_slice())
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypair::generate_p256_secret;

    #[test]
    fn encrypt_decrypt_round_trip() {
        let secret = generate_p256_secret();
        let jwe = encrypt_jwe(b"hello world", &secret.public_key()).unwrap();
        assert_eq!(decrypt_jwe(&jwe, &secret).unwrap(), b"hello world");
    }

    #[test]
    fn compact_jwe_has_5_parts() {
        let secret = generate_p256_secret();
        let jwe = encrypt_jwe(b"test", &secret.public_key()).unwrap();
        assert_eq!(jwe.split('.').count(), 5);
    }

    #[test]
    fn header_has_correct_algorithms() {
        let secret = generate_p256_secret();
        let jwe = encrypt_jwe(b"test", &secret.public_key()).unwrap();

        let header_b64 = jwe.split('.').next().unwrap();
        let header: serde_json::Value =
            serde_json::from_slice(&base64url_decode(header_b64).unwrap()).unwrap();

        assert_eq!(header["alg"], "ECDH-ES+A256KW");
        assert_eq!(header["enc"], "A256GCM");
        assert_eq!(header["epk"]["crv"], "P-256");
    }

    #[test]
    fn wrong_key_fails() {
        let secret = generate_p256_secret();
        let other = generate_p256_secret();
        let jwe = encrypt_jwe(b"secret", &secret.public_key()).unwrap();
        assert!(matches!(
            decrypt_jwe(&jwe, &other),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn binary_payload_round_trips() {
        let secret = generate_p256_secret();
        let mut binary = [0u8; 256];
        getrandom::getrandom(&mut binary).unwrap();
        let jwe = encrypt_jwe(&binary, &secret.public_key()).unwrap();
        assert_eq!(decrypt_jwe(&jwe, &secret).unwrap(), binary);
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let secret = generate_p256_secret();
        let jwe = encrypt_jwe(b"", &secret.public_key()).unwrap();
        assert!(decrypt_jwe(&jwe, &secret).unwrap().is_empty());
    }

    #[test]
    fn rejects_invalid_jwe_format() {
        let secret = generate_p256_secret();
        assert!(decrypt_jwe("not-a-jwe", &secret).is_err());
        assert!(decrypt_jwe("a.b.c", &secret).is_err());
        assert!(decrypt_jwe("a.b.c.d.e.f", &secret).is_err());
    }

    #[test]
    fn split_checks_shape_only() {
        let secret = generate_p256_secret();
        let jwe = encrypt_jwe(b"", &secret.public_key()).unwrap();
        assert!(split_compact_jwe(&jwe).is_ok());

        // A header that is valid base64url but not JSON still has the right shape
        assert!(split_compact_jwe("AAAA.AA.AA.AA.AA").is_ok());
        assert!(parse_compact_jwe("AAAA.AA.AA.AA.AA").is_err());

        assert!(split_compact_jwe(".AA.AA.AA.AA").is_err());
        assert!(split_compact_jwe("AA.AA.A+.AA.AA").is_err());
        assert!(split_compact_jwe("AA.AA.AA.AA").is_err());
    }

    #[test]
    fn rejects_foreign_algorithm() {
        let header = base64url_encode(br#"{"alg":"RSA-OAEP","enc":"A256GCM","epk":{}}"#);
        let jwe = format!("{}.AA.AA.AA.AA", header);
        assert!(matches!(
            parse_compact_jwe(&jwe),
            Err(CryptoError::JweUnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let secret = generate_p256_secret();
        let jwe = encrypt_jwe(b"secret", &secret.public_key()).unwrap();

        let parts: Vec<&str> = jwe.split('.').collect();
        let mut ct_bytes = base64url_decode(parts[3]).unwrap();
        ct_bytes[0] ^= 0xff;
        let tampered = format!(
            "{}.{}.{}.{}.{}",
            parts[0],
            parts[1],
            parts[2],
            base64url_encode(&ct_bytes),
            parts[4]
        );

        assert!(matches!(
            decrypt_jwe(&tampered, &secret),
            Err(CryptoError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn rejects_tampered_tag() {
        let secret = generate_p256_secret();
        let jwe = encrypt_jwe(b"secret", &secret.public_key()).unwrap();
        let parts: Vec<&str> = jwe.split('.').collect();
        let mut tag = base64url_decode(parts[4]).unwrap();
        tag[15] ^= 0x01;
        let tampered = format!(
            "{}.{}.{}.{}.{}",
            parts[0],
            parts[1],
            parts[2],
            parts[3],
            base64url_encode(&tag)
        );
        assert!(decrypt_jwe(&tampered, &secret).is_err());
    }

    #[test]
    fn concat_kdf_is_deterministic() {
        let z = [42u8; 32];
        assert_eq!(concat_kdf(&z, "A256KW", 256), concat_kdf(&z, "A256KW", 256));
        assert_ne!(concat_kdf(&z, "A256KW", 256), concat_kdf(&z, ALG_ID, 256));
    }
}
