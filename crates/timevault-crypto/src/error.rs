use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("Encrypted data too short")]
    DataTooShort,

    #[error("Passphrase must not be empty")]
    EmptyPassphrase,

    #[error("Wrong passphrase for protected private key")]
    WrongPassphrase,

    #[error("Invalid protected private key: {0}")]
    InvalidProtectedKey(String),

    #[error("Unsupported protected key version: {0}")]
    UnsupportedVersion(u8),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid JWE: {0}")]
    JweFormat(String),

    #[error("Unsupported JWE algorithm: {0}")]
    JweUnsupportedAlgorithm(String),

    #[error("Invalid base64url encoding: {0}")]
    Encoding(String),

    #[error("Random number generation failed: {0}")]
    RngFailed(String),
}
