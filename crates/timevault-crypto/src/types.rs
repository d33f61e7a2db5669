use zeroize::{Zeroize, ZeroizeOnDrop};

/// Magic prefix of a passphrase-protected private key blob.
pub const PROTECTED_KEY_MAGIC: &[u8; 4] = b"TVPK";

/// Wire format version for protected private keys.
///
/// Version 1: Argon2id-derived key, AES-256-GCM sealed P-256 scalar.
/// Format: [magic:4][version=1:1B][m_cost:4 BE][t_cost:4 BE][p_cost:4 BE][salt:16][IV:12][ct+tag]
pub const PROTECTED_KEY_VERSION: u8 = 1;

/// Supported protected key versions (for unlocking).
pub const SUPPORTED_PROTECTED_KEY_VERSIONS: &[u8] = &[1];

/// Argon2id salt length in bytes.
pub const SALT_LENGTH: usize = 16;

/// AES-GCM IV length in bytes (96 bits per NIST recommendation).
pub const AES_GCM_IV_LENGTH: usize = 12;

/// AES-GCM tag length in bytes (128 bits).
pub const AES_GCM_TAG_LENGTH: usize = 16;

/// AES key length in bytes (256 bits).
pub const AES_KEY_LENGTH: usize = 32;

/// P-256 scalar length in bytes.
pub const P256_SCALAR_LENGTH: usize = 32;

/// SEC1 uncompressed P-256 point length: 0x04 || x(32) || y(32).
pub const P256_UNCOMPRESSED_POINT_LENGTH: usize = 65;

/// Output of keypair generation: a public key safe to publish and a private
/// key that is useless without the passphrase it was sealed under.
#[derive(Debug, Clone)]
pub struct ProtectedKeypair {
    /// Base64url (unpadded) SEC1 uncompressed public point.
    pub public_key: String,
    /// Passphrase-sealed private scalar (see [`PROTECTED_KEY_VERSION`]).
    pub protected_private_key: Vec<u8>,
}

/// Argon2id cost parameters used when sealing a private key.
///
/// Costs travel inside the protected blob, so a key can always be unlocked
/// with the parameters it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassphraseParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Iterations.
    pub t_cost: u32,
    /// Lanes.
    pub p_cost: u32,
}

impl PassphraseParams {
    /// Upper bound on memory cost accepted when unlocking (1 GiB).
    pub const MAX_M_COST: u32 = 1024 * 1024;

    /// Upper bound on iterations accepted when unlocking.
    pub const MAX_T_COST: u32 = 64;

    /// Upper bound on lanes accepted when unlocking.
    pub const MAX_P_COST: u32 = 16;

    /// Cheap parameters for tests. Never use these for real data.
    pub const fn insecure_fast() -> Self {
        Self {
            m_cost: 1024,
            t_cost: 1,
            p_cost: 1,
        }
    }

    pub(crate) fn within_limits(&self) -> bool {
        self.m_cost <= Self::MAX_M_COST
            && self.t_cost <= Self::MAX_T_COST
            && self.p_cost <= Self::MAX_P_COST
    }
}

impl Default for PassphraseParams {
    /// OWASP recommendation for Argon2id: 19 MiB, 2 iterations, 1 lane.
    fn default() -> Self {
        Self {
            m_cost: 19 * 1024,
            t_cost: 2,
            p_cost: 1,
        }
    }
}

/// A passphrase-unlocked P-256 private key.
///
/// The scalar is wiped when the value is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct UnlockedPrivateKey {
    scalar: [u8; P256_SCALAR_LENGTH],
}

impl UnlockedPrivateKey {
    pub(crate) fn from_scalar(scalar: [u8; P256_SCALAR_LENGTH]) -> Self {
        Self { scalar }
    }

    pub(crate) fn scalar(&self) -> &[u8; P256_SCALAR_LENGTH] {
        &self.scalar
    }
}

impl std::fmt::Debug for UnlockedPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("UnlockedPrivateKey(..)")
    }
}
