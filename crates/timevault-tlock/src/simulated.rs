//! In-process beacon for tests and demos.
//!
//! Each round has a key derived from a secret seed. A round's key is only
//! handed out once the round is released, either explicitly or by the wall
//! clock passing its publication instant. Blob layout:
//!
//! ```text
//! [round: u64 BE][IV: 12][ciphertext + tag]
//! ```
//!
//! The round header is bound as AAD, so a blob relabelled to another round
//! fails authentication.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use timevault_crypto::{
    aes_gcm_decrypt, aes_gcm_encrypt, base64url_decode, base64url_encode, hkdf_derive,
    CryptoError, AES_KEY_LENGTH,
};

use crate::chain::ChainParameters;
use crate::error::OracleError;
use crate::oracle::TimeLockOracle;
use crate::round::current_round;

const ROUND_HEADER_LENGTH: usize = 8;
const ROUND_KEY_SALT: &[u8] = b"timevault-simulated-beacon";

struct BeaconState {
    /// Highest round released by hand. Rounds up to the clock's current
    /// round are always released as well.
    released: u64,
    follow_clock: bool,
}

/// A beacon whose rounds are released by the caller or by the wall clock.
pub struct SimulatedBeacon {
    chain: Arc<ChainParameters>,
    seed: [u8; AES_KEY_LENGTH],
    state: RwLock<BeaconState>,
}

impl SimulatedBeacon {
    /// Beacon with a random seed that follows the wall clock.
    pub fn new(chain: Arc<ChainParameters>) -> Result<Self, OracleError> {
        let mut seed = [0u8; AES_KEY_LENGTH];
        getrandom::getrandom(&mut seed).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
        Ok(Self::with_seed(chain, seed))
    }

    /// Deterministic beacon that follows the wall clock.
    pub fn with_seed(chain: Arc<ChainParameters>, seed: [u8; AES_KEY_LENGTH]) -> Self {
        Self {
            chain,
            seed,
            state: RwLock::new(BeaconState {
                released: 0,
                follow_clock: true,
            }),
        }
    }

    /// Beacon that only releases rounds by hand, ignoring the clock.
    pub fn manual(chain: Arc<ChainParameters>, seed: [u8; AES_KEY_LENGTH]) -> Self {
        let beacon = Self::with_seed(chain, seed);
        beacon.state.write().follow_clock = false;
        beacon
    }

    /// Release every round up to and including `round`.
    pub fn release_round(&self, round: u64) {
        let mut state = self.state.write();
        if round > state.released {
            state.released = round;
            debug!(round, "released rounds");
        }
    }

    /// Release every round published at or before `instant`.
    pub fn release_until(&self, instant: DateTime<Utc>) {
        self.release_round(current_round(instant, &self.chain));
    }

    /// Highest round whose key is currently obtainable.
    pub fn latest_round(&self) -> u64 {
        let state = self.state.read();
        if state.follow_clock {
            state.released.max(current_round(Utc::now(), &self.chain))
        } else {
            state.released
        }
    }

    fn round_key(&self, round: u64) -> Result<[u8; AES_KEY_LENGTH], OracleError> {
        Ok(hkdf_derive(&self.seed, ROUND_KEY_SALT, &round.to_be_bytes())?)
    }
}

#[async_trait]
impl TimeLockOracle for SimulatedBeacon {
    fn chain(&self) -> &ChainParameters {
        &self.chain
    }

    async fn time_lock_encrypt(&self, bytes: &[u8], round: u64) -> Result<String, OracleError> {
        if round == 0 {
            return Err(OracleError::InvalidRound(round));
        }
        let key = self.round_key(round)?;
        let header = round.to_be_bytes();
        let sealed = aes_gcm_encrypt(&key, bytes, &header)?;

        let mut blob = Vec::with_capacity(ROUND_HEADER_LENGTH + sealed.len());
        blob.extend_from_slice(&header);
        blob.extend_from_slice(&sealed);
        Ok(base64url_encode(&blob))
    }

    async fn time_lock_decrypt(&self, blob: &str, round: u64) -> Result<Vec<u8>, OracleError> {
        if round == 0 {
            return Err(OracleError::InvalidRound(round));
        }
        let raw = base64url_decode(blob).map_err(|e| OracleError::Malformed(e.to_string()))?;
        if raw.len() < ROUND_HEADER_LENGTH {
            return Err(OracleError::Malformed("blob shorter than header".to_string()));
        }
        let (header, sealed) = raw.split_at(ROUND_HEADER_LENGTH);

        if round > self.latest_round() {
            return Err(OracleError::NotYetAvailable {
                round,
                available_at: self.round_available_at(round),
            });
        }

        // The requested round's key opens only blobs sealed under that round
        let key = self.round_key(round)?;
        aes_gcm_decrypt(&key, sealed, header)
            .map_err(|_| OracleError::Verification(format!("blob does not open at round {}", round)))
    }
}
