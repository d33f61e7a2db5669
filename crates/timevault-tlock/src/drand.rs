//! drand-backed time-lock oracle.
//!
//! Encryption is local (tlock over the configured chain public key).
//! Decryption fetches the round signature from the beacon's HTTP API.
//! The HTTP client and the chain-info check are created lazily on first use
//! and cached for the life of the oracle; they hold no secrets.
//!
//! `drand_core`'s client does blocking HTTP, so every request runs on the
//! blocking pool.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use drand_core::beacon::BeaconError;
use drand_core::{DrandError, HttpClient};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use timevault_crypto::{base64url_decode, base64url_encode};

use crate::chain::{ChainConfig, ChainParameters};
use crate::error::OracleError;
use crate::oracle::TimeLockOracle;

/// Time-lock oracle talking to a drand beacon network.
pub struct DrandOracle {
    chain: Arc<ChainParameters>,
    client: OnceCell<Arc<HttpClient>>,
    chain_verified: OnceCell<()>,
}

impl DrandOracle {
    pub fn new(chain: Arc<ChainParameters>) -> Self {
        Self {
            chain,
            client: OnceCell::new(),
            chain_verified: OnceCell::new(),
        }
    }

    /// Shared chain parameters.
    pub fn chain_parameters(&self) -> &Arc<ChainParameters> {
        &self.chain
    }

    async fn client(&self) -> Result<Arc<HttpClient>, OracleError> {
        self.client
            .get_or_try_init(|| async { connect(&self.chain.chain_url()).map(Arc::new) })
            .await
            .map(Arc::clone)
    }

    /// Check once that the beacon serves the configured chain.
    async fn verify_chain(&self) -> Result<(), OracleError> {
        self.chain_verified
            .get_or_try_init(|| async {
                let client = self.client().await?;
                let info = on_blocking_pool(client, |c| c.chain_info())
                    .await?
                    .map_err(|e| OracleError::Network(format!("chain info: {}", e)))?;
                check_chain_info(
                    &self.chain,
                    info.hash().as_slice(),
                    info.public_key().as_slice(),
                    info.genesis_time(),
                    info.period(),
                )
            })
            .await
            .map(|_| ())
    }
}

fn connect(url: &str) -> Result<HttpClient, OracleError> {
    debug!(%url, "constructing drand client");
    HttpClient::try_from(url)
        .map_err(|e| OracleError::Network(format!("drand client for {}: {}", url, e)))
}

/// Run a client request on the blocking pool.
async fn on_blocking_pool<T, F>(
    client: Arc<HttpClient>,
    request: F,
) -> Result<Result<T, DrandError>, OracleError>
where
    T: Send + 'static,
    F: FnOnce(&HttpClient) -> Result<T, DrandError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || request(&client))
        .await
        .map_err(|e| OracleError::Network(format!("beacon request task: {}", e)))
}

/// Map a failed round fetch to an oracle error.
///
/// The beacon answers 404 for rounds it has not produced. Within one period
/// after the scheduled publication that means the local clock is ahead of
/// the beacon, so the round is reported as not yet available. Every other
/// failure is a network error.
fn classify_fetch_error(
    error: DrandError,
    round: u64,
    available_at: DateTime<Utc>,
    now: DateTime<Utc>,
    period: u64,
) -> OracleError {
    let not_found = matches!(&error, DrandError::Beacon(e) if matches!(**e, BeaconError::NotFound));
    let grace = Duration::seconds(i64::try_from(period).unwrap_or(i64::MAX));
    if not_found && now < available_at + grace {
        debug!(round, "beacon has not caught up with round yet");
        return OracleError::NotYetAvailable {
            round,
            available_at,
        };
    }
    warn!(round, error = %error, "failed to fetch beacon signature");
    OracleError::Network(format!("round {}: {}", round, error))
}

fn check_chain_info(
    chain: &ChainParameters,
    hash: &[u8],
    public_key: &[u8],
    genesis_time: u64,
    period: u64,
) -> Result<(), OracleError> {
    if hash != chain.chain_hash().as_slice() {
        return Err(OracleError::ChainMismatch(format!(
            "beacon serves chain {}, expected {}",
            hex::encode(hash),
            chain.chain_hash_hex()
        )));
    }
    if public_key != chain.public_key() {
        return Err(OracleError::ChainMismatch(
            "beacon public key differs from configuration".to_string(),
        ));
    }
    if genesis_time != chain.genesis_time() || period != chain.period() {
        return Err(OracleError::ChainMismatch(format!(
            "beacon timing genesis={} period={} differs from genesis={} period={}",
            genesis_time,
            period,
            chain.genesis_time(),
            chain.period()
        )));
    }
    Ok(())
}

/// Build `ChainParameters` from configuration, asking the beacon for genesis
/// time and period when the configuration leaves them out.
///
/// The beacon's chain hash and public key must match the configured ones;
/// configuration is the trust anchor, the beacon only fills gaps.
pub async fn fetch_chain_parameters(config: &ChainConfig) -> Result<ChainParameters, OracleError> {
    if config.has_timing() {
        return Ok(ChainParameters::from_config(config)?);
    }

    // Validate what we have before touching the network
    let provisional = ChainParameters::from_config_with_timing(
        config,
        config.genesis_time.unwrap_or(0),
        config.period.unwrap_or(1),
    )?;
    let client = Arc::new(connect(&provisional.chain_url())?);
    let info = on_blocking_pool(client, |c| c.chain_info())
        .await?
        .map_err(|e| OracleError::Network(format!("chain info: {}", e)))?;

    let params =
        ChainParameters::from_config_with_timing(config, info.genesis_time(), info.period())?;
    check_chain_info(
        &params,
        info.hash().as_slice(),
        info.public_key().as_slice(),
        info.genesis_time(),
        info.period(),
    )?;
    debug!(
        genesis_time = params.genesis_time(),
        period = params.period(),
        "resolved chain timing from beacon"
    );
    Ok(params)
}

#[async_trait]
impl TimeLockOracle for DrandOracle {
    fn chain(&self) -> &ChainParameters {
        &self.chain
    }

    async fn time_lock_encrypt(&self, bytes: &[u8], round: u64) -> Result<String, OracleError> {
        if round == 0 {
            return Err(OracleError::InvalidRound(round));
        }
        let mut locked = Vec::new();
        tlock_age::encrypt(
            &mut locked,
            bytes,
            self.chain.chain_hash().as_slice(),
            self.chain.public_key(),
            round,
        )
        .map_err(|e| OracleError::Encryption(e.to_string()))?;
        debug!(round, len = locked.len(), "time-locked blob");
        Ok(base64url_encode(&locked))
    }

    async fn time_lock_decrypt(&self, blob: &str, round: u64) -> Result<Vec<u8>, OracleError> {
        if round == 0 {
            return Err(OracleError::InvalidRound(round));
        }
        let locked = base64url_decode(blob).map_err(|e| OracleError::Malformed(e.to_string()))?;

        let available_at = self.round_available_at(round);
        let now = Utc::now();
        if now < available_at {
            debug!(round, %available_at, "round not yet published");
            return Err(OracleError::NotYetAvailable {
                round,
                available_at,
            });
        }

        self.verify_chain().await?;
        let client = self.client().await?;
        let beacon = on_blocking_pool(client, move |c| c.get(round))
            .await?
            .map_err(|e| classify_fetch_error(e, round, available_at, now, self.chain.period()))?;

        let mut plaintext = Vec::new();
        tlock_age::decrypt(
            &mut plaintext,
            locked.as_slice(),
            self.chain.chain_hash().as_slice(),
            &beacon.signature(),
        )
        .map_err(|e| OracleError::Verification(e.to_string()))?;
        Ok(plaintext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::quicknet;

    fn quicknet_oracle() -> DrandOracle {
        let params = ChainParameters::from_config(&ChainConfig::quicknet()).unwrap();
        DrandOracle::new(Arc::new(params))
    }

    #[test]
    fn chain_info_check_accepts_matching_chain() {
        let oracle = quicknet_oracle();
        let chain = oracle.chain_parameters();
        let hash = hex::decode(quicknet::CHAIN_HASH).unwrap();
        let pk = hex::decode(quicknet::PUBLIC_KEY).unwrap();
        assert!(
            check_chain_info(chain, &hash, &pk, quicknet::GENESIS_TIME, quicknet::PERIOD).is_ok()
        );
    }

    #[test]
    fn chain_info_check_rejects_other_hash() {
        let oracle = quicknet_oracle();
        let pk = hex::decode(quicknet::PUBLIC_KEY).unwrap();
        let err = check_chain_info(
            oracle.chain_parameters(),
            &[0u8; 32],
            &pk,
            quicknet::GENESIS_TIME,
            quicknet::PERIOD,
        )
        .unwrap_err();
        assert!(matches!(err, OracleError::ChainMismatch(_)));
    }

    #[test]
    fn chain_info_check_rejects_other_period() {
        let oracle = quicknet_oracle();
        let hash = hex::decode(quicknet::CHAIN_HASH).unwrap();
        let pk = hex::decode(quicknet::PUBLIC_KEY).unwrap();
        let err = check_chain_info(
            oracle.chain_parameters(),
            &hash,
            &pk,
            quicknet::GENESIS_TIME,
            30,
        );
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn future_round_is_not_yet_available_without_network() {
        let oracle = quicknet_oracle();
        let far_future = oracle.round_for_instant(Utc::now() + Duration::days(365));
        let blob = oracle.time_lock_encrypt(b"key material", far_future).await.unwrap();

        let err = oracle.time_lock_decrypt(&blob, far_future).await.unwrap_err();
        assert!(err.is_not_yet_available());
        // Nothing was fetched, so no client was built
        assert!(oracle.client.get().is_none());
    }

    #[tokio::test]
    async fn rejects_round_zero() {
        let oracle = quicknet_oracle();
        assert!(matches!(
            oracle.time_lock_encrypt(b"x", 0).await,
            Err(OracleError::InvalidRound(0))
        ));
    }

    #[tokio::test]
    async fn rejects_non_base64_blob() {
        let oracle = quicknet_oracle();
        let err = oracle.time_lock_decrypt("not base64!", 1).await.unwrap_err();
        assert!(matches!(err, OracleError::Malformed(_)));
    }

    fn not_found() -> DrandError {
        DrandError::Beacon(Box::new(BeaconError::NotFound))
    }

    #[test]
    fn missing_round_within_a_period_is_not_yet_available() {
        let available_at = Utc::now();
        let now = available_at + Duration::seconds(1);
        let err = classify_fetch_error(not_found(), 7, available_at, now, 3);
        assert!(err.is_not_yet_available());
    }

    #[test]
    fn missing_round_after_a_period_is_network() {
        let available_at = Utc::now();
        let now = available_at + Duration::seconds(3);
        let err = classify_fetch_error(not_found(), 7, available_at, now, 3);
        assert!(matches!(err, OracleError::Network(_)));
    }

    #[test]
    fn other_fetch_failures_are_network_even_inside_grace() {
        let available_at = Utc::now();
        let err = DrandError::Beacon(Box::new(BeaconError::Validation));
        let err = classify_fetch_error(err, 7, available_at, available_at, 3);
        assert!(matches!(err, OracleError::Network(_)));
    }

    // Port 9 (discard) on loopback refuses connections, so these exercise the
    // blocking request path without leaving the machine.
    fn unreachable_config() -> ChainConfig {
        let mut config = ChainConfig::quicknet();
        config.beacon_url = "http://127.0.0.1:9".to_string();
        config
    }

    #[tokio::test]
    async fn refused_connection_on_published_round_is_network() {
        let params = ChainParameters::from_config(&unreachable_config()).unwrap();
        let oracle = DrandOracle::new(Arc::new(params));
        // Just published, so inside the skew grace window
        let round = crate::round::current_round(Utc::now(), oracle.chain());
        let blob = oracle.time_lock_encrypt(b"x", round).await.unwrap();

        let err = oracle.time_lock_decrypt(&blob, round).await.unwrap_err();
        assert!(matches!(err, OracleError::Network(_)), "got {:?}", err);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn refused_connection_while_resolving_timing_is_network() {
        let mut config = unreachable_config();
        config.genesis_time = None;
        config.period = None;
        let err = fetch_chain_parameters(&config).await.unwrap_err();
        assert!(matches!(err, OracleError::Network(_)), "got {:?}", err);
    }

    #[tokio::test]
    #[ignore = "requires network access to api.drand.sh"]
    async fn decrypts_past_round_from_live_beacon() {
        let oracle = quicknet_oracle();
        let round = oracle.round_for_instant(Utc::now() - Duration::seconds(30));
        let blob = oracle.time_lock_encrypt(b"past", round).await.unwrap();
        assert_eq!(oracle.time_lock_decrypt(&blob, round).await.unwrap(), b"past");
    }

    #[tokio::test]
    #[ignore = "requires network access to api.drand.sh"]
    async fn resolves_timing_from_live_beacon() {
        let mut config = ChainConfig::quicknet();
        config.genesis_time = None;
        config.period = None;
        let params = fetch_chain_parameters(&config).await.unwrap();
        assert_eq!(params.period(), quicknet::PERIOD);
        assert_eq!(params.genesis_time(), quicknet::GENESIS_TIME);
    }
}
