//! Round arithmetic.
//!
//! drand publishes round `r` at `genesis + (r - 1) * period`, so the first
//! round published at or after instant `t` is
//!
//!   round(t) = ceil((t - genesis) / period) + 1, clamped to >= 1
//!
//! Everything here is pure: no clock reads, no network.

use chrono::{DateTime, TimeZone, Utc};

use crate::chain::ChainParameters;

fn genesis_ms(params: &ChainParameters) -> i128 {
    params.genesis_time() as i128 * 1000
}

fn period_ms(params: &ChainParameters) -> i128 {
    params.period() as i128 * 1000
}

fn clamp_round(round: i128) -> u64 {
    round.clamp(1, u64::MAX as i128) as u64
}

/// First round published at or after `instant`.
pub fn round_at(instant: DateTime<Utc>, params: &ChainParameters) -> u64 {
    let delta = instant.timestamp_millis() as i128 - genesis_ms(params);
    if delta <= 0 {
        return 1;
    }
    let period = period_ms(params);
    clamp_round((delta + period - 1) / period + 1)
}

/// Latest round already published at `now`, or 0 before genesis.
pub fn current_round(now: DateTime<Utc>, params: &ChainParameters) -> u64 {
    let delta = now.timestamp_millis() as i128 - genesis_ms(params);
    if delta < 0 {
        return 0;
    }
    clamp_round(delta / period_ms(params) + 1)
}

/// Instant at which `round` is published. Round 0 maps to genesis.
pub fn round_instant(round: u64, params: &ChainParameters) -> DateTime<Utc> {
    let offset_ms = round.saturating_sub(1) as i128 * period_ms(params);
    let at_ms = genesis_ms(params) + offset_ms;
    i64::try_from(at_ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainConfig;
    use chrono::Duration;
    use proptest::prelude::*;

    fn chain(genesis: u64, period: u64) -> ChainParameters {
        let mut config = ChainConfig::quicknet();
        config.genesis_time = Some(genesis);
        config.period = Some(period);
        ChainParameters::from_config(&config).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn genesis_is_round_one() {
        let params = chain(1000, 3);
        assert_eq!(round_at(at(1000), &params), 1);
        assert_eq!(current_round(at(1000), &params), 1);
    }

    #[test]
    fn before_genesis_clamps_to_one() {
        let params = chain(1000, 3);
        assert_eq!(round_at(at(0), &params), 1);
        assert_eq!(current_round(at(999), &params), 0);
    }

    #[test]
    fn exact_boundary() {
        let params = chain(1000, 3);
        // t = genesis + 3 periods: round 4 is published exactly then
        assert_eq!(round_at(at(1009), &params), 4);
        assert_eq!(round_instant(4, &params), at(1009));
    }

    #[test]
    fn between_boundaries_rounds_up() {
        let params = chain(1000, 3);
        let t = at(1009) + Duration::milliseconds(1);
        assert_eq!(round_at(t, &params), 5);
        assert_eq!(current_round(t, &params), 4);
    }

    #[test]
    fn quicknet_reference_round() {
        let params = ChainParameters::from_config(&ChainConfig::quicknet()).unwrap();
        // 2024-01-01T00:00:00Z is 11_263_833 seconds (3_754_611 periods) after genesis
        let t = at(1704067200);
        assert_eq!(round_at(t, &params), 3754612);
    }

    #[test]
    fn ten_and_thirty_seconds_are_ordered() {
        let params = chain(1000, 3);
        let now = at(5000);
        let r10 = round_at(now + Duration::seconds(10), &params);
        let r30 = round_at(now + Duration::seconds(30), &params);
        assert!(r30 > r10);
    }

    #[test]
    fn round_instant_of_round_zero_is_genesis() {
        let params = chain(1000, 3);
        assert_eq!(round_instant(0, &params), at(1000));
    }

    #[test]
    fn round_instant_saturates() {
        let params = chain(1000, 3);
        assert_eq!(round_instant(u64::MAX, &params), DateTime::<Utc>::MAX_UTC);
    }

    proptest! {
        #[test]
        fn round_is_deterministic(offset in 0i64..10_000_000_000) {
            let params = chain(1_692_803_367, 3);
            let t = at(1_692_803_367) + Duration::milliseconds(offset);
            prop_assert_eq!(round_at(t, &params), round_at(t, &params));
        }

        #[test]
        fn round_is_monotonic(a in 0i64..10_000_000_000, b in 0i64..10_000_000_000, period in 1u64..60) {
            let params = chain(1_692_803_367, period);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let t1 = at(1_692_803_367) + Duration::milliseconds(lo);
            let t2 = at(1_692_803_367) + Duration::milliseconds(hi);
            prop_assert!(round_at(t1, &params) <= round_at(t2, &params));
            if hi - lo >= period as i64 * 1000 {
                prop_assert!(round_at(t1, &params) < round_at(t2, &params));
            }
        }

        #[test]
        fn chosen_round_is_published_at_or_after_instant(offset in 0i64..10_000_000_000, period in 1u64..60) {
            let params = chain(1_692_803_367, period);
            let t = at(1_692_803_367) + Duration::milliseconds(offset);
            let round = round_at(t, &params);
            let published = round_instant(round, &params);
            prop_assert!(published >= t);
            prop_assert!(published - t < Duration::seconds(period as i64));
            prop_assert_eq!(current_round(published, &params), round);
        }
    }
}
