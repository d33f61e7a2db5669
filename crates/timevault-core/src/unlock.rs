//! Unlock specifications: when a bundle should open.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};

use crate::error::UnlockSpecError;

const MINUTE_MS: u64 = 60_000;
const HOUR_MS: u64 = 60 * MINUTE_MS;
const DAY_MS: u64 = 24 * HOUR_MS;

/// Fixed offsets from "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationPreset {
    OneMinute,
    OneHour,
    OneDay,
    OneWeek,
    /// 30 days.
    OneMonth,
    /// 365 days.
    OneYear,
}

impl DurationPreset {
    pub const ALL: [DurationPreset; 6] = [
        DurationPreset::OneMinute,
        DurationPreset::OneHour,
        DurationPreset::OneDay,
        DurationPreset::OneWeek,
        DurationPreset::OneMonth,
        DurationPreset::OneYear,
    ];

    pub fn as_millis(self) -> u64 {
        match self {
            DurationPreset::OneMinute => MINUTE_MS,
            DurationPreset::OneHour => HOUR_MS,
            DurationPreset::OneDay => DAY_MS,
            DurationPreset::OneWeek => 7 * DAY_MS,
            DurationPreset::OneMonth => 30 * DAY_MS,
            DurationPreset::OneYear => 365 * DAY_MS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DurationPreset::OneMinute => "1min",
            DurationPreset::OneHour => "1hour",
            DurationPreset::OneDay => "1day",
            DurationPreset::OneWeek => "1week",
            DurationPreset::OneMonth => "1month",
            DurationPreset::OneYear => "1year",
        }
    }
}

impl FromStr for DurationPreset {
    type Err = UnlockSpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DurationPreset::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnlockSpecError::Unrecognized(s.to_string()))
    }
}

/// When a bundle unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockSpec {
    /// A preset offset from the moment of encryption.
    Preset(DurationPreset),
    /// A custom offset in milliseconds from the moment of encryption.
    AfterMillis(u64),
    /// An absolute instant. Past instants are allowed and unlock immediately.
    At(DateTime<Utc>),
}

impl UnlockSpec {
    /// Resolve to an absolute instant relative to `now`.
    ///
    /// Offsets too large for the calendar saturate to the latest
    /// representable instant.
    pub fn resolve(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let offset_ms = match self {
            UnlockSpec::At(instant) => return *instant,
            UnlockSpec::Preset(preset) => preset.as_millis(),
            UnlockSpec::AfterMillis(ms) => *ms,
        };
        i64::try_from(offset_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|offset| now.checked_add_signed(offset))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl From<DurationPreset> for UnlockSpec {
    fn from(preset: DurationPreset) -> Self {
        UnlockSpec::Preset(preset)
    }
}

impl From<DateTime<Utc>> for UnlockSpec {
    fn from(instant: DateTime<Utc>) -> Self {
        UnlockSpec::At(instant)
    }
}

impl FromStr for UnlockSpec {
    type Err = UnlockSpecError;

    /// Accepts `1min`, `1hour`, `1day`, `1week`, `1month`, `1year`,
    /// `custom:<ms>`, or an RFC 3339 instant.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(ms) = s.strip_prefix("custom:") {
            return ms
                .trim()
                .parse::<u64>()
                .map(UnlockSpec::AfterMillis)
                .map_err(|_| UnlockSpecError::InvalidCustom(ms.to_string()));
        }
        if let Ok(preset) = s.parse::<DurationPreset>() {
            return Ok(UnlockSpec::Preset(preset));
        }
        DateTime::parse_from_rfc3339(s)
            .map(|dt| UnlockSpec::At(dt.with_timezone(&Utc)))
            .map_err(|_| UnlockSpecError::Unrecognized(s.to_string()))
    }
}

impl fmt::Display for UnlockSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnlockSpec::Preset(preset) => f.write_str(preset.as_str()),
            UnlockSpec::AfterMillis(ms) => write!(f, "custom:{}", ms),
            UnlockSpec::At(instant) => f.write_str(&instant.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn preset_durations() {
        assert_eq!(DurationPreset::OneMinute.as_millis(), 60_000);
        assert_eq!(DurationPreset::OneHour.as_millis(), 3_600_000);
        assert_eq!(DurationPreset::OneDay.as_millis(), 86_400_000);
        assert_eq!(DurationPreset::OneWeek.as_millis(), 604_800_000);
        assert_eq!(DurationPreset::OneMonth.as_millis(), 2_592_000_000);
        assert_eq!(DurationPreset::OneYear.as_millis(), 31_536_000_000);
    }

    #[test]
    fn preset_names_parse() {
        for preset in DurationPreset::ALL {
            assert_eq!(preset.as_str().parse::<DurationPreset>().unwrap(), preset);
        }
        assert!("2min".parse::<DurationPreset>().is_err());
    }

    #[test]
    fn resolves_presets_from_now() {
        let spec = UnlockSpec::Preset(DurationPreset::OneMinute);
        assert_eq!(spec.resolve(now()), now() + Duration::seconds(60));
        let spec = UnlockSpec::Preset(DurationPreset::OneYear);
        assert_eq!(spec.resolve(now()), now() + Duration::days(365));
    }

    #[test]
    fn resolves_custom_millis() {
        let spec: UnlockSpec = "custom:10000".parse().unwrap();
        assert_eq!(spec, UnlockSpec::AfterMillis(10_000));
        assert_eq!(spec.resolve(now()), now() + Duration::seconds(10));
    }

    #[test]
    fn explicit_instant_ignores_now() {
        let at = Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap();
        let spec: UnlockSpec = "2030-06-01T12:00:00Z".parse().unwrap();
        assert_eq!(spec, UnlockSpec::At(at));
        assert_eq!(spec.resolve(now()), at);
    }

    #[test]
    fn explicit_instant_with_offset_normalizes_to_utc() {
        let spec: UnlockSpec = "2030-06-01T14:00:00+02:00".parse().unwrap();
        assert_eq!(
            spec.resolve(now()),
            Utc.with_ymd_and_hms(2030, 6, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn past_instant_is_allowed() {
        let past = now() - Duration::days(1);
        assert_eq!(UnlockSpec::At(past).resolve(now()), past);
    }

    #[test]
    fn huge_offset_saturates() {
        let spec = UnlockSpec::AfterMillis(u64::MAX);
        assert_eq!(spec.resolve(now()), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            "soon".parse::<UnlockSpec>(),
            Err(UnlockSpecError::Unrecognized(_))
        ));
        assert!(matches!(
            "custom:-5".parse::<UnlockSpec>(),
            Err(UnlockSpecError::InvalidCustom(_))
        ));
        assert!(matches!(
            "custom:".parse::<UnlockSpec>(),
            Err(UnlockSpecError::InvalidCustom(_))
        ));
    }

    #[test]
    fn display_parses_back() {
        for spec in [
            UnlockSpec::Preset(DurationPreset::OneWeek),
            UnlockSpec::AfterMillis(1234),
            UnlockSpec::At(now()),
        ] {
            assert_eq!(spec.to_string().parse::<UnlockSpec>().unwrap(), spec);
        }
    }
}
