//! Fixed-offset time zone registry.
//!
//! # Responsibility
//! - Map the fixed label set (`UTC`, `UTC+1`..`UTC+12`, `UTC-1`..`UTC-12`)
//!   to static hour offsets.
//! - Re-express instants in a labeled zone for display.
//!
//! # Invariants
//! - The registry is built once per process and never mutated.
//! - Label matching is exact and case-sensitive.
//! - Conversion changes the offset only; the instant is preserved.

use chrono::{DateTime, FixedOffset};
use once_cell::sync::Lazy;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

const SECONDS_PER_HOUR: i32 = 60 * 60;

const ZONE_TABLE: [(&str, i8); 25] = [
    ("UTC-12", -12),
    ("UTC-11", -11),
    ("UTC-10", -10),
    ("UTC-9", -9),
    ("UTC-8", -8),
    ("UTC-7", -7),
    ("UTC-6", -6),
    ("UTC-5", -5),
    ("UTC-4", -4),
    ("UTC-3", -3),
    ("UTC-2", -2),
    ("UTC-1", -1),
    ("UTC", 0),
    ("UTC+1", 1),
    ("UTC+2", 2),
    ("UTC+3", 3),
    ("UTC+4", 4),
    ("UTC+5", 5),
    ("UTC+6", 6),
    ("UTC+7", 7),
    ("UTC+8", 8),
    ("UTC+9", 9),
    ("UTC+10", 10),
    ("UTC+11", 11),
    ("UTC+12", 12),
];

static REGISTRY: Lazy<Vec<TimeZone>> = Lazy::new(|| {
    ZONE_TABLE
        .iter()
        .map(|(label, hours)| TimeZone {
            label,
            offset: FixedOffset::east_opt(i32::from(*hours) * SECONDS_PER_HOUR)
                .expect("registry offsets are within +/-12h"),
        })
        .collect()
});

/// Label of the zone used for storage.
pub const UTC_LABEL: &str = "UTC";

/// Returned when a label is not part of the fixed registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown time zone label `{0}`")]
pub struct UnknownTimeZone(pub String);

/// One registry entry: a display label and its static UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeZone {
    label: &'static str,
    offset: FixedOffset,
}

impl TimeZone {
    /// The storage zone.
    pub fn utc() -> Self {
        // `UTC` sits in the middle of the offset-ordered table.
        REGISTRY[ZONE_TABLE.len() / 2]
    }

    /// Canonical label, e.g. `UTC+3`.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Whole-hour offset from UTC.
    pub fn offset_hours(&self) -> i32 {
        self.offset.local_minus_utc() / SECONDS_PER_HOUR
    }

    /// Offset usable with chrono conversions.
    pub fn fixed_offset(&self) -> FixedOffset {
        self.offset
    }

    /// Every registered zone, ordered from `UTC-12` to `UTC+12`.
    pub fn all() -> impl Iterator<Item = TimeZone> {
        REGISTRY.iter().copied()
    }
}

impl Default for TimeZone {
    fn default() -> Self {
        Self::utc()
    }
}

impl Display for TimeZone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label)
    }
}

impl FromStr for TimeZone {
    type Err = UnknownTimeZone;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        validate(value).ok_or_else(|| UnknownTimeZone(value.to_string()))
    }
}

impl Serialize for TimeZone {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label)
    }
}

impl<'de> Deserialize<'de> for TimeZone {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        label.parse().map_err(serde::de::Error::custom)
    }
}

/// Looks up a label in the registry.
///
/// Returns `None` for anything that is not exactly one of the registered
/// labels (`utc+3`, `UTC+0`, `UTC-13` and `UTC-` are all rejected).
pub fn validate(label: &str) -> Option<TimeZone> {
    REGISTRY.iter().find(|zone| zone.label == label).copied()
}

/// Re-expresses `timestamp` in `zone`. The instant is unchanged.
pub fn convert(timestamp: DateTime<FixedOffset>, zone: TimeZone) -> DateTime<FixedOffset> {
    timestamp.with_timezone(&zone.offset)
}

/// Re-expresses `timestamp` in UTC, the storage zone.
pub fn normalize_utc(timestamp: DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    convert(timestamp, TimeZone::utc())
}

#[cfg(test)]
mod tests {
    use super::{convert, normalize_utc, validate, TimeZone, UTC_LABEL};
    use chrono::{DateTime, Duration, FixedOffset, Timelike};

    fn sample_instant() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2024-03-10T10:15:30Z").unwrap()
    }

    #[test]
    fn registry_has_all_labels_in_offset_order() {
        let labels: Vec<_> = TimeZone::all().map(|zone| zone.label()).collect();
        assert_eq!(labels.len(), 25);
        assert_eq!(labels.first(), Some(&"UTC-12"));
        assert_eq!(labels.last(), Some(&"UTC+12"));
        assert_eq!(TimeZone::utc().label(), UTC_LABEL);
        assert_eq!(TimeZone::utc().offset_hours(), 0);
    }

    #[test]
    fn validate_accepts_exact_labels() {
        for label in ["UTC", "UTC+1", "UTC+3", "UTC-6", "UTC+12", "UTC-12"] {
            let zone = validate(label).unwrap_or_else(|| panic!("{label} should validate"));
            assert_eq!(zone.label(), label);
        }
    }

    #[test]
    fn validate_rejects_unknown_labels() {
        for label in ["UtC+1", "utc+3", "UTC-", "UTC+0", "UTC-13", "UTC+13", "", " UTC"] {
            assert!(validate(label).is_none(), "{label:?} must be rejected");
        }
    }

    #[test]
    fn convert_shifts_wall_clock_only() {
        let instant = sample_instant();
        let plus_three = convert(instant, validate("UTC+3").unwrap());
        let minus_three = convert(instant, validate("UTC-3").unwrap());

        assert_eq!(plus_three, instant);
        assert_eq!(plus_three.hour(), 13);
        assert_eq!(minus_three.hour(), 7);
        assert_eq!(
            plus_three.naive_local(),
            instant.naive_utc() + Duration::hours(3)
        );
    }

    #[test]
    fn convert_round_trips_through_every_zone() {
        let instant = sample_instant();
        for zone in TimeZone::all() {
            let shown = convert(instant, zone);
            let back = normalize_utc(shown);
            assert_eq!(back, instant);
            assert_eq!(back.naive_local(), instant.naive_utc());
            assert_eq!(back.offset().local_minus_utc(), 0);
        }
    }

    #[test]
    fn serde_uses_label_strings() {
        let zone = validate("UTC-4").unwrap();
        let json = serde_json::to_string(&zone).unwrap();
        assert_eq!(json, "\"UTC-4\"");
        let parsed: TimeZone = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, zone);
        assert!(serde_json::from_str::<TimeZone>("\"UTC+0\"").is_err());
    }
}
