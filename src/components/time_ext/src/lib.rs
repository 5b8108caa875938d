//! Small time helpers shared by the config surface and the row-key sharding
//! scheme: a human-writable duration for config files, and the UTC-year
//! derivation used to shard series rows by calendar year.

use std::{fmt, str::FromStr, time::Duration};

use chrono::{Datelike, TimeZone, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use snafu::Snafu;

/// A [`Duration`] that (de)serializes as a human string like `"30d"`, `"1h"`,
/// `"500ms"`, rather than as a bare integer of unspecified unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadableDuration(pub Duration);

impl ReadableDuration {
    pub const fn secs(s: u64) -> Self {
        Self(Duration::from_secs(s))
    }

    pub const fn millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }

    pub const fn days(d: u64) -> Self {
        Self(Duration::from_secs(d * 86400))
    }

    pub fn as_millis_u64(&self) -> u64 {
        self.0.as_millis() as u64
    }
}

impl fmt::Display for ReadableDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0.as_millis();
        if ms % 86_400_000 == 0 {
            write!(f, "{}d", ms / 86_400_000)
        } else if ms % 3_600_000 == 0 {
            write!(f, "{}h", ms / 3_600_000)
        } else if ms % 60_000 == 0 {
            write!(f, "{}m", ms / 60_000)
        } else if ms % 1000 == 0 {
            write!(f, "{}s", ms / 1000)
        } else {
            write!(f, "{ms}ms")
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ParseError {
    #[snafu(display("Invalid readable duration, input:{input}"))]
    Invalid { input: String },
}

impl FromStr for ReadableDuration {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num_part, unit) = s.split_at(
            s.find(|c: char| !c.is_ascii_digit())
                .unwrap_or(s.len()),
        );
        let num: u64 = num_part.parse().map_err(|_| ParseError::Invalid {
            input: s.to_string(),
        })?;
        let ms = match unit {
            "ms" => num,
            "s" => num * 1000,
            "m" => num * 60_000,
            "h" => num * 3_600_000,
            "d" => num * 86_400_000,
            _ => {
                return Err(ParseError::Invalid {
                    input: s.to_string(),
                })
            }
        };
        Ok(Self::millis(ms))
    }
}

impl Serialize for ReadableDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ReadableDuration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// The UTC calendar year containing the given millisecond timestamp.
///
/// Used to compute the year-shard suffix of a series row key (§3 row-key
/// sharding).
pub fn year_of_millis(ts_ms: i64) -> i32 {
    Utc.timestamp_millis_opt(ts_ms)
        .single()
        .expect("timestamp out of range")
        .year()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_round_numbers() {
        assert_eq!(ReadableDuration::days(30).to_string(), "30d");
        assert_eq!(ReadableDuration::secs(90).to_string(), "90s");
        assert_eq!(ReadableDuration::millis(250).to_string(), "250ms");
    }

    #[test]
    fn parses_back() {
        let d: ReadableDuration = "30d".parse().unwrap();
        assert_eq!(d, ReadableDuration::days(30));
        let d: ReadableDuration = "1500ms".parse().unwrap();
        assert_eq!(d.as_millis_u64(), 1500);
    }

    #[test]
    fn year_of_millis_matches_calendar() {
        // 2023-12-31T23:59:00Z
        assert_eq!(year_of_millis(1_703_980_740_000), 2023);
        // 2024-01-01T00:01:00Z
        assert_eq!(year_of_millis(1_704_067_260_000), 2024);
    }
}
