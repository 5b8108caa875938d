//! Row-value records for the three derived tables (§3 "Four logical
//! tables"). Each struct mirrors one table's value shape; the counter
//! fields (`val`, `is_valid`, `count`) are written as increments by the
//! store adapter and read back as totals.

use crate::{FreqMs, TimestampMs, IS_VALID_INVALID, IS_VALID_OK};

/// A `base_rates` bin: the rate derived at the series' own frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateBin {
    pub ts: TimestampMs,
    pub val: i64,
    pub is_valid: i64,
}

impl RateBin {
    pub fn new(ts: TimestampMs) -> Self {
        Self { ts, val: 0, is_valid: 0 }
    }

    /// Whether this bin holds a rate derived from at least one valid
    /// counter delta (§3 invariant: `is_valid > 0` iff so).
    pub fn has_valid_contribution(&self) -> bool {
        self.is_valid > 0
    }

    /// `average` consolidation for a base-rate bin: bytes (or whatever
    /// counter unit) per second at the series' own frequency.
    pub fn average_per_sec(&self, freq_ms: FreqMs) -> f64 {
        self.val as f64 / (freq_ms as f64 / 1000.0)
    }

    /// The increment to apply for a valid delta `delta_val` landing in this
    /// bin.
    pub fn valid_increment(delta_val: i64) -> (i64, i64) {
        (delta_val, IS_VALID_OK)
    }

    /// The increment to apply for an invalid (reset/wrap/outlier) delta: no
    /// `val` contribution, `is_valid` bumped by the invalid sentinel.
    pub fn invalid_increment() -> (i64, i64) {
        (0, IS_VALID_INVALID)
    }
}

/// A `rate_aggregations` bin: the rollup of base-rate bins at a coarser
/// frequency `base_freq`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AggregationBin {
    pub ts: TimestampMs,
    pub val: i64,
    pub base_freq: FreqMs,
    pub count: i64,
}

impl AggregationBin {
    pub fn new(ts: TimestampMs, base_freq: FreqMs) -> Self {
        Self { ts, val: 0, base_freq, count: 0 }
    }

    /// `average` consolidation for an aggregation bin: `val / (count ·
    /// base_freq/1000)`, recovering average units-per-second across the
    /// contributing base-rate bins.
    pub fn average_per_sec(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        Some(self.val as f64 / (self.count as f64 * (self.base_freq as f64 / 1000.0)))
    }
}

/// A `stat_aggregations` bin: the running min/max extrema for the bin, plus
/// the raw timestamps that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatBin {
    pub ts: TimestampMs,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub min_ts: Option<TimestampMs>,
    pub max_ts: Option<TimestampMs>,
}

impl StatBin {
    pub fn new(ts: TimestampMs) -> Self {
        Self { ts, ..Default::default() }
    }

    pub fn seeded(ts: TimestampMs, val: i64, sample_ts: TimestampMs) -> Self {
        Self {
            ts,
            min: Some(val),
            max: Some(val),
            min_ts: Some(sample_ts),
            max_ts: Some(sample_ts),
        }
    }

    /// Applies a new sample against the current extrema, returning the
    /// field-level update to persist (a subset of `{min, max, min_ts,
    /// max_ts}`), or `None` if the sample changes nothing (§4.5 step 4).
    pub fn extend(&mut self, val: i64, sample_ts: TimestampMs) -> Option<StatFields> {
        let mut update = StatFields::default();
        if val > self.max.unwrap_or(i64::MIN) {
            self.max = Some(val);
            self.max_ts = Some(sample_ts);
            update.max = Some(val);
            update.max_ts = Some(sample_ts);
        }
        if val < self.min.unwrap_or(i64::MAX) {
            self.min = Some(val);
            self.min_ts = Some(sample_ts);
            update.min = Some(val);
            update.min_ts = Some(sample_ts);
        }
        if update.is_empty() {
            None
        } else {
            Some(update)
        }
    }
}

/// A partial `stat_aggregations` write: only the fields that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatFields {
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub min_ts: Option<TimestampMs>,
    pub max_ts: Option<TimestampMs>,
}

impl StatFields {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.min_ts.is_none() && self.max_ts.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_bin_average_per_sec() {
        let bin = RateBin { ts: 0, val: 30_000, is_valid: IS_VALID_OK };
        assert_eq!(bin.average_per_sec(30_000), 1000.0);
    }

    #[test]
    fn aggregation_bin_average_per_sec() {
        let bin = AggregationBin { ts: 0, val: 100, base_freq: 30_000, count: 2 };
        assert_eq!(bin.average_per_sec(), Some(100.0 / (2.0 * 30.0)));
    }

    #[test]
    fn aggregation_bin_empty_has_no_average() {
        let bin = AggregationBin::new(0, 30_000);
        assert_eq!(bin.average_per_sec(), None);
    }

    #[test]
    fn stat_bin_s4_min_max_rollup() {
        let mut bin = StatBin::seeded(0, 10, 100);
        assert!(bin.extend(50, 200).is_some()); // new max
        assert!(bin.extend(20, 300).is_none()); // neither extremum
        assert!(bin.extend(5, 400).is_some()); // new min
        assert!(bin.extend(30, 500).is_none());
        assert_eq!(bin.min, Some(5));
        assert_eq!(bin.max, Some(50));
        assert_eq!(bin.min_ts, Some(400));
        assert_eq!(bin.max_ts, Some(200));
    }
}
