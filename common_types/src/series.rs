//! Series identity: the ordered path plus the sampling frequency that
//! together select a row in any of the four logical tables (§3, §4.1).

use serde::{Deserialize, Serialize};

use crate::FreqMs;

/// An ordered, non-empty sequence of path segments identifying a metric,
/// e.g. `["snmp", "router1", "ifHCInOctets", "ge-0/0/0"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesPath(pub Vec<String>);

impl SeriesPath {
    pub fn new(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        assert!(!segments.is_empty(), "series path must have at least one segment");
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// The metadata row key for the raw series at this path (no frequency
    /// suffix), matching `DataContainerBase.get_key` in the system this was
    /// distilled from.
    pub fn raw_meta_key(&self) -> String {
        path_codec::encode(&self.0, None, None)
    }

    /// The `raw_data` row key for the year containing a given sample.
    pub fn raw_row_key(&self, year: i32) -> String {
        path_codec::encode(&self.0, None, Some(year))
    }
}

/// A series at a specific consolidation frequency: the unit that
/// `base_rates`, `rate_aggregations`, and `stat_aggregations` rows are keyed
/// by, alongside a bin timestamp and year shard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Series {
    pub path: SeriesPath,
    pub freq: FreqMs,
}

impl Series {
    pub fn new(path: SeriesPath, freq: FreqMs) -> Self {
        Self { path, freq }
    }

    /// The metadata row key for this (path, freq) pair, matching
    /// `RawRateData.get_meta_key`.
    pub fn meta_key(&self) -> String {
        path_codec::encode(&self.path.0, Some(self.freq), None)
    }

    /// The aggregated-table row key (`base_rates` / `rate_aggregations` /
    /// `stat_aggregations`) for the year containing a given bin timestamp.
    pub fn row_key(&self, year: i32) -> String {
        path_codec::encode(&self.path.0, Some(self.freq), Some(year))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_meta_key_has_no_freq_suffix() {
        let p = SeriesPath::new(["snmp", "router1", "ifHCInOctets"]);
        assert_eq!(p.raw_meta_key(), "snmp:router1:ifHCInOctets");
    }

    #[test]
    fn series_meta_key_includes_freq_not_year() {
        let s = Series::new(SeriesPath::new(["snmp", "router1"]), 30_000);
        assert_eq!(s.meta_key(), "snmp:router1:30000");
    }

    #[test]
    fn series_row_key_includes_freq_and_year() {
        let s = Series::new(SeriesPath::new(["snmp", "router1"]), 30_000);
        assert_eq!(s.row_key(2024), "snmp:router1:30000:2024");
    }

    #[test]
    #[should_panic(expected = "at least one segment")]
    fn rejects_empty_path() {
        SeriesPath::new(Vec::<String>::new());
    }
}
