//! Encodes and decodes the row keys used to address a series' data in the
//! store (§4.1 "Row keys"). A row key is the series path, with each segment's
//! embedded delimiters escaped, followed by an optional frequency and/or
//! year suffix depending on which logical table the key addresses:
//!
//! - metadata for a raw series: `path`
//! - metadata for an aggregated series: `path:freq`
//! - a `raw_data` row: `path:year`
//! - a `base_rates` / `rate_aggregations` / `stat_aggregations` row:
//!   `path:freq:year`
//!
//! This module only knows how to build and split these strings; which
//! shape applies to a given key is the caller's responsibility, exactly as
//! in the system this scheme was distilled from.

const DELIMITER: char = ':';
const ESCAPE: char = '\\';

/// Escapes embedded delimiters in a single path segment.
pub fn escape_segment(segment: &str) -> String {
    segment.replace(DELIMITER, "\\:")
}

/// Builds a row key from a path and optional frequency/year suffixes.
///
/// `freq` must be `Some` if `year` is `Some` and the key addresses an
/// aggregated table; passing `year` alone (no `freq`) builds a `raw_data`
/// key, and passing neither builds a raw-series metadata key.
pub fn encode(path: &[String], freq: Option<u64>, year: Option<i32>) -> String {
    let mut parts: Vec<String> = path.iter().map(|s| escape_segment(s)).collect();
    if let Some(freq) = freq {
        parts.push(freq.to_string());
    }
    if let Some(year) = year {
        parts.push(year.to_string());
    }
    parts.join(&DELIMITER.to_string())
}

/// Splits a row key back into its raw components (path segments, plus any
/// trailing `freq`/`year` strings), honoring escaped delimiters.
///
/// The caller must know, from context, how many trailing components (if
/// any) are `freq`/`year` rather than path segments — this function only
/// undoes the join, it does not recover the original key's "shape".
pub fn decode(key: &str) -> Vec<String> {
    let chars: Vec<char> = key.chars().collect();
    let mut split_at = Vec::new();
    for i in 0..chars.len() {
        if chars[i] == DELIMITER && (i == 0 || chars[i - 1] != ESCAPE) {
            split_at.push(i);
        }
    }

    let mut out = Vec::with_capacity(split_at.len() + 1);
    let mut last = 0;
    for i in split_at {
        let chunk: String = chars[last..i].iter().collect();
        out.push(chunk.replace(ESCAPE, ""));
        last = i + 1;
    }
    let chunk: String = chars[last..].iter().collect();
    out.push(chunk.replace(ESCAPE, ""));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_plain_path() {
        let path = vec!["snmp".to_string(), "router1".to_string(), "ifHCInOctets".to_string()];
        assert_eq!(encode(&path, None, None), "snmp:router1:ifHCInOctets");
    }

    #[test]
    fn encodes_freq_and_year() {
        let path = vec!["snmp".to_string(), "router1".to_string()];
        assert_eq!(encode(&path, Some(30000), Some(2024)), "snmp:router1:30000:2024");
    }

    #[test]
    fn escapes_embedded_delimiter() {
        let path = vec!["snmp".to_string(), "if:desc".to_string()];
        assert_eq!(encode(&path, None, None), "snmp:if\\:desc");
    }

    #[test]
    fn round_trips_plain_path() {
        let path = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let key = encode(&path, None, None);
        assert_eq!(decode(&key), path);
    }

    #[test]
    fn round_trips_escaped_segment_as_single_piece() {
        let path = vec!["a".to_string(), "b:c".to_string()];
        let key = encode(&path, None, None);
        assert_eq!(decode(&key), path);
    }

    #[test]
    fn decode_splits_trailing_freq_year() {
        let path = vec!["snmp".to_string(), "router1".to_string()];
        let key = encode(&path, Some(30000), Some(2024));
        let parts = decode(&key);
        assert_eq!(parts, vec!["snmp", "router1", "30000", "2024"]);
    }

    proptest::proptest! {
        #[test]
        fn round_trip_arbitrary_segments(segs in proptest::collection::vec("[a-zA-Z0-9_./: ]{0,12}", 1..6)) {
            let key = encode(&segs, None, None);
            let back = decode(&key);
            proptest::prop_assert_eq!(back, segs);
        }
    }
}
