//! The unit of ingestion: one raw reading of a path at a point in time
//! (§4.2 "insert_raw").

use serde::{Deserialize, Serialize};

use crate::{series::SeriesPath, FreqMs, TimestampMs};

/// A single raw sample as handed to the store by the collector.
///
/// `val` is the raw reading reported by the instrument — for a counter-type
/// metric this is the free-running counter value itself, not a derived
/// rate; rate derivation happens downstream in the persister.
///
/// `Deserialize`/`Serialize` so the (out-of-scope, §1) poller front-end can
/// hand these across the ingestion interface as JSON (§6) without this
/// crate needing to know anything about the poller's own wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSample {
    pub path: SeriesPath,
    pub freq: FreqMs,
    pub ts: TimestampMs,
    pub val: i64,
}

impl RawSample {
    pub fn new(path: SeriesPath, freq: FreqMs, ts: TimestampMs, val: i64) -> Self {
        Self { path, freq, ts, val }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let sample = RawSample::new(SeriesPath::new(["snmp", "router1", "ifHCInOctets"]), 30_000, 1_000, 42);
        let json = serde_json::to_string(&sample).unwrap();
        let back: RawSample = serde_json::from_str(&json).unwrap();
        assert_eq!(sample, back);
    }
}
