//! Persister tuning knobs (§6 "Configuration surface, expanded").

use serde::{Deserialize, Serialize};
use time_ext::ReadableDuration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Rollup frequencies fanned out to by the Aggregator for every
    /// base-rate bin (§4.5). Each must be a multiple of the series'
    /// own frequency.
    pub coarser_freqs_ms: Vec<u64>,

    /// How far back the Metadata Cache scans `raw_data` on a cold-start
    /// (§4.3): samples older than this are treated as belonging to a new
    /// series.
    pub metadata_seek_back: ReadableDuration,

    /// The multiple of a series' own frequency beyond which a forward
    /// time delta is considered an outlier rather than a valid gap
    /// (§4.4 step 4: "`Δt` is within a sanity bound, e.g. `≤ 40·freq`").
    pub delta_sanity_factor: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            coarser_freqs_ms: vec![300_000, 3_600_000],
            metadata_seek_back: ReadableDuration::days(30),
            delta_sanity_factor: 40,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_seek_back_is_thirty_days() {
        assert_eq!(Config::default().metadata_seek_back.as_millis_u64(), 30 * 86_400_000);
    }
}
