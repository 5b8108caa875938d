//! Rollup writer for coarser-than-native-frequency resolutions (§4.5
//! "Aggregator"). For every base-rate bin touched by the Rate Deriver, fans
//! out one `rate_aggregations` increment and, for `stat_aggregations`, at
//! most two read-avoiding writes per bin via the in-memory
//! [`AggregationCache`].

use std::collections::HashMap;

use common_types::{FreqMs, Series, StatBin, StatFields, TimestampMs};
use snafu::ResultExt;
use store_kv::{ColumnValue, StoreAdapter, Table};
use time_ext::year_of_millis;
use tokio::sync::Mutex;

use crate::error::{Result, StoreSnafu};

/// Owns the per-series extrema cache for `stat_aggregations` (§3
/// "Aggregation-cache record"). Presence of a row-key entry means this
/// series has already been seeded from storage at least once since the
/// cache was constructed; rollover to a new bin replaces the entry's value
/// in place rather than removing the key, so that seeding never repeats.
pub struct AggregationCache {
    entries: Mutex<HashMap<String, StatBin>>,
}

impl AggregationCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl Default for AggregationCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes `rate_aggregations` and `stat_aggregations` rollups for every
/// configured coarser frequency.
pub struct Aggregator {
    cache: AggregationCache,
}

impl Aggregator {
    pub fn new() -> Self {
        Self { cache: AggregationCache::new() }
    }

    /// Rolls one base-rate bin update up into `coarser_series` (§4.5).
    ///
    /// `base_rate_ts` is the base-rate bin's own timestamp, `base_rate_val`
    /// the increment just applied to it, and `base_freq` the series' native
    /// frequency (the sub-column name in `rate_aggregations`).
    pub async fn fan_out(
        &self,
        store: &dyn StoreAdapter,
        coarser_series: &Series,
        base_rate_ts: TimestampMs,
        base_rate_val: i64,
        base_freq: FreqMs,
    ) -> Result<()> {
        let agg_bin_ts = common_types::slot::slot(base_rate_ts, coarser_series.freq);
        let year = year_of_millis(agg_bin_ts);
        let row_key = coarser_series.row_key(year);

        store
            .increment_agg(&row_key, agg_bin_ts, base_rate_val, base_freq, 1)
            .await
            .context(StoreSnafu { op: "increment_agg" })?;

        self.record_stat(store, &row_key, agg_bin_ts, base_rate_val, base_rate_ts).await
    }

    /// §4.5 "Stat rollup" steps 1-4.
    async fn record_stat(
        &self,
        store: &dyn StoreAdapter,
        row_key: &str,
        bin_ts: TimestampMs,
        val: i64,
        sample_ts: TimestampMs,
    ) -> Result<()> {
        let mut entries = self.cache.entries.lock().await;

        if !entries.contains_key(row_key) {
            let seeded = seed_from_store(store, row_key, bin_ts).await?;
            entries.insert(row_key.to_string(), seeded);
        }

        let entry = entries.get_mut(row_key).expect("just inserted if absent");
        if entry.ts != bin_ts {
            // New bin started; the prior extrema no longer apply and are
            // discarded without a fresh store read (§4.5 step 2).
            *entry = StatBin::new(bin_ts);
        }

        if entry.min.is_none() && entry.max.is_none() {
            *entry = StatBin::seeded(bin_ts, val, sample_ts);
            let fields =
                StatFields { min: entry.min, max: entry.max, min_ts: entry.min_ts, max_ts: entry.max_ts };
            store.put_stat(row_key, bin_ts, fields).await.context(StoreSnafu { op: "put_stat seed" })?;
        } else if let Some(update) = entry.extend(val, sample_ts) {
            store.put_stat(row_key, bin_ts, update).await.context(StoreSnafu { op: "put_stat extend" })?;
        }

        Ok(())
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

async fn seed_from_store(store: &dyn StoreAdapter, row_key: &str, bin_ts: TimestampMs) -> Result<StatBin> {
    let point = store
        .point_super(Table::StatAggregations, row_key, bin_ts)
        .await
        .context(StoreSnafu { op: "stat seed point read" })?;

    Ok(match point {
        Some(col) => match col.value {
            ColumnValue::Stat(fields) => {
                StatBin { ts: bin_ts, min: fields.min, max: fields.max, min_ts: fields.min_ts, max_ts: fields.max_ts }
            }
            _ => StatBin::new(bin_ts),
        },
        None => StatBin::new(bin_ts),
    })
}

#[cfg(test)]
mod tests {
    use common_types::SeriesPath;
    use store_kv::MockStoreAdapter;

    use super::*;

    fn coarser_series() -> Series {
        Series::new(SeriesPath::new(["r1", "ifIn"]), 300_000)
    }

    #[tokio::test]
    async fn rate_aggregation_accumulates_val_and_count() {
        let store = MockStoreAdapter::new(200);
        let aggregator = Aggregator::new();
        let series = coarser_series();

        aggregator.fan_out(&store, &series, 1_020_000, 30_000, 30_000).await.unwrap();
        aggregator.fan_out(&store, &series, 1_050_000, 30_000, 30_000).await.unwrap();
        store.flush().await.unwrap();

        let key = series.row_key(1970);
        let point = store.point_super(Table::RateAggregations, &key, 900_000).await.unwrap().unwrap();
        assert_eq!(point.value, ColumnValue::Aggregation { val: 60_000, base_freq: 30_000, count: 2 });
    }

    #[tokio::test]
    async fn s4_min_max_rollup_at_most_two_writes_after_seed() {
        let store = MockStoreAdapter::new(200);
        let aggregator = Aggregator::new();
        let series = coarser_series();
        let key = series.row_key(1970);
        let bin_ts = 0;

        // First touch always costs one write (the seed); extend() only
        // writes again when a new extremum is set (§4.5 step 4).
        for (ts, val) in [(0, 10), (30_000, 50), (60_000, 20), (90_000, 5), (120_000, 30)] {
            aggregator.fan_out(&store, &series, ts, val, 30_000).await.unwrap();
        }
        store.flush().await.unwrap();

        let point = store.point_super(Table::StatAggregations, &key, bin_ts).await.unwrap().unwrap();
        let ColumnValue::Stat(fields) = point.value else { panic!("expected stat column") };
        assert_eq!(fields.min, Some(5));
        assert_eq!(fields.max, Some(50));
        assert_eq!(fields.min_ts, Some(90_000));
        assert_eq!(fields.max_ts, Some(30_000));
    }

    #[tokio::test]
    async fn bin_rollover_discards_prior_extrema_without_a_second_read() {
        let store = MockStoreAdapter::new(200);
        let aggregator = Aggregator::new();
        let series = coarser_series();

        aggregator.fan_out(&store, &series, 0, 10, 30_000).await.unwrap();
        aggregator.fan_out(&store, &series, 1, 100, 30_000).await.unwrap(); // still bin 0
        // Rolls into the next 300_000-wide bin.
        aggregator.fan_out(&store, &series, 300_000, 7, 30_000).await.unwrap();
        store.flush().await.unwrap();

        let key = series.row_key(1970);
        let point = store.point_super(Table::StatAggregations, &key, 300_000).await.unwrap().unwrap();
        let ColumnValue::Stat(fields) = point.value else { panic!("expected stat column") };
        assert_eq!(fields.min, Some(7));
        assert_eq!(fields.max, Some(7));
    }
}
