//! Per-series in-memory state used to compute counter deltas (§4.3
//! "Metadata Cache").

use std::collections::HashMap;

use common_types::{Series, TimestampMs};
use logger::debug;
use snafu::ResultExt;
use store_kv::{ColumnValue, StoreAdapter, Table};
use time_ext::year_of_millis;
use tokio::sync::Mutex;

use crate::error::{DecodeRawValueSnafu, Result, StoreSnafu};

/// `(last_value, last_timestamp, min_timestamp)` for one series (§3
/// "Metadata record"). Never persisted as such — reconstructable from
/// `raw_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub last_val: i64,
    pub last_update: TimestampMs,
    pub min_ts: TimestampMs,
}

impl Metadata {
    /// Seeds a fresh record from a value recovered from `raw_data` during a
    /// cold-load scan (§4.3 step 2, "found" branch).
    fn seeded_from_raw_data(val: i64, ts: TimestampMs) -> Self {
        Self { last_val: val, last_update: ts, min_ts: ts }
    }

    /// Seeds a fresh record from the sample currently being ingested, used
    /// when no prior `raw_data` column falls within the seek-back window
    /// (§4.3 step 2, "not found" branch) — the series is treated as new.
    fn seeded_from_incoming(val: i64, ts: TimestampMs) -> Self {
        Self { last_val: val, last_update: ts, min_ts: ts }
    }
}

/// Owns the per-series [`Metadata`] records. Lazily seeds an entry from
/// `raw_data` on first touch, within `seek_back_ms` of `now`.
pub struct MetadataCache {
    entries: Mutex<HashMap<String, Metadata>>,
    seek_back_ms: i64,
}

impl MetadataCache {
    pub fn new(seek_back_ms: u64) -> Self {
        Self { entries: Mutex::new(HashMap::new()), seek_back_ms: seek_back_ms as i64 }
    }

    /// Returns the metadata record for `series`, seeding it from storage
    /// (or from `incoming` itself, if nothing recent is found) if this is
    /// the first time the series has been touched.
    pub async fn get_or_load(
        &self,
        store: &dyn StoreAdapter,
        series: &Series,
        now_ms: TimestampMs,
        incoming_val: i64,
        incoming_ts: TimestampMs,
    ) -> Result<Metadata> {
        let key = series.path.raw_meta_key();

        {
            let entries = self.entries.lock().await;
            if let Some(record) = entries.get(&key) {
                return Ok(*record);
            }
        }

        let record = self.cold_load(store, series, now_ms, incoming_val, incoming_ts).await?;

        let mut entries = self.entries.lock().await;
        Ok(*entries.entry(key).or_insert(record))
    }

    async fn cold_load(
        &self,
        store: &dyn StoreAdapter,
        series: &Series,
        now_ms: TimestampMs,
        incoming_val: i64,
        incoming_ts: TimestampMs,
    ) -> Result<Metadata> {
        let window_start = now_ms - self.seek_back_ms;
        let year_start = year_of_millis(window_start);
        let year_end = year_of_millis(now_ms);

        let keys: Vec<String> = (year_start..=year_end).map(|year| series.path.raw_row_key(year)).collect();

        let rows = store
            .multi_range(Table::RawData, &keys, window_start, now_ms, true, Some(1))
            .await
            .context(StoreSnafu { op: "metadata cold-load scan" })?;

        let most_recent = rows
            .into_iter()
            .filter_map(|(_, cols)| cols.into_iter().next())
            .max_by_key(|col| col.ts_ms);

        match most_recent {
            Some(col) => {
                let ColumnValue::Raw(json) = col.value else {
                    return Ok(Metadata::seeded_from_incoming(incoming_val, incoming_ts));
                };
                let val: i64 = serde_json::from_str(&json).context(DecodeRawValueSnafu { value: json })?;
                debug!("metadata cold-loaded for series, ts:{}, val:{}", col.ts_ms, val);
                Ok(Metadata::seeded_from_raw_data(val, col.ts_ms))
            }
            None => {
                debug!("no prior raw_data within seek-back window; seeding metadata from incoming sample");
                Ok(Metadata::seeded_from_incoming(incoming_val, incoming_ts))
            }
        }
    }

    /// Installs an updated record after a successful rate derivation.
    pub async fn update(&self, series: &Series, record: Metadata) {
        let key = series.path.raw_meta_key();
        self.entries.lock().await.insert(key, record);
    }
}

#[cfg(test)]
mod tests {
    use common_types::SeriesPath;
    use store_kv::MockStoreAdapter;

    use super::*;

    fn series() -> Series {
        Series::new(SeriesPath::new(["r1", "ifIn"]), 30_000)
    }

    #[tokio::test]
    async fn seeds_from_incoming_when_store_is_empty() {
        let store = MockStoreAdapter::new(200);
        let cache = MetadataCache::new(30 * 86_400_000);
        let record = cache.get_or_load(&store, &series(), 2_000_000, 100, 2_000_000).await.unwrap();
        assert_eq!(record, Metadata { last_val: 100, last_update: 2_000_000, min_ts: 2_000_000 });
    }

    #[tokio::test]
    async fn seeds_from_raw_data_when_present_in_window() {
        let store = MockStoreAdapter::new(200);
        let key = series().path.raw_row_key(1970);
        store.insert_raw(&key, 500_000, "42", None).await.unwrap();
        store.flush().await.unwrap();

        let cache = MetadataCache::new(30 * 86_400_000);
        let record = cache.get_or_load(&store, &series(), 500_000 + 60_000, 999, 500_000 + 60_000).await.unwrap();
        assert_eq!(record.last_val, 42);
        assert_eq!(record.last_update, 500_000);
    }

    #[tokio::test]
    async fn second_lookup_hits_the_cache_not_the_store() {
        let store = MockStoreAdapter::new(200);
        let cache = MetadataCache::new(30 * 86_400_000);
        let first = cache.get_or_load(&store, &series(), 1_000, 1, 1_000).await.unwrap();
        cache.update(&series(), Metadata { last_val: 99, last_update: 2_000, min_ts: 1_000 }).await;
        let second = cache.get_or_load(&store, &series(), 1_000, 1, 1_000).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(second.last_val, 99);
    }
}
