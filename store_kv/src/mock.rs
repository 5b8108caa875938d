//! An in-memory store adapter used by tests and by any caller that wants
//! the persister/query-planner pipeline without a live cluster.
//!
//! Mirrors the real shape of the four logical tables (row key → sorted
//! columns) so query-planner behavior (range slices, year-shard fan-out,
//! consolidation) exercises the same code paths against this backend as
//! against the scylla-backed one.

use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use common_types::StatFields;
use tokio::sync::Mutex;

use crate::{
    adapter::{RowKey, StoreAdapter},
    batch::Batch,
    error::{ClosedSnafu, Result},
    table::{Column, ColumnValue, Table},
    AdminStore,
};

#[derive(Default)]
struct Tables {
    raw_data: HashMap<String, BTreeMap<i64, ColumnValue>>,
    base_rates: HashMap<String, BTreeMap<i64, ColumnValue>>,
    rate_aggregations: HashMap<String, BTreeMap<i64, ColumnValue>>,
    stat_aggregations: HashMap<String, BTreeMap<i64, ColumnValue>>,
}

impl Tables {
    fn table_mut(&mut self, table: Table) -> &mut HashMap<String, BTreeMap<i64, ColumnValue>> {
        match table {
            Table::RawData => &mut self.raw_data,
            Table::BaseRates => &mut self.base_rates,
            Table::RateAggregations => &mut self.rate_aggregations,
            Table::StatAggregations => &mut self.stat_aggregations,
        }
    }

    fn table(&self, table: Table) -> &HashMap<String, BTreeMap<i64, ColumnValue>> {
        match table {
            Table::RawData => &self.raw_data,
            Table::BaseRates => &self.base_rates,
            Table::RateAggregations => &self.rate_aggregations,
            Table::StatAggregations => &self.stat_aggregations,
        }
    }
}

enum QueuedWrite {
    Raw { key: String, ts_ms: i64, json_value: String },
    Rate { key: String, ts_ms: i64, val_delta: i64, valid_delta: i64 },
    Agg { key: String, ts_ms: i64, val_delta: i64, base_freq: u64, count_delta: i64 },
    Stat { key: String, ts_ms: i64, fields: StatFields },
}

/// An in-memory [`StoreAdapter`]. Writes queue in per-table [`Batch`]es of
/// `batch_capacity` entries, exactly as the scylla-backed adapter does,
/// except draining applies directly to the in-memory tables rather than
/// issuing a network round trip.
pub struct MockStoreAdapter {
    tables: Mutex<Tables>,
    queue: Mutex<Batch<QueuedWrite>>,
    schema_ready: AtomicBool,
    closed: AtomicBool,
}

impl MockStoreAdapter {
    pub fn new(batch_capacity: usize) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            queue: Mutex::new(Batch::new(batch_capacity)),
            schema_ready: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return ClosedSnafu.fail();
        }
        Ok(())
    }

    async fn enqueue(&self, write: QueuedWrite) -> Result<()> {
        self.ensure_open()?;
        let full = {
            let mut queue = self.queue.lock().await;
            queue.add(write)
        };
        if full {
            self.drain_queue().await;
        }
        Ok(())
    }

    async fn drain_queue(&self) {
        let drained = {
            let mut queue = self.queue.lock().await;
            queue.drain()
        };
        if drained.is_empty() {
            return;
        }
        let mut tables = self.tables.lock().await;
        for write in drained {
            apply_write(&mut tables, write);
        }
    }
}

fn apply_write(tables: &mut Tables, write: QueuedWrite) {
    match write {
        QueuedWrite::Raw { key, ts_ms, json_value } => {
            tables
                .table_mut(Table::RawData)
                .entry(key)
                .or_default()
                .insert(ts_ms, ColumnValue::Raw(json_value));
        }
        QueuedWrite::Rate { key, ts_ms, val_delta, valid_delta } => {
            let entry = tables
                .table_mut(Table::BaseRates)
                .entry(key)
                .or_default()
                .entry(ts_ms)
                .or_insert(ColumnValue::Rate { val: 0, is_valid: 0 });
            if let ColumnValue::Rate { val, is_valid } = entry {
                *val += val_delta;
                *is_valid += valid_delta;
            }
        }
        QueuedWrite::Agg { key, ts_ms, val_delta, base_freq, count_delta } => {
            let entry = tables
                .table_mut(Table::RateAggregations)
                .entry(key)
                .or_default()
                .entry(ts_ms)
                .or_insert(ColumnValue::Aggregation { val: 0, base_freq, count: 0 });
            if let ColumnValue::Aggregation { val, count, .. } = entry {
                *val += val_delta;
                *count += count_delta;
            }
        }
        QueuedWrite::Stat { key, ts_ms, fields } => {
            let entry = tables
                .table_mut(Table::StatAggregations)
                .entry(key)
                .or_default()
                .entry(ts_ms)
                .or_insert(ColumnValue::Stat(StatFields::default()));
            if let ColumnValue::Stat(existing) = entry {
                if fields.min.is_some() {
                    existing.min = fields.min;
                }
                if fields.max.is_some() {
                    existing.max = fields.max;
                }
                if fields.min_ts.is_some() {
                    existing.min_ts = fields.min_ts;
                }
                if fields.max_ts.is_some() {
                    existing.max_ts = fields.max_ts;
                }
            }
        }
    }
}

#[async_trait]
impl StoreAdapter for MockStoreAdapter {
    async fn ensure_schema(&self) -> Result<()> {
        self.ensure_open()?;
        self.schema_ready.store(true, Ordering::Release);
        Ok(())
    }

    async fn insert_raw(&self, key: &RowKey, ts_ms: i64, json_value: &str, _ttl_secs: Option<u32>) -> Result<()> {
        self.enqueue(QueuedWrite::Raw { key: key.to_string(), ts_ms, json_value: json_value.to_string() }).await
    }

    async fn increment_rate(&self, key: &RowKey, ts_ms: i64, val_delta: i64, valid_delta: i64) -> Result<()> {
        self.enqueue(QueuedWrite::Rate { key: key.to_string(), ts_ms, val_delta, valid_delta }).await
    }

    async fn increment_agg(
        &self,
        key: &RowKey,
        ts_ms: i64,
        val_delta: i64,
        base_freq: u64,
        count_delta: i64,
    ) -> Result<()> {
        self.enqueue(QueuedWrite::Agg { key: key.to_string(), ts_ms, val_delta, base_freq, count_delta }).await
    }

    async fn put_stat(&self, key: &RowKey, ts_ms: i64, fields: StatFields) -> Result<()> {
        self.enqueue(QueuedWrite::Stat { key: key.to_string(), ts_ms, fields }).await
    }

    async fn multi_range(
        &self,
        table: Table,
        keys: &[String],
        col_start: i64,
        col_finish: i64,
        reversed: bool,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Vec<Column>)>> {
        self.ensure_open()?;
        self.drain_queue().await;
        let tables = self.tables.lock().await;
        let by_key = tables.table(table);

        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(columns) = by_key.get(key) else {
                continue;
            };
            let mut slice: Vec<Column> = columns
                .range(col_start..=col_finish)
                .map(|(ts, value)| Column { ts_ms: *ts, value: value.clone() })
                .collect();
            if reversed {
                slice.reverse();
            }
            if let Some(limit) = limit {
                slice.truncate(limit);
            }
            if !slice.is_empty() {
                out.push((key.clone(), slice));
            }
        }
        Ok(out)
    }

    async fn point_super(&self, table: Table, key: &RowKey, ts_ms: i64) -> Result<Option<Column>> {
        self.ensure_open()?;
        self.drain_queue().await;
        let tables = self.tables.lock().await;
        Ok(tables
            .table(table)
            .get(key)
            .and_then(|columns| columns.get(&ts_ms))
            .map(|value| Column { ts_ms, value: value.clone() }))
    }

    async fn flush(&self) -> Result<()> {
        self.ensure_open()?;
        self.drain_queue().await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.flush().await?;
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl AdminStore for MockStoreAdapter {
    async fn drop_keyspace_for_testing(&self) -> Result<()> {
        self.ensure_open()?;
        let mut tables = self.tables.lock().await;
        *tables = Tables::default();
        self.schema_ready.store(false, Ordering::Release);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_then_range_round_trips() {
        let store = MockStoreAdapter::new(200);
        store.ensure_schema().await.unwrap();
        store.insert_raw("r1:2024", 1_000, "42", None).await.unwrap();
        store.flush().await.unwrap();

        let rows = store
            .multi_range(Table::RawData, &["r1:2024".to_string()], 0, 2_000, false, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1[0].value, ColumnValue::Raw("42".to_string()));
    }

    #[tokio::test]
    async fn counter_increments_accumulate() {
        let store = MockStoreAdapter::new(200);
        store.increment_rate("r1:30000:2024", 1_020_000, 30_000, 1).await.unwrap();
        store.increment_rate("r1:30000:2024", 1_020_000, 0, 0).await.unwrap();
        store.flush().await.unwrap();

        let point = store.point_super(Table::BaseRates, "r1:30000:2024", 1_020_000).await.unwrap().unwrap();
        assert_eq!(point.value, ColumnValue::Rate { val: 30_000, is_valid: 1 });
    }

    #[tokio::test]
    async fn batch_autoflushes_at_capacity() {
        let store = MockStoreAdapter::new(2);
        store.insert_raw("r1:2024", 1, "1", None).await.unwrap();
        store.insert_raw("r1:2024", 2, "2", None).await.unwrap();
        // No explicit flush: the second insert filled the batch.
        let rows = store
            .multi_range(Table::RawData, &["r1:2024".to_string()], 0, 10, false, None)
            .await
            .unwrap();
        assert_eq!(rows[0].1.len(), 2);
    }

    #[tokio::test]
    async fn closed_adapter_rejects_writes() {
        let store = MockStoreAdapter::new(200);
        store.close().await.unwrap();
        assert!(store.insert_raw("r1:2024", 1, "1", None).await.is_err());
    }
}
