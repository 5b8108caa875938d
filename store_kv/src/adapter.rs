//! The Store Adapter public contract (§4.2): a thin typed façade over a
//! wide-column store offering batched inserts, counter increments, range
//! slices, and point reads.

use async_trait::async_trait;
use common_types::StatFields;

use crate::{
    error::Result,
    table::{Column, Table},
};

/// A row-shard key, e.g. `"snmp:router1:30000:2024"` — opaque to the
/// adapter, produced by `path_codec`/`common_types::Series`.
pub type RowKey = str;

#[async_trait]
pub trait StoreAdapter: Send + Sync {
    /// Idempotent: creates the keyspace and four column families if absent
    /// (comparator=long, key=utf8; counter type for `base_rates` and
    /// `rate_aggregations`; plain long for `stat_aggregations`). Blocks
    /// until schema propagation completes.
    async fn ensure_schema(&self) -> Result<()>;

    /// Queues a `raw_data` write; flushed once the table's batch reaches its
    /// configured size or `flush()` is called explicitly.
    async fn insert_raw(&self, key: &RowKey, ts_ms: i64, json_value: &str, ttl_secs: Option<u32>) -> Result<()>;

    /// Queues a counter increment on `base_rates`.
    async fn increment_rate(&self, key: &RowKey, ts_ms: i64, val_delta: i64, valid_delta: i64) -> Result<()>;

    /// Queues a counter increment on `rate_aggregations`.
    async fn increment_agg(
        &self,
        key: &RowKey,
        ts_ms: i64,
        val_delta: i64,
        base_freq: u64,
        count_delta: i64,
    ) -> Result<()>;

    /// A plain (non-counter) write of a subset of `stat_aggregations`
    /// fields.
    async fn put_stat(&self, key: &RowKey, ts_ms: i64, fields: StatFields) -> Result<()>;

    /// A multi-row range slice bounded by `[col_start, col_finish]` and an
    /// optional result limit, across however many row-shard keys the caller
    /// supplies.
    #[allow(clippy::too_many_arguments)]
    async fn multi_range(
        &self,
        table: Table,
        keys: &[String],
        col_start: i64,
        col_finish: i64,
        reversed: bool,
        limit: Option<usize>,
    ) -> Result<Vec<(String, Vec<Column>)>>;

    /// Fetches a single column (a "super column" in the source's wide-row
    /// model) at an exact timestamp.
    async fn point_super(&self, table: Table, key: &RowKey, ts_ms: i64) -> Result<Option<Column>>;

    /// Drains all per-table batch buffers synchronously.
    async fn flush(&self) -> Result<()>;

    /// Disposes of connections. No further calls are valid afterward.
    async fn close(&self) -> Result<()>;
}
