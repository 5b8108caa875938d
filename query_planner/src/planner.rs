//! Query Planner (§4.6): reassembles samples across whatever year-shards a
//! `[t_min, t_max]` range spans and applies the requested read-time
//! consolidation.

use common_types::{Consolidation, FreqMs, Series, SeriesPath, TimestampMs};
use logger::error;
use snafu::ResultExt;
use store_kv::{Column, ColumnValue, StoreAdapter, Table};
use time_ext::year_of_millis;

use crate::{
    config::Config,
    error::{Result, StoreSnafu},
};

/// One reduced sample as returned to the REST layer (§6 "Query interface").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryPoint {
    pub ts: TimestampMs,
    pub value: QueryValue,
}

/// The shape of a reduced sample, varying by table and consolidation. A
/// closed set of variants per §9 ("re-express as closed record types...
/// tagged variants only where the source carries a `cf` field").
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryValue {
    /// `raw`/`delta`/`average` consolidations: a single reduced number.
    Scalar(f64),
    /// `min`/`max` consolidation: the extreme value plus the raw timestamp
    /// that produced it.
    Extremum { value: i64, at: TimestampMs },
    /// `raw` consolidation on `stat_aggregations`: the bin exactly as
    /// stored.
    Stat { min: Option<i64>, max: Option<i64>, min_ts: Option<TimestampMs>, max_ts: Option<TimestampMs> },
}

pub struct QueryPlanner {
    config: Config,
}

impl QueryPlanner {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn query_raw(
        &self,
        store: &dyn StoreAdapter,
        path: &SeriesPath,
        t_min: TimestampMs,
        t_max: TimestampMs,
        limit: Option<usize>,
    ) -> Result<Vec<QueryPoint>> {
        let keys = year_shards(t_min, t_max).into_iter().map(|year| path.raw_row_key(year)).collect::<Vec<_>>();
        let cols = self.ranged(store, Table::RawData, &keys, t_min, t_max, limit).await?;
        Ok(cols.into_iter().filter_map(raw_point).collect())
    }

    pub async fn query_base_rate(
        &self,
        store: &dyn StoreAdapter,
        path: &SeriesPath,
        freq: FreqMs,
        t_min: TimestampMs,
        t_max: TimestampMs,
        consolidation: Consolidation,
        limit: Option<usize>,
    ) -> Result<Vec<QueryPoint>> {
        let consolidation = validate_base_rate_consolidation(consolidation);
        let series = Series::new(path.clone(), freq);
        let keys = year_shards(t_min, t_max).into_iter().map(|year| series.row_key(year)).collect::<Vec<_>>();
        let cols = self.ranged(store, Table::BaseRates, &keys, t_min, t_max, limit).await?;
        Ok(cols.into_iter().filter_map(|c| consolidate_base_rate(&c, freq, consolidation)).collect())
    }

    pub async fn query_aggregation(
        &self,
        store: &dyn StoreAdapter,
        path: &SeriesPath,
        freq: FreqMs,
        t_min: TimestampMs,
        t_max: TimestampMs,
        consolidation: Consolidation,
        limit: Option<usize>,
    ) -> Result<Vec<QueryPoint>> {
        let consolidation = validate_aggregation_consolidation(consolidation);
        let table = aggregation_table(consolidation);
        let series = Series::new(path.clone(), freq);
        let keys = year_shards(t_min, t_max).into_iter().map(|year| series.row_key(year)).collect::<Vec<_>>();
        let cols = self.ranged(store, table, &keys, t_min, t_max, limit).await?;
        Ok(cols.into_iter().filter_map(|c| consolidate_aggregation(&c, consolidation)).collect())
    }

    /// Whether any shard of `table` has any column in `[t_min, t_max]` for
    /// this series — distinguishes "empty range" from "unknown series"
    /// (§4.6).
    pub async fn exists(
        &self,
        store: &dyn StoreAdapter,
        path: &SeriesPath,
        freq: FreqMs,
        t_min: TimestampMs,
        t_max: TimestampMs,
        table: Table,
    ) -> Result<bool> {
        let keys = match table {
            Table::RawData => year_shards(t_min, t_max).into_iter().map(|year| path.raw_row_key(year)).collect(),
            _ => {
                let series = Series::new(path.clone(), freq);
                year_shards(t_min, t_max).into_iter().map(|year| series.row_key(year)).collect()
            }
        };
        let cols = self.ranged(store, table, &keys, t_min, t_max, Some(1)).await?;
        Ok(!cols.is_empty())
    }

    /// §4.6 steps 2-3: an unspecified `limit` is resolved by first issuing
    /// a count-only pass across every shard and padding the sum (§9), then
    /// a second pass bounded by that soft limit; the results are merged
    /// across shards and sorted timestamp-ascending (step 5) before the
    /// final truncation, since each shard is limited independently by the
    /// underlying adapter.
    async fn ranged(
        &self,
        store: &dyn StoreAdapter,
        table: Table,
        keys: &[String],
        t_min: TimestampMs,
        t_max: TimestampMs,
        limit: Option<usize>,
    ) -> Result<Vec<Column>> {
        let effective_limit = match limit {
            Some(l) => l,
            None => {
                let counted = store
                    .multi_range(table, keys, t_min, t_max, false, None)
                    .await
                    .context(StoreSnafu { op: "count pass" })?;
                let total: usize = counted.iter().map(|(_, cols)| cols.len()).sum();
                total + self.config.query_limit_pad
            }
        };

        let rows = store
            .multi_range(table, keys, t_min, t_max, false, Some(effective_limit))
            .await
            .context(StoreSnafu { op: "range pass" })?;

        let mut merged: Vec<Column> = rows.into_iter().flat_map(|(_, cols)| cols).collect();
        merged.sort_by_key(|c| c.ts_ms);
        merged.truncate(effective_limit);
        Ok(merged)
    }
}

fn year_shards(t_min: TimestampMs, t_max: TimestampMs) -> Vec<i32> {
    let y_min = year_of_millis(t_min);
    let y_max = year_of_millis(t_max);
    (y_min..=y_max).collect()
}

fn raw_point(col: Column) -> Option<QueryPoint> {
    let ColumnValue::Raw(json) = col.value else { return None };
    let value: serde_json::Value = serde_json::from_str(&json).ok()?;
    let val = value.as_f64()?;
    Some(QueryPoint { ts: col.ts_ms, value: QueryValue::Scalar(val) })
}

fn consolidate_base_rate(col: &Column, freq: FreqMs, consolidation: Consolidation) -> Option<QueryPoint> {
    let ColumnValue::Rate { val, .. } = &col.value else { return None };
    let value = match consolidation {
        Consolidation::Average => *val as f64 / (freq as f64 / 1000.0),
        Consolidation::Delta => *val as f64,
        _ => unreachable!("validated by validate_base_rate_consolidation"),
    };
    Some(QueryPoint { ts: col.ts_ms, value: QueryValue::Scalar(value) })
}

fn consolidate_aggregation(col: &Column, consolidation: Consolidation) -> Option<QueryPoint> {
    match (&col.value, consolidation) {
        (ColumnValue::Aggregation { val, base_freq, count }, Consolidation::Average) => {
            if *count == 0 {
                return None;
            }
            let avg = *val as f64 / (*count as f64 * (*base_freq as f64 / 1000.0));
            Some(QueryPoint { ts: col.ts_ms, value: QueryValue::Scalar(avg) })
        }
        (ColumnValue::Stat(fields), Consolidation::Min) => {
            fields.min.map(|v| QueryPoint { ts: col.ts_ms, value: QueryValue::Extremum { value: v, at: fields.min_ts.unwrap_or(col.ts_ms) } })
        }
        (ColumnValue::Stat(fields), Consolidation::Max) => {
            fields.max.map(|v| QueryPoint { ts: col.ts_ms, value: QueryValue::Extremum { value: v, at: fields.max_ts.unwrap_or(col.ts_ms) } })
        }
        (ColumnValue::Stat(fields), Consolidation::Raw) => Some(QueryPoint {
            ts: col.ts_ms,
            value: QueryValue::Stat { min: fields.min, max: fields.max, min_ts: fields.min_ts, max_ts: fields.max_ts },
        }),
        _ => None,
    }
}

fn aggregation_table(consolidation: Consolidation) -> Table {
    match consolidation {
        Consolidation::Average => Table::RateAggregations,
        _ => Table::StatAggregations,
    }
}

/// §7 "Invalid consolidation/query argument": substitutes the documented
/// default rather than failing the query.
fn validate_base_rate_consolidation(consolidation: Consolidation) -> Consolidation {
    match consolidation {
        Consolidation::Average | Consolidation::Delta => consolidation,
        other => {
            error!("invalid consolidation {other} for query_base_rate, defaulting to average");
            Consolidation::BASE_RATE_DEFAULT
        }
    }
}

fn validate_aggregation_consolidation(consolidation: Consolidation) -> Consolidation {
    match consolidation {
        Consolidation::Average | Consolidation::Min | Consolidation::Max | Consolidation::Raw => consolidation,
        other => {
            error!("invalid consolidation {other} for query_aggregation, defaulting to average");
            Consolidation::AGGREGATION_DEFAULT
        }
    }
}

#[cfg(test)]
mod tests {
    use common_types::SeriesPath;
    use store_kv::MockStoreAdapter;

    use super::*;

    async fn seeded_store() -> MockStoreAdapter {
        let store = MockStoreAdapter::new(200);
        let series = Series::new(SeriesPath::new(["r1", "ifIn"]), 30_000);
        store.increment_rate(&series.row_key(1970), 1_020_000, 30_000, 1).await.unwrap();
        store.flush().await.unwrap();
        store
    }

    #[tokio::test]
    async fn s1_base_rate_average() {
        let store = seeded_store().await;
        let planner = QueryPlanner::new(Config::default());
        let path = SeriesPath::new(["r1", "ifIn"]);
        let points = planner
            .query_base_rate(&store, &path, 30_000, 1_000_000, 1_030_000, Consolidation::Average, None)
            .await
            .unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].value, QueryValue::Scalar(1000.0));
    }

    #[tokio::test]
    async fn query_raw_s2_round_trip() {
        let store = MockStoreAdapter::new(200);
        let path = SeriesPath::new(["r1", "ifIn"]);
        store.insert_raw(&path.raw_row_key(1970), 1_000_000, "42", None).await.unwrap();
        store.flush().await.unwrap();

        let planner = QueryPlanner::new(Config::default());
        let points = planner.query_raw(&store, &path, 1_000_000, 1_000_000, None).await.unwrap();
        assert_eq!(points, vec![QueryPoint { ts: 1_000_000, value: QueryValue::Scalar(42.0) }]);
    }

    #[tokio::test]
    async fn s5_year_crossing_query_reads_two_shards() {
        let store = MockStoreAdapter::new(200);
        let path = SeriesPath::new(["r1", "ifIn"]);
        // 2023-12-31T23:59:00Z and 2024-01-01T00:01:00Z.
        store.insert_raw(&path.raw_row_key(2023), 1_703_980_740_000, "1", None).await.unwrap();
        store.insert_raw(&path.raw_row_key(2024), 1_704_067_260_000, "2", None).await.unwrap();
        store.flush().await.unwrap();

        let planner = QueryPlanner::new(Config::default());
        let points = planner.query_raw(&store, &path, 1_703_980_740_000, 1_704_067_260_000, None).await.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].ts, 1_703_980_740_000);
        assert_eq!(points[1].ts, 1_704_067_260_000);
    }

    #[tokio::test]
    async fn invalid_consolidation_falls_back_to_average() {
        let store = seeded_store().await;
        let planner = QueryPlanner::new(Config::default());
        let path = SeriesPath::new(["r1", "ifIn"]);
        let points = planner
            .query_base_rate(&store, &path, 30_000, 1_000_000, 1_030_000, Consolidation::Min, None)
            .await
            .unwrap();
        assert_eq!(points[0].value, QueryValue::Scalar(1000.0));
    }

    #[tokio::test]
    async fn exists_distinguishes_empty_range_from_unknown_series() {
        let store = seeded_store().await;
        let planner = QueryPlanner::new(Config::default());
        let path = SeriesPath::new(["r1", "ifIn"]);
        assert!(planner.exists(&store, &path, 30_000, 1_000_000, 1_030_000, Table::BaseRates).await.unwrap());
        assert!(!planner.exists(&store, &path, 30_000, 2_000_000, 2_030_000, Table::BaseRates).await.unwrap());
    }
}
