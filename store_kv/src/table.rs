//! The four logical column families exposed by the store adapter (§3).

use common_types::StatFields;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    RawData,
    BaseRates,
    RateAggregations,
    StatAggregations,
}

impl Table {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RawData => "raw_data",
            Self::BaseRates => "base_rates",
            Self::RateAggregations => "rate_aggregations",
            Self::StatAggregations => "stat_aggregations",
        }
    }
}

/// The value found at one column, typed per the owning table's shape (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    /// `raw_data`: the JSON scalar as received.
    Raw(String),
    /// `base_rates`: the two counter sub-columns.
    Rate { val: i64, is_valid: i64 },
    /// `rate_aggregations`: the summed value and the count sub-column named
    /// after `base_freq`.
    Aggregation { val: i64, base_freq: u64, count: i64 },
    /// `stat_aggregations`: whichever of `{min, max, min_ts, max_ts}` are
    /// present.
    Stat(StatFields),
}

/// A single column read back from a `multi_range`/`point_super` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub ts_ms: i64,
    pub value: ColumnValue,
}
