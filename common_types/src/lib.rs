//! Core value types shared by the store adapter, persister, and query
//! planner: series identity, raw samples, bin records, and the consolidation
//! functions applied at read time.

pub mod bin;
pub mod consolidation;
pub mod error;
pub mod sample;
pub mod series;
pub mod slot;

pub use bin::{AggregationBin, RateBin, StatBin, StatFields};
pub use consolidation::Consolidation;
pub use error::{Error, Result};
pub use sample::RawSample;
pub use series::{Series, SeriesPath};

/// Milliseconds since the Unix epoch. Columns in every logical table are
/// keyed by a value of this type (§3 "Columns are 64-bit millisecond
/// timestamps").
pub type TimestampMs = i64;

/// Sample frequency in milliseconds, e.g. `30000` for a 30s polling interval.
pub type FreqMs = u64;

/// The sentinel written to `base_rates.is_valid` for a normally-derived bin.
pub const IS_VALID_OK: i64 = 1;

/// The sentinel written to `base_rates.is_valid` for a bin that held a
/// counter reset/wrap/outlier delta and so carries no `val` contribution.
///
/// §9 notes this value (and `IS_VALID_OK`) are opaque to consumers other than
/// "zero means no contribution yet"; they are preserved for bug-for-bug
/// compatibility with the system this core was distilled from.
pub const IS_VALID_INVALID: i64 = 2;
