//! The query planner (§2 component 6, §4.6): reassembles a bounded-range
//! query across year shards and applies the requested read-time
//! consolidation to whichever of the three aggregated tables (or raw data)
//! the caller asks for.

pub mod config;
pub mod error;
pub mod planner;

pub use config::Config;
pub use error::{Error, Result};
pub use planner::{QueryPlanner, QueryPoint, QueryValue};
