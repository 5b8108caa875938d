//! A thin typed façade over a wide-column key/value store (§4.2 "Store
//! Adapter"): batched inserts, counter increments, range slices, and point
//! reads across the four logical tables defined in §3.

pub mod adapter;
pub mod batch;
pub mod error;
pub mod mock;
pub mod retry;
pub mod scylla_adapter;
pub mod table;

pub use adapter::StoreAdapter;
pub use error::Error;
pub use mock::MockStoreAdapter;
pub use scylla_adapter::{ScyllaConfig, ScyllaStoreAdapter};
pub use table::{Column, ColumnValue, Table};

use async_trait::async_trait;

/// Test-only administrative operations, kept off the main [`StoreAdapter`]
/// contract so they can never be reached from the ingestion/query hot path
/// (§9 "Per-instance test-only code paths... route via a dedicated admin
/// interface, not as a constructor option").
#[async_trait]
pub trait AdminStore: StoreAdapter {
    async fn drop_keyspace_for_testing(&self) -> error::Result<()>;
}
