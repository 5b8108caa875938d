//! Error kinds for the store adapter (§7 "Error kinds").

use generic_error::GenericError;
use macros::define_result;
use snafu::{Backtrace, Snafu};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Failed to connect to store, servers:{servers:?}, err:{source}"))]
    Connect { servers: Vec<String>, source: GenericError },

    #[snafu(display(
        "Bounded retry exhausted on {op}, key:{key}, attempts:{attempts}, err:{source}\nBacktrace:\n{backtrace}"
    ))]
    RetryExhausted {
        op: &'static str,
        key: String,
        attempts: u32,
        source: GenericError,
        backtrace: Backtrace,
    },

    #[snafu(display("Unexpected column family layout, table:{table}, detail:{detail}"))]
    SchemaDrift { table: &'static str, detail: String },

    #[snafu(display("Failed to encode value for key:{key}, err:{source}"))]
    Encode { key: String, source: GenericError },

    #[snafu(display("Failed to decode value for key:{key}, err:{source}"))]
    Decode { key: String, source: GenericError },

    #[snafu(display("Store adapter already closed"))]
    Closed,
}

define_result!(Error);
