//! Error kinds owned by `common_types` itself (§7 "Each crate defines its
//! own `Error` enum").

use macros::define_result;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Unrecognized consolidation name, input:{input}"))]
    ParseConsolidation { input: String },
}

define_result!(Error);
