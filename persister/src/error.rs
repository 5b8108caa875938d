use macros::define_result;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Store adapter error while {op}, err:{source}"))]
    Store { op: &'static str, source: store_kv::Error },

    #[snafu(display("Failed to decode raw_data value as a JSON integer, value:{value}, err:{source}"))]
    DecodeRawValue { value: String, source: serde_json::Error },
}

define_result!(Error);
