use macros::define_result;
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Store adapter error while {op}, err:{source}"))]
    Store { op: &'static str, source: store_kv::Error },
}

define_result!(Error);
