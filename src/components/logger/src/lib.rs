//! Thin logging façade so the rest of the workspace depends on one crate
//! instead of wiring `env_logger` at every binary entry point.
//!
//! Re-exports the `log` macros so call sites write `logger::{debug, info,
//! warn, error}` the same way they'd write `log::{debug, ...}`.

pub use log::{debug, error, info, trace, warn};

use serde::{Deserialize, Serialize};

/// Log level, deserializable from a config file as a lowercase string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<Level> for log::LevelFilter {
    fn from(level: Level) -> Self {
        match level {
            Level::Trace => log::LevelFilter::Trace,
            Level::Debug => log::LevelFilter::Debug,
            Level::Info => log::LevelFilter::Info,
            Level::Warn => log::LevelFilter::Warn,
            Level::Error => log::LevelFilter::Error,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub level: Level,
}

impl Default for Config {
    fn default() -> Self {
        Self { level: Level::Info }
    }
}

/// Initialize the global logger. Safe to call more than once; subsequent
/// calls are no-ops (mirrors `env_logger`'s own idempotence).
pub fn init_log(config: &Config) {
    let _ = env_logger::Builder::new()
        .filter_level(config.level.into())
        .format_timestamp_millis()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_maps_to_filter() {
        assert_eq!(log::LevelFilter::from(Level::Warn), log::LevelFilter::Warn);
    }

    #[test]
    fn default_level_is_info() {
        assert_eq!(Config::default().level, Level::Info);
    }
}
