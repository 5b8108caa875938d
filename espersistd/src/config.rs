//! The daemon's root configuration: one deserializable struct nesting each
//! component's own config (§6 "Configuration surface, expanded"), loaded
//! from a single TOML file.

use serde::{Deserialize, Serialize};
use store_kv::ScyllaConfig;

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Config {
    pub cassandra: ScyllaConfig,
    pub persister: persister::Config,
    pub query: query_planner::Config,
    pub log: logger::Config,
}
