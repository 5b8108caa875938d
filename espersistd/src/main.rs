//! The time-series persistence daemon: loads configuration, connects to the
//! store backend, ensures schema, and hosts the persister/query-planner
//! facades for the (out-of-scope) REST layer to embed.
//!
//! This binary does not itself speak SNMP or HTTP (§1 "Out of scope") — it
//! is the process boundary around the core: config, logging, and backend
//! lifecycle.

mod config;

use std::path::PathBuf;

use clap::Parser;
use config::Config;
use logger::info;
use persister::Persister;
use query_planner::QueryPlanner;
use store_kv::{MockStoreAdapter, ScyllaStoreAdapter, StoreAdapter};

#[derive(Parser)]
#[command(name = "espersistd")]
#[command(about = "Time-series storage and aggregation core daemon")]
struct Cli {
    /// Path to a TOML configuration file; defaults compiled in if omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run against an in-memory store instead of connecting to a cluster,
    /// for local smoke-testing.
    #[arg(long)]
    in_memory: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&raw)?)
        }
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    logger::init_log(&config.log);

    let store: Box<dyn StoreAdapter> = if cli.in_memory {
        info!("starting with in-memory store adapter");
        Box::new(MockStoreAdapter::new(config.cassandra.batch_capacity))
    } else {
        info!("connecting to cassandra cluster, servers:{:?}", config.cassandra.servers);
        Box::new(ScyllaStoreAdapter::connect(config.cassandra.clone()).await?)
    };
    store.ensure_schema().await?;

    let persister = Persister::new(config.persister.clone());
    let planner = QueryPlanner::new(config.query.clone());
    // `persister` and `planner` are the facade this process hosts; the
    // SNMP front-end and REST layer (§1) drive them from outside this
    // crate. Block here until shut down so schema setup and connection
    // bring-up is the only observable behavior of the standalone binary.
    let _ = (&persister, &planner);

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    store.close().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses_from_empty_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.cassandra.keyspace, "esmond");
        assert_eq!(config.persister.delta_sanity_factor, 40);
        assert_eq!(config.query.query_limit_pad, 5);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let toml = r#"
            [cassandra]
            keyspace = "custom"

            [persister]
            delta_sanity_factor = 10
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cassandra.keyspace, "custom");
        assert_eq!(config.persister.delta_sanity_factor, 10);
        // Untouched sections keep their defaults.
        assert_eq!(config.query.query_limit_pad, 5);
    }
}
