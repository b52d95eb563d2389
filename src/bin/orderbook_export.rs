//! Export the newest snapshot rows to CSV
//!
//! Usage:
//!   cargo run --bin orderbook-export [config.yaml]

use anyhow::Result;
use tracing::{info, warn};

use orderbook::infrastructure::config::OrderBookConfig;
use orderbook::infrastructure::export::export_newest;
use orderbook::ClickHouseClient;
use orderbook_dashboard::bin_common::{
    load_config, parse_args, resolve_config_path, BinaryRunner, RunConfig,
};

struct ExportBinary {
    run_config: RunConfig,
    config: OrderBookConfig,
}

impl BinaryRunner for ExportBinary {
    async fn run(&mut self) -> Result<()> {
        let client = ClickHouseClient::new(&self.config.clickhouse)?;

        match export_newest(&client, &self.config.table, &self.config.export).await? {
            Some(count) => info!(
                "Exported {} rows to {}",
                count, self.config.export.output_path
            ),
            None => warn!("No rows returned from ClickHouse, nothing written"),
        }

        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn app_config(&self) -> &OrderBookConfig {
        &self.config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = resolve_config_path(&parse_args());
    let config = load_config(&config_path)?;

    let run_config = RunConfig::new("orderbook-export", &config_path);
    run_config.init_logging(&config.log_level)?;

    ExportBinary { run_config, config }.execute().await
}
