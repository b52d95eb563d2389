//! Order book recorder
//!
//! Streams the Binance depth feed into the ClickHouse snapshot table, writing
//! the top levels of each side at most once per insert interval.
//!
//! Usage:
//!   cargo run --bin orderbook-recorder [config.yaml]

use anyhow::Result;

use orderbook::infrastructure::client::binance::OrderBookRecorder;
use orderbook::infrastructure::config::OrderBookConfig;
use orderbook::{ClickHouseClient, ShutdownManager};
use orderbook_dashboard::bin_common::{
    load_config, parse_args, resolve_config_path, BinaryRunner, RunConfig,
};

struct RecorderBinary {
    run_config: RunConfig,
    config: OrderBookConfig,
    shutdown: ShutdownManager,
}

impl BinaryRunner for RecorderBinary {
    async fn run(&mut self) -> Result<()> {
        let client = ClickHouseClient::new(&self.config.clickhouse)?;
        let mut recorder =
            OrderBookRecorder::new(self.config.binance.clone(), self.config.table.clone(), client);

        recorder.run(self.shutdown.flag()).await?;
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

    let run_config = RunConfig::new("orderbook-recorder", &config_path)
        .with_log_file(config.binance.log_file.clone());
    run_config.init_logging(&config.log_level)?;

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    RecorderBinary {
        run_config,
        config,
        shutdown,
    }
    .execute()
    .await
}
