//! Binary runner utilities
//!
//! Standard banner, logging and shutdown handling for the non-interactive
//! binaries.

use std::path::PathBuf;
use tracing::info;

use orderbook::infrastructure::config::OrderBookConfig;

/// How a binary sets itself up
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// Where the config was loaded from
    pub config_path: PathBuf,
    /// Optional log file in addition to the console
    pub log_file: Option<String>,
}

impl RunConfig {
    pub fn new(name: impl Into<String>, config_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            config_path: config_path.into(),
            log_file: None,
        }
    }

    pub fn with_log_file(mut self, path: impl Into<String>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    /// Install the tracing subscriber at `level`
    pub fn init_logging(&self, level: &str) -> anyhow::Result<()> {
        match &self.log_file {
            Some(path) => orderbook::init_tracing_with_file(level, path, true)?,
            None => orderbook::init_tracing_with_level(level),
        }
        Ok(())
    }
}

/// Implement this for each non-interactive binary
pub trait BinaryRunner {
    /// Run the application
    async fn run(&mut self) -> anyhow::Result<()>;

    fn config(&self) -> &RunConfig;

    fn app_config(&self) -> &OrderBookConfig;

    fn print_banner(&self) {
        let config = self.config();
        info!("========================================");
        info!("Starting {}", config.name);
        info!("Config: {}", config.config_path.display());
        info!("========================================");
        self.app_config().log();
    }

    fn print_shutdown(&self, result: &anyhow::Result<()>) {
        let config = self.config();
        info!("========================================");
        match result {
            Ok(()) => info!("{} finished", config.name),
            Err(e) => info!("{} failed: {:#}", config.name, e),
        }
        info!("========================================");
    }

    /// Banner, run, shutdown banner
    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        let result = self.run().await;
        self.print_shutdown(&result);
        result
    }
}
