//! Configuration for the dashboard, recorder and tools
//!
//! One YAML file drives every binary. Connection credentials may be
//! overridden from the environment (`.env` is loaded first).

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::domain::SpreadPolicy;
use crate::infrastructure::clickhouse::{is_valid_identifier, QueryWindow};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variables that override the `clickhouse` section
pub const ENV_CLICKHOUSE_URL: &str = "CLICKHOUSE_URL";
pub const ENV_CLICKHOUSE_USER: &str = "CLICKHOUSE_USER";
pub const ENV_CLICKHOUSE_PASSWORD: &str = "CLICKHOUSE_PASSWORD";

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Root configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookConfig {
    /// Snapshot table name
    pub table: String,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub clickhouse: ClickHouseConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub binance: BinanceConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickHouseConfig {
    /// HTTP interface base URL
    pub url: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub timeout_secs: u64,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".to_string(),
            user: "default".to_string(),
            password: String::new(),
            database: "default".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub refresh_interval_secs: u64,
    /// Lookback of the dashboard query
    pub window_minutes: u32,
    /// Raw rows shown in the preview table
    pub preview_rows: usize,
    /// TTL of memoized query results. Defaults to the refresh interval.
    pub cache_ttl_secs: Option<u64>,
    pub spread_policy: SpreadPolicy,
    /// Log file for the dashboard (stdout belongs to the terminal UI)
    pub log_file: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 5,
            window_minutes: 10,
            preview_rows: 100,
            cache_ttl_secs: None,
            spread_policy: SpreadPolicy::FirstSeen,
            log_file: "logs/dashboard.log".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.unwrap_or(self.refresh_interval_secs))
    }

    pub fn query_window(&self) -> QueryWindow {
        QueryWindow::last_minutes(self.window_minutes)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    /// WebSocket base URL; the stream name is appended
    pub ws_url: String,
    /// REST depth snapshot URL used to seed the book
    pub rest_url: String,
    /// Stream name, e.g. `btcusdt@depth`
    pub trade_pair: String,
    /// Levels per side written on each insert
    pub num_levels: usize,
    /// true = store base quantity, false = store price × quantity
    pub base_volume: bool,
    pub platform: String,
    /// Minimum spacing between inserts
    pub insert_interval_ms: u64,
    /// Column timezone used when creating the table
    pub timezone: String,
    pub log_file: String,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            ws_url: "wss://stream.binance.com:9443/ws/".to_string(),
            rest_url: "https://api.binance.com/api/v3/depth?symbol=BTCUSDT&limit=100".to_string(),
            trade_pair: "btcusdt@depth".to_string(),
            num_levels: 10,
            base_volume: true,
            platform: "Binance".to_string(),
            insert_interval_ms: 1000,
            timezone: "Europe/London".to_string(),
            log_file: "logs/binance.log".to_string(),
        }
    }
}

impl BinanceConfig {
    pub fn stream_url(&self) -> String {
        format!("{}{}", self.ws_url, self.trade_pair)
    }

    pub fn insert_interval(&self) -> Duration {
        Duration::from_millis(self.insert_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub output_path: String,
    /// Newest rows to export
    pub limit: usize,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: "exports/orderbook_dump.csv".to_string(),
            limit: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub limit: usize,
    pub preview_rows: usize,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            preview_rows: 20,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl OrderBookConfig {
    /// Load configuration from YAML file, `.env` and environment
    pub fn load(config_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_content = std::fs::read_to_string(config_path)?;

        // Don't fail if .env doesn't exist
        dotenv::dotenv().ok();

        let mut config = Self::from_yaml_str(&yaml_content)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Parse without environment overrides or validation
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Override ClickHouse connection settings from a key lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_CLICKHOUSE_URL) {
            info!("Overriding ClickHouse URL from environment variable");
            self.clickhouse.url = url;
        }
        if let Some(user) = lookup(ENV_CLICKHOUSE_USER) {
            self.clickhouse.user = user;
        }
        if let Some(password) = lookup(ENV_CLICKHOUSE_PASSWORD) {
            self.clickhouse.password = password;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !is_valid_identifier(&self.table) {
            return Err(ConfigError::ValidationError(format!(
                "table '{}' must be a non-empty identifier of [A-Za-z0-9_.]",
                self.table
            )));
        }

        if !self.clickhouse.url.starts_with("http://") && !self.clickhouse.url.starts_with("https://") {
            return Err(ConfigError::ValidationError(
                "clickhouse.url must start with http:// or https://".to_string(),
            ));
        }

        if self.dashboard.refresh_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "dashboard.refresh_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.dashboard.window_minutes == 0 {
            return Err(ConfigError::ValidationError(
                "dashboard.window_minutes must be greater than 0".to_string(),
            ));
        }

        if self.binance.num_levels == 0 {
            return Err(ConfigError::ValidationError(
                "binance.num_levels must be greater than 0".to_string(),
            ));
        }

        if self.binance.insert_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "binance.insert_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.export.limit == 0 || self.debug.limit == 0 {
            return Err(ConfigError::ValidationError(
                "export.limit and debug.limit must be greater than 0".to_string(),
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "log_level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Log configuration summary
    pub fn log(&self) {
        info!("Configuration loaded:");
        info!("  Table: {}", self.table);
        info!("  ClickHouse: {} (db: {}, user: {})", self.clickhouse.url, self.clickhouse.database, self.clickhouse.user);
        info!("  Refresh interval: {} seconds", self.dashboard.refresh_interval_secs);
        info!("  Window: last {} minutes", self.dashboard.window_minutes);
        info!("  Spread policy: {}", self.dashboard.spread_policy);
        info!("  Log level: {}", self.log_level);
    }
}
