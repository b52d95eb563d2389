//! CLI utilities for binaries
//!
//! Resolves which configuration file to load and loads it.

use anyhow::Context;
use std::path::{Path, PathBuf};

use orderbook::infrastructure::config::OrderBookConfig;

/// Environment variable that points at the config file
pub const CONFIG_PATH_ENV: &str = "ORDERBOOK_CONFIG_PATH";

/// Which configuration file to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Shared workspace config (config/orderbook.yaml)
    Main,
    /// Explicit path, e.g. from the command line
    Custom(String),
}

impl ConfigType {
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Main => "config/orderbook.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Environment variable that overrides the default path.
    /// An explicit path is never overridden.
    pub fn env_var_name(&self) -> Option<&str> {
        match self {
            ConfigType::Main => Some(CONFIG_PATH_ENV),
            ConfigType::Custom(_) => None,
        }
    }
}

/// Config path from the environment, or the default for `config_type`
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    config_type
        .env_var_name()
        .and_then(|name| std::env::var(name).ok())
        .unwrap_or_else(|| config_type.default_path().to_string())
        .into()
}

/// Command line arguments, excluding the program name
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// First positional argument wins, then `ORDERBOOK_CONFIG_PATH`, then the default
pub fn resolve_config_path(args: &[String]) -> PathBuf {
    let config_type = match args.first() {
        Some(path) => ConfigType::Custom(path.clone()),
        None => ConfigType::Main,
    };
    load_config_from_env(config_type)
}

/// Load, override from env and validate
pub fn load_config(path: &Path) -> anyhow::Result<OrderBookConfig> {
    OrderBookConfig::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
