//! Order Book Dashboard - Main Library
//!
//! ## Architecture
//!
//! - **bin_common**: shared helpers for the binaries (config path, runner)
//! - **orderbook**: core library (re-exported from the workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use orderbook_dashboard::bin_common::{load_config, resolve_config_path};
//! use orderbook_dashboard::orderbook::OrderBookViewBuilder;
//! ```

pub use orderbook;

pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config, load_config_from_env, parse_args, resolve_config_path, ConfigType};
    pub use runner::{BinaryRunner, RunConfig};
}
