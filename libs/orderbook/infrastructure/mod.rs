//! Infrastructure Layer
//!
//! Implementations of external interfaces (ClickHouse, Binance, files).
//! Depends on the domain layer but not on the application layer.

pub mod cache;
pub mod clickhouse;
pub mod client;
pub mod config;
pub mod export;
pub mod logging;
pub mod source;

pub use cache::{CacheEntry, CacheStats, TtlCache};
pub use clickhouse::{ClickHouseClient, ClickHouseError, QueryWindow};
pub use client::binance::{OrderBookRecorder, RecorderError};
pub use config::{ConfigError, OrderBookConfig};
pub use export::{export_newest, ExportError};
pub use logging::{init_tracing, init_tracing_with_file, init_tracing_with_level};
pub use source::{CachedSource, ClickHouseSource, OrderBookSource, SourceError};
