//! Order Book Dashboard
//!
//! Records Binance order-book snapshots into ClickHouse and shapes them into
//! dashboard views: spread over time and an average-volume heatmap.
//!
//! ## Layers
//!
//! - **domain**: rows, schema decoding, view builder, local order book
//! - **infrastructure**: config, logging, ClickHouse, sources, cache, export, Binance
//! - **application**: refresh task and terminal dashboard
//! - **utils**: shutdown and heartbeat helpers

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod utils;

pub use domain::{
    decode_batch, OrderBookRow, OrderBookViewBuilder, OrderBookViews, OrderType, SchemaError,
    SpreadPoint, SpreadPolicy, VolumeMatrix,
};
pub use infrastructure::{
    init_tracing, init_tracing_with_file, init_tracing_with_level, CachedSource, ClickHouseClient,
    ClickHouseSource, OrderBookConfig, OrderBookSource, QueryWindow,
};
pub use utils::{Heartbeat, ShutdownManager};
