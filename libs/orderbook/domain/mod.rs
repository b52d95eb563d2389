//! Domain Layer
//!
//! Pure order-book entities and the view-shaping pipeline.
//! This layer has no dependencies on infrastructure or application layers.

pub mod book;
pub mod row;
pub mod views;

pub use book::{LocalOrderBook, OrderbookSide};
pub use row::{decode_batch, OrderBookRow, OrderType, SchemaError, REQUIRED_FIELDS, TIMESTAMP_MS_FIELD};
pub use views::{
    OrderBookViewBuilder, OrderBookViews, SpreadPoint, SpreadPolicy, VolumeKey, VolumeMatrix,
};
