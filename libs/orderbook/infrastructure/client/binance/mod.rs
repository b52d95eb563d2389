//! Binance spot depth feed

pub mod recorder;
pub mod types;

pub use recorder::{OrderBookRecorder, RecorderError, RecorderState, StoredRow};
pub use types::{BinanceMessage, DepthMessage, DepthSnapshot};
