//! Binance depth message types
//!
//! Covers the REST depth snapshot and both WebSocket depth payloads:
//! diff updates (`<symbol>@depth`, keys `b`/`a`) and partial book
//! snapshots (`<symbol>@depth<N>`, keys `bids`/`asks`).

use serde::Deserialize;
use tracing::debug;

/// Price level as sent by Binance: `["price", "quantity"]`
pub type RawLevel = [String; 2];

// =============================================================================
// DepthSnapshot - REST /api/v3/depth
// =============================================================================

/// Example JSON:
/// ```json
/// {
///     "lastUpdateId": 1027024,
///     "bids": [["4.00000000", "431.00000000"]],
///     "asks": [["4.00000200", "12.00000000"]]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DepthSnapshot {
    #[serde(rename = "lastUpdateId", default)]
    pub last_update_id: u64,
    pub bids: Vec<RawLevel>,
    pub asks: Vec<RawLevel>,
}

impl DepthSnapshot {
    pub fn bid_levels(&self) -> Vec<(f64, f64)> {
        parse_levels(&self.bids)
    }

    pub fn ask_levels(&self) -> Vec<(f64, f64)> {
        parse_levels(&self.asks)
    }
}

// =============================================================================
// DepthMessage - WebSocket depth payload
// =============================================================================

/// Either payload flavour. Quantity "0" means the level was removed.
///
/// Example diff update:
/// ```json
/// {
///     "e": "depthUpdate",
///     "E": 1672515782136,
///     "s": "BTCUSDT",
///     "U": 157,
///     "u": 160,
///     "b": [["0.0024", "10"]],
///     "a": [["0.0026", "100"]]
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DepthMessage {
    #[serde(rename = "e", default)]
    pub event_type: Option<String>,

    /// Event time (ms since epoch), diff updates only
    #[serde(rename = "E", default)]
    pub event_time: Option<u64>,

    #[serde(alias = "b", default)]
    pub bids: Vec<RawLevel>,

    #[serde(alias = "a", default)]
    pub asks: Vec<RawLevel>,
}

impl DepthMessage {
    pub fn bid_levels(&self) -> Vec<(f64, f64)> {
        parse_levels(&self.bids)
    }

    pub fn ask_levels(&self) -> Vec<(f64, f64)> {
        parse_levels(&self.asks)
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

/// Parsed WebSocket message
#[derive(Debug)]
pub enum BinanceMessage {
    Depth(DepthMessage),
    /// Anything else (subscription acks, unknown events)
    Unknown(String),
}

impl BinanceMessage {
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<DepthMessage>(text) {
            Ok(msg) if !msg.is_empty() => BinanceMessage::Depth(msg),
            Ok(_) => BinanceMessage::Unknown(text.to_string()),
            Err(e) => {
                debug!("[Binance WS] Parse error: {} - {}", e, text);
                BinanceMessage::Unknown(text.to_string())
            }
        }
    }
}

/// Parse string levels, dropping any that are not numeric
pub fn parse_levels(levels: &[RawLevel]) -> Vec<(f64, f64)> {
    levels
        .iter()
        .filter_map(|[price, qty]| match (price.parse::<f64>(), qty.parse::<f64>()) {
            (Ok(p), Ok(q)) if p.is_finite() && q.is_finite() => Some((p, q)),
            _ => {
                debug!("[Binance WS] Skipping invalid level [{}, {}]", price, qty);
                None
            }
        })
        .collect()
}
