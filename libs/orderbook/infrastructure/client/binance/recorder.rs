//! Binance order-book recorder
//!
//! Seeds a local book from the REST depth snapshot, merges WebSocket depth
//! messages into it and periodically writes the top levels of both sides to
//! ClickHouse.

use chrono::{DateTime, SecondsFormat, Utc};
use futures::StreamExt;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use super::types::{BinanceMessage, DepthMessage, DepthSnapshot};
use crate::domain::{LocalOrderBook, OrderBookRow};
use crate::infrastructure::clickhouse::{queries, ClickHouseClient, ClickHouseError};
use crate::infrastructure::config::BinanceConfig;
use crate::utils::{Heartbeat, ShutdownManager};

/// Maximum reconnection attempts before giving up
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Delay between reconnection attempts in seconds
const RECONNECT_DELAY_SECS: u64 = 5;

/// How often the recorder logs a status line
const STATUS_INTERVAL_SECS: u64 = 60;

#[derive(Error, Debug)]
pub enum RecorderError {
    #[error("ClickHouse error: {0}")]
    ClickHouse(#[from] ClickHouseError),

    #[error("Depth snapshot request failed: {0}")]
    Snapshot(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Exceeded {0} reconnection attempts")]
    ReconnectLimit(u32),
}

pub type Result<T> = std::result::Result<T, RecorderError>;

// =============================================================================
// StoredRow - insert payload
// =============================================================================

/// One row as written to the snapshot table
#[derive(Debug, Clone, Serialize)]
pub struct StoredRow<'a> {
    /// RFC 3339 with milliseconds; parsed server-side with `best_effort`
    pub timestamp: String,
    pub platform: &'a str,
    pub order_level: f64,
    pub order_type: &'static str,
    pub price: f64,
    pub volume: f64,
}

impl<'a> StoredRow<'a> {
    pub fn from_row(row: &OrderBookRow, platform: &'a str) -> Self {
        Self {
            timestamp: row.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            platform,
            order_level: f64::from(row.order_level),
            order_type: row.order_type.as_str(),
            price: row.price,
            volume: row.volume,
        }
    }
}

// =============================================================================
// RecorderState - book plus insert bookkeeping
// =============================================================================

/// Local book and the dedup state between inserts
#[derive(Debug, Clone)]
pub struct RecorderState {
    book: LocalOrderBook,
    num_levels: usize,
    base_volume: bool,
    /// Best bid/ask prices of the last batch handed out
    last_top: Option<(f64, f64)>,
    /// Observation time of the first update since the last batch
    pending_since: Option<DateTime<Utc>>,
}

impl RecorderState {
    pub fn new(num_levels: usize, base_volume: bool) -> Self {
        Self {
            book: LocalOrderBook::new(),
            num_levels,
            base_volume,
            last_top: None,
            pending_since: None,
        }
    }

    pub fn book(&self) -> &LocalOrderBook {
        &self.book
    }

    /// Replace the book with a REST snapshot
    pub fn seed(&mut self, snapshot: &DepthSnapshot) {
        self.book
            .apply_snapshot(&snapshot.bid_levels(), &snapshot.ask_levels());
    }

    /// Merge a depth message observed at `now`
    pub fn apply(&mut self, message: &DepthMessage, now: DateTime<Utc>) {
        self.book
            .apply_update(&message.bid_levels(), &message.ask_levels());
        self.pending_since.get_or_insert(now);
    }

    pub fn has_pending(&self) -> bool {
        self.pending_since.is_some()
    }

    /// Rows to insert for the pending updates, if any.
    ///
    /// Returns `None` when nothing changed since the last call, when either
    /// side of the book is empty, or when the best bid and best ask prices
    /// are the same as in the previous batch.
    pub fn take_batch(&mut self) -> Option<Vec<OrderBookRow>> {
        let timestamp = self.pending_since.take()?;

        let (bid, ask) = match (self.book.best_bid(), self.book.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => (bid, ask),
            _ => {
                debug!("[Recorder] One side of the book is empty, skipping insert");
                return None;
            }
        };

        if self.last_top == Some((bid, ask)) {
            return None;
        }
        self.last_top = Some((bid, ask));

        Some(self.book.to_rows(timestamp, self.num_levels, self.base_volume))
    }
}

// =============================================================================
// OrderBookRecorder - network loop
// =============================================================================

pub struct OrderBookRecorder {
    config: BinanceConfig,
    table: String,
    client: ClickHouseClient,
    http: reqwest::Client,
    state: RecorderState,
}

impl OrderBookRecorder {
    pub fn new(config: BinanceConfig, table: impl Into<String>, client: ClickHouseClient) -> Self {
        let state = RecorderState::new(config.num_levels, config.base_volume);
        Self {
            config,
            table: table.into(),
            client,
            http: reqwest::Client::new(),
            state,
        }
    }

    /// Create the table, then record until shutdown or too many reconnects
    pub async fn run(&mut self, shutdown_flag: Arc<AtomicBool>) -> Result<()> {
        info!("================================================================");
        info!("  STARTING ORDER BOOK RECORDER");
        info!("================================================================");
        info!("  Stream: {}", self.config.stream_url());
        info!("  Table: {}", self.table);
        info!("  Levels: {} per side", self.config.num_levels);
        info!("================================================================");

        self.client
            .execute(&queries::create_table(&self.table, &self.config.timezone))
            .await?;
        info!("[Recorder] Table {} ready", self.table);

        let shutdown = ShutdownManager::from_flag(Arc::clone(&shutdown_flag));
        let mut reconnect_attempts: u32 = 0;

        'reconnect: loop {
            if !shutdown_flag.load(Ordering::Acquire) {
                info!("[Recorder] Shutdown signal received before connect");
                break 'reconnect;
            }

            if reconnect_attempts > 0 {
                info!(
                    "[Recorder] Reconnection attempt {} of {}",
                    reconnect_attempts, MAX_RECONNECT_ATTEMPTS
                );
                shutdown
                    .interruptible_sleep(Duration::from_secs(RECONNECT_DELAY_SECS))
                    .await;
                if !shutdown.is_running() {
                    break 'reconnect;
                }
            }

            let connection_start = Instant::now();

            match self.run_connection(&shutdown_flag).await {
                Ok(()) => break 'reconnect,
                Err(e) => warn!("[Recorder] Connection lost: {}", e),
            }

            // A connection that stayed up resets the counter
            if connection_start.elapsed().as_secs() > RECONNECT_DELAY_SECS * 2 {
                reconnect_attempts = 0;
            }
            reconnect_attempts += 1;

            if reconnect_attempts >= MAX_RECONNECT_ATTEMPTS {
                warn!(
                    "[Recorder] Exceeded max reconnection attempts ({}), giving up",
                    MAX_RECONNECT_ATTEMPTS
                );
                return Err(RecorderError::ReconnectLimit(MAX_RECONNECT_ATTEMPTS));
            }
        }

        info!("[Recorder] Stopped");
        Ok(())
    }

    async fn fetch_snapshot(&self) -> Result<DepthSnapshot> {
        let snapshot = self
            .http
            .get(&self.config.rest_url)
            .send()
            .await?
            .error_for_status()?
            .json::<DepthSnapshot>()
            .await?;
        Ok(snapshot)
    }

    /// One connection: seed, stream, insert. `Ok` means shutdown was requested.
    async fn run_connection(&mut self, shutdown_flag: &AtomicBool) -> Result<()> {
        let snapshot = self.fetch_snapshot().await?;
        self.state.seed(&snapshot);
        info!(
            "[Recorder] Initial order book received (lastUpdateId {}) | {}",
            snapshot.last_update_id,
            self.state.book().format_summary()
        );

        let url = self.config.stream_url();
        debug!("[Recorder] Connecting to: {}", url);
        let (mut ws_stream, _) = connect_async(url.as_str()).await?;
        info!("[Recorder] Connected to Binance WebSocket");

        let mut insert_tick = interval(self.config.insert_interval());
        insert_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_tick = interval(Duration::from_millis(250));
        let mut heartbeat = Heartbeat::new(Duration::from_secs(STATUS_INTERVAL_SECS));

        loop {
            tokio::select! {
                message = ws_stream.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if let BinanceMessage::Depth(depth) = BinanceMessage::parse(&text) {
                            self.state.apply(&depth, Utc::now());
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        warn!("[Recorder] Server closed the stream: {:?}", frame);
                        return Err(RecorderError::WebSocket(
                            tokio_tungstenite::tungstenite::Error::ConnectionClosed,
                        ));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        return Err(RecorderError::WebSocket(
                            tokio_tungstenite::tungstenite::Error::ConnectionClosed,
                        ));
                    }
                },
                _ = insert_tick.tick() => {
                    if let Some(rows) = self.state.take_batch() {
                        heartbeat.record(rows.len() as u64);
                        self.insert(&rows).await;
                    }
                    if heartbeat.should_beat() {
                        info!(
                            "[Recorder] {} rows inserted in the last {}s | {}",
                            heartbeat.beat(),
                            STATUS_INTERVAL_SECS,
                            self.state.book().format_summary()
                        );
                    }
                }
                _ = shutdown_tick.tick() => {
                    if !shutdown_flag.load(Ordering::Acquire) {
                        info!("[Recorder] Shutdown signal received");
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Insert failures are logged; the stream keeps running
    async fn insert(&self, rows: &[OrderBookRow]) {
        let platform = self.config.platform.as_str();
        let stored: Vec<StoredRow<'_>> = rows
            .iter()
            .map(|row| StoredRow::from_row(row, platform))
            .collect();

        match self.client.insert_json_rows(&self.table, &stored).await {
            Ok(()) => debug!(
                "[Recorder] Inserted {} rows | {}",
                stored.len(),
                self.state.book().format_summary()
            ),
            Err(e) => warn!("[Recorder] Insert failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderType;
    use chrono::TimeZone;

    fn snapshot(bids: &[(&str, &str)], asks: &[(&str, &str)]) -> DepthSnapshot {
        let levels = |side: &[(&str, &str)]| {
            side.iter()
                .map(|(p, q)| [p.to_string(), q.to_string()])
                .collect()
        };
        DepthSnapshot {
            last_update_id: 1,
            bids: levels(bids),
            asks: levels(asks),
        }
    }

    fn update(json: &str) -> DepthMessage {
        serde_json::from_str(json).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_no_batch_without_updates() {
        let mut state = RecorderState::new(5, true);
        state.seed(&snapshot(&[("100", "1")], &[("101", "1")]));
        assert!(state.take_batch().is_none());
    }

    #[test]
    fn test_batch_contains_top_levels_of_both_sides() {
        let mut state = RecorderState::new(2, true);
        state.seed(&snapshot(
            &[("100", "1"), ("99", "2"), ("98", "3")],
            &[("101", "4"), ("102", "5")],
        ));
        state.apply(&update(r#"{"b":[["100","1.5"]],"a":[]}"#), now());

        let rows = state.take_batch().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].order_type, OrderType::Bid);
        assert_eq!((rows[0].order_level, rows[0].price, rows[0].volume), (1, 100.0, 1.5));
        assert_eq!((rows[1].order_level, rows[1].price), (2, 99.0));
        assert_eq!(rows[2].order_type, OrderType::Ask);
        assert_eq!((rows[2].order_level, rows[2].price), (1, 101.0));
        assert!(rows.iter().all(|r| r.timestamp == now()));
    }

    #[test]
    fn test_unchanged_top_of_book_is_deduplicated() {
        let mut state = RecorderState::new(3, true);
        state.seed(&snapshot(&[("100", "1")], &[("101", "1")]));

        state.apply(&update(r#"{"b":[["99","1"]],"a":[]}"#), now());
        assert!(state.take_batch().is_some());

        // Deeper level changes only
        state.apply(&update(r#"{"b":[["98","1"]],"a":[]}"#), now());
        assert!(state.take_batch().is_none());

        state.apply(&update(r#"{"b":[],"a":[["100.5","1"]]}"#), now());
        assert!(state.take_batch().is_some());
    }

    #[test]
    fn test_empty_side_skips_insert() {
        let mut state = RecorderState::new(3, true);
        state.seed(&snapshot(&[("100", "1")], &[("101", "1")]));
        state.apply(&update(r#"{"b":[],"a":[["101","0"]]}"#), now());

        assert!(state.book().best_ask().is_none());
        assert!(state.take_batch().is_none());
        assert!(!state.has_pending());
    }

    #[test]
    fn test_quote_volume_mode() {
        let mut state = RecorderState::new(1, false);
        state.seed(&snapshot(&[("100", "2")], &[("101", "3")]));
        state.apply(&update(r#"{"bids":[],"asks":[]}"#), now());

        let rows = state.take_batch().unwrap();
        assert_eq!(rows[0].volume, 200.0);
        assert_eq!(rows[1].volume, 303.0);
    }

    #[test]
    fn test_first_update_time_is_batch_timestamp() {
        let mut state = RecorderState::new(1, true);
        state.seed(&snapshot(&[("100", "1")], &[("101", "1")]));

        let later = now() + chrono::Duration::milliseconds(400);
        state.apply(&update(r#"{"b":[["100","2"]],"a":[]}"#), now());
        state.apply(&update(r#"{"b":[["100","3"]],"a":[]}"#), later);

        let rows = state.take_batch().unwrap();
        assert_eq!(rows[0].timestamp, now());
        assert_eq!(rows[0].volume, 3.0);
    }

    #[test]
    fn test_stored_row_serialization() {
        let row = OrderBookRow::new(
            Utc.timestamp_millis_opt(1_714_564_800_123).unwrap(),
            OrderType::Ask,
            3,
            101.5,
            0.25,
        );
        let json = serde_json::to_value(StoredRow::from_row(&row, "Binance")).unwrap();

        assert_eq!(json["timestamp"], "2024-05-01T12:00:00.123Z");
        assert_eq!(json["platform"], "Binance");
        assert_eq!(json["order_level"], 3.0);
        assert_eq!(json["order_type"], "Ask");
    }
}
