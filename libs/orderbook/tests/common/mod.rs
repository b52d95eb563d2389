//! Shared fixtures for order-book integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use orderbook::{OrderBookRow, OrderType};
use serde_json::{json, Value};

/// Fixed base instant so failures reproduce
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

/// `base_time() + secs`
pub fn ts(secs: i64) -> DateTime<Utc> {
    base_time() + chrono::Duration::seconds(secs)
}

pub fn row(secs: i64, order_type: OrderType, level: u32, price: f64, volume: f64) -> OrderBookRow {
    OrderBookRow::new(ts(secs), order_type, level, price, volume)
}

/// Wire record as ClickHouse returns it for the view query
pub fn record(row: &OrderBookRow) -> Value {
    json!({
        "timestamp": row.timestamp.timestamp_millis(),
        "order_type": row.order_type.as_str(),
        "order_level": f64::from(row.order_level),
        "price": row.price,
        "volume": row.volume,
    })
}

pub mod fixtures {
    //! Batches used across tests

    use super::*;

    /// Two-sided t1, bid-only t2
    pub fn one_sided_tail() -> Vec<OrderBookRow> {
        vec![
            row(1, OrderType::Bid, 1, 100.0, 2.0),
            row(1, OrderType::Ask, 1, 101.0, 3.0),
            row(2, OrderType::Bid, 1, 99.0, 1.0),
        ]
    }

    /// Two bids at the same timestamp, the first one lower
    pub fn duplicate_bids() -> Vec<OrderBookRow> {
        vec![
            row(1, OrderType::Bid, 1, 100.0, 2.0),
            row(1, OrderType::Bid, 1, 105.0, 4.0),
            row(1, OrderType::Ask, 1, 101.0, 1.0),
        ]
    }

    /// Ten levels per side for `snapshots` consecutive seconds
    pub fn ladder(snapshots: i64) -> Vec<OrderBookRow> {
        let mut rows = Vec::new();
        for t in 0..snapshots {
            let mid = 64_000.0 + t as f64;
            for level in 1..=10u32 {
                let offset = level as f64 * 0.5;
                rows.push(row(t, OrderType::Bid, level, mid - offset, level as f64));
                rows.push(row(t, OrderType::Ask, level, mid + offset, 2.0 * level as f64));
            }
        }
        rows
    }
}

pub mod strategies {
    //! proptest generators

    use super::*;
    use proptest::prelude::*;

    pub fn order_type() -> impl Strategy<Value = OrderType> {
        prop_oneof![Just(OrderType::Bid), Just(OrderType::Ask)]
    }

    /// Timestamps drawn from a few seconds so groups collide
    pub fn row() -> impl Strategy<Value = OrderBookRow> {
        (0i64..6, order_type(), 1u32..6, 1.0..1_000.0f64, 0.0..100.0f64)
            .prop_map(|(secs, side, level, price, volume)| super::row(secs, side, level, price, volume))
    }

    pub fn batch(max_len: usize) -> impl Strategy<Value = Vec<OrderBookRow>> {
        prop::collection::vec(row(), 0..max_len)
    }
}
