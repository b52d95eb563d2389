//! Derived order-book views
//!
//! Turns a flat batch of [`OrderBookRow`]s into the two dashboard views:
//!
//! - **Spread series**: one point per timestamp that has both a Bid and an Ask
//! - **Volume matrix**: mean volume per (order level, order type)
//!
//! Everything here is a pure function of the input batch. Absence is kept as
//! absence: a timestamp with one side only yields no spread point, and an
//! unobserved (level, type) pair is an empty cell, never a zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::row::{decode_batch, OrderBookRow, OrderType, SchemaError};

// =============================================================================
// Spread
// =============================================================================

/// Which quote to pick per side when a timestamp has several rows for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadPolicy {
    /// First Bid / first Ask in input order, whatever their level or price.
    /// Matches the historical dashboard output.
    #[default]
    FirstSeen,
    /// Highest Bid / lowest Ask across all levels at that timestamp
    BestPrice,
}

impl std::fmt::Display for SpreadPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpreadPolicy::FirstSeen => write!(f, "first-seen"),
            SpreadPolicy::BestPrice => write!(f, "best-price"),
        }
    }
}

/// Spread at one timestamp
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpreadPoint {
    pub timestamp: DateTime<Utc>,
    pub spread: f64,
}

/// Bid/Ask prices collected for a single timestamp
#[derive(Debug, Default, Clone, Copy)]
struct QuotePair {
    bid: Option<f64>,
    ask: Option<f64>,
}

impl QuotePair {
    fn offer(&mut self, side: OrderType, price: f64, policy: SpreadPolicy) {
        let slot = match side {
            OrderType::Bid => &mut self.bid,
            OrderType::Ask => &mut self.ask,
        };

        *slot = match (policy, *slot) {
            (_, None) => Some(price),
            (SpreadPolicy::FirstSeen, Some(current)) => Some(current),
            (SpreadPolicy::BestPrice, Some(current)) => Some(match side {
                OrderType::Bid => current.max(price),
                OrderType::Ask => current.min(price),
            }),
        };
    }

    fn spread(&self) -> Option<f64> {
        Some(self.ask? - self.bid?)
    }
}

// =============================================================================
// Volume
// =============================================================================

/// Key of one volume cell. Orders by level first, then type.
pub type VolumeKey = (u32, OrderType);

#[derive(Debug, Default, Clone, Copy)]
struct MeanAccumulator {
    sum: f64,
    count: u64,
}

impl MeanAccumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

/// Dense level × type grid of average volumes.
///
/// Rows are the observed levels ascending, columns the observed order types.
/// A cell is `None` when that pair never occurred in the batch.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct VolumeMatrix {
    levels: Vec<u32>,
    order_types: Vec<OrderType>,
    cells: Vec<Vec<Option<f64>>>,
}

impl VolumeMatrix {
    /// Reshape sparse averages into the dense grid
    pub fn from_averages(averages: &BTreeMap<VolumeKey, f64>) -> Self {
        let mut levels: Vec<u32> = averages.keys().map(|(level, _)| *level).collect();
        levels.dedup();

        let mut order_types: Vec<OrderType> = averages.keys().map(|(_, t)| *t).collect();
        order_types.sort_unstable();
        order_types.dedup();

        let cells = levels
            .iter()
            .map(|level| {
                order_types
                    .iter()
                    .map(|t| averages.get(&(*level, *t)).copied())
                    .collect()
            })
            .collect();

        Self {
            levels,
            order_types,
            cells,
        }
    }

    pub fn levels(&self) -> &[u32] {
        &self.levels
    }

    pub fn order_types(&self) -> &[OrderType] {
        &self.order_types
    }

    /// One row of cells per level, in the order of [`levels`](Self::levels)
    pub fn rows(&self) -> impl Iterator<Item = (u32, &[Option<f64>])> + '_ {
        self.levels
            .iter()
            .copied()
            .zip(self.cells.iter().map(|row| row.as_slice()))
    }

    /// Average volume at a cell, `None` if unobserved
    pub fn get(&self, level: u32, order_type: OrderType) -> Option<f64> {
        let row = self.levels.binary_search(&level).ok()?;
        let col = self.order_types.iter().position(|t| *t == order_type)?;
        self.cells[row][col]
    }

    /// Largest observed cell, used for colour scaling
    pub fn max_value(&self) -> Option<f64> {
        self.cells
            .iter()
            .flatten()
            .flatten()
            .copied()
            .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// All views derived from one batch
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OrderBookViews {
    pub spread: Vec<SpreadPoint>,
    pub volume: VolumeMatrix,
    /// First rows of the batch, untouched
    pub preview: Vec<OrderBookRow>,
    pub row_count: usize,
}

/// Stateless builder for the dashboard views
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderBookViewBuilder {
    policy: SpreadPolicy,
}

impl OrderBookViewBuilder {
    pub fn new(policy: SpreadPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SpreadPolicy {
        self.policy
    }

    /// Spread per timestamp, ascending. Timestamps lacking a side are skipped.
    pub fn spread_series(&self, rows: &[OrderBookRow]) -> Vec<SpreadPoint> {
        let mut by_timestamp: BTreeMap<DateTime<Utc>, QuotePair> = BTreeMap::new();

        for row in rows {
            by_timestamp
                .entry(row.timestamp)
                .or_default()
                .offer(row.order_type, row.price, self.policy);
        }

        by_timestamp
            .into_iter()
            .filter_map(|(timestamp, quotes)| {
                quotes.spread().map(|spread| SpreadPoint { timestamp, spread })
            })
            .collect()
    }

    /// Mean volume for every observed (level, type) pair
    pub fn volume_averages(&self, rows: &[OrderBookRow]) -> BTreeMap<VolumeKey, f64> {
        let mut groups: BTreeMap<VolumeKey, MeanAccumulator> = BTreeMap::new();

        for row in rows {
            groups
                .entry((row.order_level, row.order_type))
                .or_default()
                .push(row.volume);
        }

        groups
            .into_iter()
            .map(|(key, acc)| (key, acc.mean()))
            .collect()
    }

    /// [`volume_averages`](Self::volume_averages) reshaped for rendering
    pub fn volume_matrix(&self, rows: &[OrderBookRow]) -> VolumeMatrix {
        VolumeMatrix::from_averages(&self.volume_averages(rows))
    }

    /// Both views plus a pass-through preview of the first `preview_rows` rows
    pub fn build(&self, rows: &[OrderBookRow], preview_rows: usize) -> OrderBookViews {
        OrderBookViews {
            spread: self.spread_series(rows),
            volume: self.volume_matrix(rows),
            preview: rows.iter().take(preview_rows).cloned().collect(),
            row_count: rows.len(),
        }
    }

    /// Decode raw wire records, then build. No partial output on bad input.
    pub fn build_from_records(
        &self,
        records: &[Value],
        preview_rows: usize,
    ) -> Result<OrderBookViews, SchemaError> {
        let rows = decode_batch(records)?;
        Ok(self.build(&rows, preview_rows))
    }
}
