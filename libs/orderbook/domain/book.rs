//! Local order book maintained by the recorder
//!
//! Simple sorted-vector book using floats. Venue prices arrive as decimal
//! strings, so identical strings always parse to identical floats and levels
//! are matched exactly.

use chrono::{DateTime, Utc};

use super::row::{OrderBookRow, OrderType};

// =============================================================================
// OrderbookSide - One side of the book (bids or asks)
// =============================================================================

/// A single side of the book
#[derive(Debug, Clone)]
pub struct OrderbookSide {
    /// Price levels as (price, quantity)
    /// Bids: sorted descending (highest first)
    /// Asks: sorted ascending (lowest first)
    levels: Vec<(f64, f64)>,
    is_bid: bool,
}

impl OrderbookSide {
    pub fn new(is_bid: bool) -> Self {
        Self {
            levels: Vec::with_capacity(128),
            is_bid,
        }
    }

    /// Replace the entire side with snapshot levels
    pub fn process_snapshot(&mut self, levels: &[(f64, f64)]) {
        self.levels.clear();
        self.levels
            .extend(levels.iter().copied().filter(|(_, qty)| *qty > 0.0));

        if self.is_bid {
            self.levels.sort_unstable_by(|a, b| b.0.total_cmp(&a.0));
        } else {
            self.levels.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));
        }
        self.levels.dedup_by(|a, b| a.0 == b.0);
    }

    /// Update a single level. Quantity 0 removes it.
    pub fn process_update(&mut self, price: f64, quantity: f64) {
        if quantity == 0.0 {
            if let Some(idx) = self.levels.iter().position(|(p, _)| *p == price) {
                self.levels.remove(idx);
            }
            return;
        }

        let pos = self.levels.iter().position(|(p, _)| {
            if self.is_bid {
                *p <= price
            } else {
                *p >= price
            }
        });

        match pos {
            Some(idx) if self.levels[idx].0 == price => self.levels[idx].1 = quantity,
            Some(idx) => self.levels.insert(idx, (price, quantity)),
            None => self.levels.push((price, quantity)),
        }
    }

    #[inline]
    pub fn best(&self) -> Option<(f64, f64)> {
        self.levels.first().copied()
    }

    #[inline]
    pub fn levels(&self) -> &[(f64, f64)] {
        &self.levels
    }

    /// Best `n` levels, best first
    #[inline]
    pub fn top(&self, n: usize) -> &[(f64, f64)] {
        &self.levels[..n.min(self.levels.len())]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

// =============================================================================
// LocalOrderBook - Both sides for one trading pair
// =============================================================================

#[derive(Debug, Clone)]
pub struct LocalOrderBook {
    pub bids: OrderbookSide,
    pub asks: OrderbookSide,
}

impl LocalOrderBook {
    pub fn new() -> Self {
        Self {
            bids: OrderbookSide::new(true),
            asks: OrderbookSide::new(false),
        }
    }

    pub fn apply_snapshot(&mut self, bids: &[(f64, f64)], asks: &[(f64, f64)]) {
        self.bids.process_snapshot(bids);
        self.asks.process_snapshot(asks);
    }

    /// Merge incremental levels into the book
    pub fn apply_update(&mut self, bids: &[(f64, f64)], asks: &[(f64, f64)]) {
        for &(price, qty) in bids {
            self.bids.process_update(price, qty);
        }
        for &(price, qty) in asks {
            self.asks.process_update(price, qty);
        }
    }

    #[inline]
    pub fn best_bid(&self) -> Option<(f64, f64)> {
        self.bids.best()
    }

    #[inline]
    pub fn best_ask(&self) -> Option<(f64, f64)> {
        self.asks.best()
    }

    pub fn spread(&self) -> Option<f64> {
        match (self.best_bid(), self.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => Some(ask - bid),
            _ => None,
        }
    }

    /// Top `num_levels` of each side as table rows, level 1 = best.
    ///
    /// `base_volume` stores the quantity as-is; otherwise volume is quoted
    /// in the counter currency (price × quantity).
    pub fn to_rows(
        &self,
        timestamp: DateTime<Utc>,
        num_levels: usize,
        base_volume: bool,
    ) -> Vec<OrderBookRow> {
        let mut rows = Vec::with_capacity(num_levels * 2);
        push_side_rows(&mut rows, &self.bids, OrderType::Bid, timestamp, num_levels, base_volume);
        push_side_rows(&mut rows, &self.asks, OrderType::Ask, timestamp, num_levels, base_volume);
        rows
    }

    /// One-line summary for logging
    pub fn format_summary(&self) -> String {
        let fmt = |level: Option<(f64, f64)>| {
            level
                .map(|(p, q)| format!("{:.2} ({:.4})", p, q))
                .unwrap_or_else(|| "N/A".to_string())
        };

        let spread_str = self
            .spread()
            .map(|s| format!("{:.2}", s))
            .unwrap_or_else(|| "N/A".to_string());

        format!(
            "Bid: {} | Ask: {} | Spread: {}",
            fmt(self.best_bid()),
            fmt(self.best_ask()),
            spread_str
        )
    }
}

fn push_side_rows(
    rows: &mut Vec<OrderBookRow>,
    side: &OrderbookSide,
    order_type: OrderType,
    timestamp: DateTime<Utc>,
    num_levels: usize,
    base_volume: bool,
) {
    for (i, &(price, qty)) in side.top(num_levels).iter().enumerate() {
        let volume = if base_volume { qty } else { price * qty };
        rows.push(OrderBookRow::new(timestamp, order_type, i as u32 + 1, price, volume));
    }
}

impl Default for LocalOrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_side_snapshot_sorted() {
        let mut bids = OrderbookSide::new(true);
        bids.process_snapshot(&[(100.0, 1.0), (102.0, 2.0), (101.0, 0.0), (99.0, 3.0)]);

        // zero-quantity level dropped, highest first
        assert_eq!(bids.levels(), &[(102.0, 2.0), (100.0, 1.0), (99.0, 3.0)]);

        let mut asks = OrderbookSide::new(false);
        asks.process_snapshot(&[(105.0, 1.0), (103.0, 2.0)]);
        assert_eq!(asks.best(), Some((103.0, 2.0)));
    }

    #[test]
    fn test_side_update_insert_replace_remove() {
        let mut bids = OrderbookSide::new(true);
        bids.process_snapshot(&[(100.0, 1.0), (99.0, 1.0)]);

        bids.process_update(100.0, 5.0);
        assert_eq!(bids.best(), Some((100.0, 5.0)));

        bids.process_update(99.5, 2.0);
        assert_eq!(bids.levels()[1], (99.5, 2.0));

        bids.process_update(98.0, 1.0);
        assert_eq!(bids.levels().last(), Some(&(98.0, 1.0)));

        bids.process_update(100.0, 0.0);
        assert_eq!(bids.best(), Some((99.5, 2.0)));

        // Removing an unknown level is a no-op
        bids.process_update(42.0, 0.0);
        assert_eq!(bids.len(), 3);
    }

    #[test]
    fn test_top_clamps_to_depth() {
        let mut asks = OrderbookSide::new(false);
        asks.process_snapshot(&[(101.0, 1.0), (102.0, 1.0)]);
        assert_eq!(asks.top(10).len(), 2);
        assert_eq!(asks.top(1), &[(101.0, 1.0)]);
    }

    #[test]
    fn test_book_spread() {
        let mut book = LocalOrderBook::new();
        assert_eq!(book.spread(), None);

        book.apply_snapshot(&[(100.0, 1.0)], &[(100.5, 1.0)]);
        assert_eq!(book.spread(), Some(0.5));

        book.apply_update(&[(100.25, 2.0)], &[(100.5, 0.0), (101.0, 1.0)]);
        assert_eq!(book.best_bid(), Some((100.25, 2.0)));
        assert_eq!(book.best_ask(), Some((101.0, 1.0)));
    }

    #[test]
    fn test_to_rows_levels_and_volume_modes() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut book = LocalOrderBook::new();
        book.apply_snapshot(&[(100.0, 2.0), (99.0, 1.0)], &[(101.0, 3.0), (102.0, 4.0)]);

        let rows = book.to_rows(ts, 1, true);
        assert_eq!(
            rows,
            vec![
                OrderBookRow::new(ts, OrderType::Bid, 1, 100.0, 2.0),
                OrderBookRow::new(ts, OrderType::Ask, 1, 101.0, 3.0),
            ]
        );

        let rows = book.to_rows(ts, 5, false);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].order_level, 2);
        assert_eq!(rows[1].volume, 99.0);
        assert_eq!(rows[3].volume, 408.0);
    }
}
