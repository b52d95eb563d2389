//! Property-based tests for the view builder
//!
//! Run with: cargo test -p orderbook view_properties

mod common;

use std::collections::{BTreeMap, BTreeSet};

use common::{fixtures, record, strategies, ts};
use orderbook::{OrderBookViewBuilder, OrderType, SchemaError, SpreadPolicy};
use proptest::prelude::*;

// ============================================================================
// Spread series
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// At most one point per timestamp, and only where both sides exist
    #[test]
    fn spread_only_for_two_sided_timestamps(rows in strategies::batch(60)) {
        let spread = OrderBookViewBuilder::default().spread_series(&rows);

        let distinct: BTreeSet<_> = rows.iter().map(|r| r.timestamp).collect();
        prop_assert!(spread.len() <= distinct.len());

        for point in &spread {
            let sides: BTreeSet<OrderType> = rows
                .iter()
                .filter(|r| r.timestamp == point.timestamp)
                .map(|r| r.order_type)
                .collect();
            prop_assert!(sides.contains(&OrderType::Bid));
            prop_assert!(sides.contains(&OrderType::Ask));
        }
    }

    /// Every two-sided timestamp appears, in strictly ascending order
    #[test]
    fn spread_covers_two_sided_timestamps_in_order(rows in strategies::batch(60)) {
        let spread = OrderBookViewBuilder::default().spread_series(&rows);

        let mut sides: BTreeMap<_, BTreeSet<OrderType>> = BTreeMap::new();
        for r in &rows {
            sides.entry(r.timestamp).or_default().insert(r.order_type);
        }
        let expected: Vec<_> = sides
            .into_iter()
            .filter(|(_, s)| s.len() == 2)
            .map(|(t, _)| t)
            .collect();
        let actual: Vec<_> = spread.iter().map(|p| p.timestamp).collect();

        prop_assert_eq!(actual, expected);
    }

    /// First-seen uses the first Bid and first Ask in input order
    #[test]
    fn first_seen_matches_input_order(rows in strategies::batch(60)) {
        let spread = OrderBookViewBuilder::new(SpreadPolicy::FirstSeen).spread_series(&rows);

        for point in &spread {
            let first = |side: OrderType| {
                rows.iter()
                    .find(|r| r.timestamp == point.timestamp && r.order_type == side)
                    .map(|r| r.price)
                    .unwrap()
            };
            prop_assert_eq!(point.spread, first(OrderType::Ask) - first(OrderType::Bid));
        }
    }

    /// Best-price spread is never wider than first-seen
    #[test]
    fn best_price_is_tightest(rows in strategies::batch(60)) {
        let first = OrderBookViewBuilder::new(SpreadPolicy::FirstSeen).spread_series(&rows);
        let best = OrderBookViewBuilder::new(SpreadPolicy::BestPrice).spread_series(&rows);

        prop_assert_eq!(first.len(), best.len());
        for (f, b) in first.iter().zip(&best) {
            prop_assert_eq!(f.timestamp, b.timestamp);
            prop_assert!(b.spread <= f.spread + 1e-9);
        }
    }

    // ========================================================================
    // Volume matrix
    // ========================================================================

    /// Keys are exactly the observed (level, type) pairs
    #[test]
    fn volume_keys_match_observed_pairs(rows in strategies::batch(60)) {
        let averages = OrderBookViewBuilder::default().volume_averages(&rows);

        let observed: BTreeSet<_> = rows.iter().map(|r| (r.order_level, r.order_type)).collect();
        let keys: BTreeSet<_> = averages.keys().copied().collect();

        prop_assert_eq!(keys, observed);
    }

    /// Each mean lies within its group's min and max
    #[test]
    fn volume_mean_within_group_range(rows in strategies::batch(60)) {
        let averages = OrderBookViewBuilder::default().volume_averages(&rows);

        for ((level, side), mean) in &averages {
            let group: Vec<f64> = rows
                .iter()
                .filter(|r| r.order_level == *level && r.order_type == *side)
                .map(|r| r.volume)
                .collect();
            let min = group.iter().copied().fold(f64::INFINITY, f64::min);
            let max = group.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(*mean >= min - 1e-9 && *mean <= max + 1e-9);
        }
    }

    /// Dense matrix agrees with the sparse averages and leaves gaps empty
    #[test]
    fn matrix_cells_match_averages(rows in strategies::batch(60)) {
        let builder = OrderBookViewBuilder::default();
        let averages = builder.volume_averages(&rows);
        let matrix = builder.volume_matrix(&rows);

        for &level in matrix.levels() {
            for &side in matrix.order_types() {
                prop_assert_eq!(matrix.get(level, side), averages.get(&(level, side)).copied());
            }
        }
        prop_assert!(matrix.levels().windows(2).all(|w| w[0] < w[1]));
    }

    // ========================================================================
    // Whole build
    // ========================================================================

    /// Same batch, same views
    #[test]
    fn build_is_idempotent(rows in strategies::batch(60), preview in 0usize..80) {
        let builder = OrderBookViewBuilder::default();
        let first = builder.build(&rows, preview);
        let second = builder.build(&rows, preview);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.preview.len(), preview.min(rows.len()));
        prop_assert_eq!(&first.preview[..], &rows[..preview.min(rows.len())]);
    }

    /// Decoding wire records gives the same views as the typed rows
    #[test]
    fn build_from_records_matches_build(rows in strategies::batch(40)) {
        let builder = OrderBookViewBuilder::default();
        let records: Vec<_> = rows.iter().map(record).collect();

        prop_assert_eq!(builder.build_from_records(&records, 10).unwrap(), builder.build(&rows, 10));
    }

    /// Dropping a required field anywhere fails the whole batch
    #[test]
    fn missing_field_fails_batch(
        rows in strategies::batch(40).prop_filter("non-empty", |r| !r.is_empty()),
        pick in any::<prop::sample::Index>(),
        field in prop::sample::select(vec!["timestamp", "order_type", "order_level", "price", "volume"]),
    ) {
        let mut records: Vec<_> = rows.iter().map(record).collect();
        let index = pick.index(records.len());
        records[index].as_object_mut().unwrap().remove(field);

        let result = OrderBookViewBuilder::default().build_from_records(&records, 10);
        prop_assert_eq!(result, Err(SchemaError::MissingField { index, field }));
    }
}

// ============================================================================
// Worked examples
// ============================================================================

#[test]
fn one_sided_tail_example() {
    let views = OrderBookViewBuilder::default().build(&fixtures::one_sided_tail(), 100);

    assert_eq!(views.spread.len(), 1);
    assert_eq!(views.spread[0].timestamp, ts(1));
    assert_eq!(views.spread[0].spread, 1.0);

    assert_eq!(views.volume.get(1, OrderType::Bid), Some(1.5));
    assert_eq!(views.volume.get(1, OrderType::Ask), Some(3.0));
    assert_eq!(views.volume.levels(), &[1]);
}

#[test]
fn duplicate_bids_example() {
    let spread = OrderBookViewBuilder::default().spread_series(&fixtures::duplicate_bids());
    assert_eq!(spread.len(), 1);
    assert_eq!(spread[0].spread, 1.0);
}

#[test]
fn ladder_example() {
    let rows = fixtures::ladder(30);
    let views = OrderBookViewBuilder::new(SpreadPolicy::BestPrice).build(&rows, 100);

    assert_eq!(views.row_count, 600);
    assert_eq!(views.spread.len(), 30);
    assert!(views.spread.iter().all(|p| (p.spread - 1.0).abs() < 1e-9));
    assert_eq!(views.volume.levels().len(), 10);
    assert_eq!(views.volume.order_types(), &[OrderType::Ask, OrderType::Bid]);
    assert_eq!(views.volume.get(10, OrderType::Ask), Some(20.0));
    assert_eq!(views.preview.len(), 100);
}

#[test]
fn empty_batch_yields_empty_views() {
    let views = OrderBookViewBuilder::default().build(&[], 100);
    assert!(views.spread.is_empty());
    assert!(views.volume.is_empty());
    assert!(views.preview.is_empty());
    assert_eq!(views.row_count, 0);
}
