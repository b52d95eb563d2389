//! Shared state published by the refresh task and read by the UI

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::domain::{OrderBookViews, SpreadPolicy};
use crate::infrastructure::QueryWindow;

pub type SharedDashboardState = Arc<RwLock<DashboardState>>;

/// Latest views plus refresh bookkeeping
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub table: String,
    pub window: QueryWindow,
    pub policy: SpreadPolicy,
    /// Views from the last successful cycle, `None` until the first one
    pub views: Option<OrderBookViews>,
    pub last_refresh: Option<DateTime<Utc>>,
    /// Message of the most recent failed cycle, cleared on success
    pub last_error: Option<String>,
    pub cycles: u64,
    pub failures: u64,
}

impl DashboardState {
    pub fn new(table: impl Into<String>, window: QueryWindow, policy: SpreadPolicy) -> Self {
        Self {
            table: table.into(),
            window,
            policy,
            views: None,
            last_refresh: None,
            last_error: None,
            cycles: 0,
            failures: 0,
        }
    }

    pub fn shared(self) -> SharedDashboardState {
        Arc::new(RwLock::new(self))
    }

    pub fn record_success(&mut self, views: OrderBookViews, at: DateTime<Utc>) {
        self.views = Some(views);
        self.last_refresh = Some(at);
        self.last_error = None;
        self.cycles += 1;
    }

    /// Keep the previous views and remember why this cycle failed
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.cycles += 1;
        self.failures += 1;
    }

    pub fn row_count(&self) -> usize {
        self.views.as_ref().map_or(0, |v| v.row_count)
    }

    pub fn preview_len(&self) -> usize {
        self.views.as_ref().map_or(0, |v| v.preview.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderBookRow, OrderBookViewBuilder, OrderType};

    fn views() -> OrderBookViews {
        let now = Utc::now();
        let rows = vec![
            OrderBookRow::new(now, OrderType::Bid, 1, 100.0, 1.0),
            OrderBookRow::new(now, OrderType::Ask, 1, 101.0, 1.0),
        ];
        OrderBookViewBuilder::default().build(&rows, 100)
    }

    #[test]
    fn test_failure_keeps_previous_views() {
        let mut state = DashboardState::new("ob", QueryWindow::last_minutes(10), SpreadPolicy::FirstSeen);
        state.record_success(views(), Utc::now());
        state.record_failure("connection refused");

        assert_eq!(state.row_count(), 2);
        assert_eq!(state.last_error.as_deref(), Some("connection refused"));
        assert_eq!((state.cycles, state.failures), (2, 1));
    }

    #[test]
    fn test_success_clears_error() {
        let mut state = DashboardState::new("ob", QueryWindow::last_minutes(10), SpreadPolicy::FirstSeen);
        state.record_failure("timeout");
        assert_eq!(state.preview_len(), 0);

        state.record_success(views(), Utc::now());
        assert!(state.last_error.is_none());
        assert_eq!(state.preview_len(), 2);
    }
}
