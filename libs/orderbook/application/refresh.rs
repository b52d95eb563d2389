//! Fixed-interval refresh task
//!
//! Each cycle fetches the configured window, rebuilds the views and
//! publishes them into the shared dashboard state. Cycles never overlap.

use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::application::dashboard::SharedDashboardState;
use crate::domain::OrderBookViewBuilder;
use crate::infrastructure::config::DashboardConfig;
use crate::infrastructure::{OrderBookSource, QueryWindow};

/// How often the task checks the shutdown flag between ticks
const SHUTDOWN_POLL_MS: u64 = 250;

#[derive(Debug, Clone, Copy)]
pub struct RefreshSettings {
    pub interval: Duration,
    pub window: QueryWindow,
    pub preview_rows: usize,
    pub builder: OrderBookViewBuilder,
}

impl RefreshSettings {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            interval: config.refresh_interval(),
            window: config.query_window(),
            preview_rows: config.preview_rows,
            builder: OrderBookViewBuilder::new(config.spread_policy),
        }
    }
}

/// Run one fetch → build → publish cycle.
///
/// On failure the previously published views stay in place and the error
/// message is recorded on the state.
pub async fn refresh_once(
    source: &dyn OrderBookSource,
    settings: &RefreshSettings,
    state: &SharedDashboardState,
) -> anyhow::Result<()> {
    match source.fetch(&settings.window).await {
        Ok(rows) => {
            let views = settings.builder.build(&rows, settings.preview_rows);
            debug!(
                "[Refresh] {} rows, {} spread points, {} volume levels",
                views.row_count,
                views.spread.len(),
                views.volume.levels().len()
            );
            state.write().record_success(views, Utc::now());
            Ok(())
        }
        Err(e) => {
            warn!("[Refresh] Cycle failed: {}", e);
            state.write().record_failure(e.to_string());
            Err(e.into())
        }
    }
}

/// Handle to the background refresh task
pub struct RefreshHandle {
    notify: Arc<Notify>,
    stopping: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Ask for a cycle now, bypassing any cached result
    pub fn request_refresh(&self) {
        self.notify.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the task, aborting it after `grace`. Works whether or not the
    /// shared shutdown flag has been cleared yet.
    pub async fn stop(self, grace: Duration) {
        self.stopping.store(true, Ordering::Release);
        self.notify.notify_one();
        let abort = self.task.abort_handle();
        if timeout(grace, self.task).await.is_err() {
            warn!("[Refresh] Task did not stop within {:?}, aborting", grace);
            abort.abort();
        }
    }
}

/// Spawn the refresh loop. It runs a cycle immediately, then every
/// `settings.interval`, and exits once `shutdown_flag` is cleared.
pub fn spawn_refresh_task(
    source: Arc<dyn OrderBookSource>,
    settings: RefreshSettings,
    state: SharedDashboardState,
    shutdown_flag: Arc<AtomicBool>,
) -> RefreshHandle {
    let notify = Arc::new(Notify::new());
    let task_notify = Arc::clone(&notify);
    let stopping = Arc::new(AtomicBool::new(false));
    let task_stopping = Arc::clone(&stopping);

    info!(
        "[Refresh] Every {:?} over {} ({} spread)",
        settings.interval,
        settings.window,
        settings.builder.policy()
    );

    let task = tokio::spawn(async move {
        let mut tick = interval(settings.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut shutdown_poll = interval(Duration::from_millis(SHUTDOWN_POLL_MS));
        let running =
            || shutdown_flag.load(Ordering::Acquire) && !task_stopping.load(Ordering::Acquire);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = task_notify.notified() => {
                    if !running() {
                        break;
                    }
                    debug!("[Refresh] Manual refresh requested");
                    source.invalidate();
                    tick.reset();
                }
                _ = shutdown_poll.tick() => {
                    if running() {
                        continue;
                    }
                    break;
                }
            }

            if !running() {
                break;
            }

            // Errors are already recorded on the state
            let _ = refresh_once(source.as_ref(), &settings, &state).await;
        }

        info!("[Refresh] Stopped");
    });

    RefreshHandle {
        notify,
        stopping,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard::DashboardState;
    use crate::domain::{OrderBookRow, OrderType, SchemaError, SpreadPolicy};
    use crate::infrastructure::source::{Result as SourceResult, SourceError};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Succeeds on the first call, fails afterwards
    struct FlakySource {
        calls: AtomicUsize,
        invalidations: AtomicUsize,
    }

    impl FlakySource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                invalidations: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OrderBookSource for FlakySource {
        async fn fetch(&self, _window: &QueryWindow) -> SourceResult<Arc<Vec<OrderBookRow>>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) > 0 {
                return Err(SourceError::Schema(SchemaError::MissingField {
                    index: 3,
                    field: "price",
                }));
            }
            let now = Utc::now();
            Ok(Arc::new(vec![
                OrderBookRow::new(now, OrderType::Bid, 1, 100.0, 2.0),
                OrderBookRow::new(now, OrderType::Ask, 1, 100.5, 1.0),
            ]))
        }

        fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn settings(interval: Duration) -> RefreshSettings {
        RefreshSettings {
            interval,
            window: QueryWindow::last_minutes(10),
            preview_rows: 100,
            builder: OrderBookViewBuilder::new(SpreadPolicy::FirstSeen),
        }
    }

    fn state() -> SharedDashboardState {
        DashboardState::new("ob", QueryWindow::last_minutes(10), SpreadPolicy::FirstSeen).shared()
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_previous_views() {
        let source = FlakySource::new();
        let settings = settings(Duration::from_secs(5));
        let state = state();

        refresh_once(&source, &settings, &state).await.unwrap();
        assert!(refresh_once(&source, &settings, &state).await.is_err());

        let state = state.read();
        let views = state.views.as_ref().unwrap();
        assert_eq!(views.spread.len(), 1);
        assert_eq!(views.spread[0].spread, 0.5);
        assert!(state.last_error.as_deref().unwrap().contains("price"));
        assert_eq!(state.failures, 1);
    }

    #[tokio::test]
    async fn test_task_refreshes_and_stops_on_shutdown() {
        let source = Arc::new(FlakySource::new());
        let state = state();
        let flag = Arc::new(AtomicBool::new(true));

        let handle = spawn_refresh_task(
            source.clone(),
            settings(Duration::from_millis(20)),
            state.clone(),
            Arc::clone(&flag),
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(state.read().cycles >= 2);
        assert!(state.read().views.is_some());

        flag.store(false, Ordering::Release);
        handle.stop(Duration::from_secs(2)).await;

        let cycles = state.read().cycles;
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(state.read().cycles, cycles);
    }

    #[tokio::test]
    async fn test_stop_without_clearing_flag() {
        let source = Arc::new(FlakySource::new());
        let state = state();
        let flag = Arc::new(AtomicBool::new(true));

        let handle = spawn_refresh_task(
            source.clone(),
            settings(Duration::from_secs(60)),
            state.clone(),
            Arc::clone(&flag),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.read().cycles, 1);

        handle.stop(Duration::from_secs(2)).await;

        assert_eq!(state.read().cycles, 1);
        assert_eq!(source.invalidations.load(Ordering::SeqCst), 0);
        assert!(flag.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_manual_refresh_invalidates_source() {
        let source = Arc::new(FlakySource::new());
        let state = state();
        let flag = Arc::new(AtomicBool::new(true));

        let handle = spawn_refresh_task(
            source.clone(),
            settings(Duration::from_secs(60)),
            state.clone(),
            Arc::clone(&flag),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.read().cycles, 1);

        handle.request_refresh();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(state.read().cycles, 2);
        assert_eq!(source.invalidations.load(Ordering::SeqCst), 1);

        flag.store(false, Ordering::Release);
        handle.stop(Duration::from_secs(2)).await;
    }
}
