//! Graceful shutdown management

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::time::sleep;
use tracing::info;

/// Shared run flag. `true` while the process should keep going.
pub struct ShutdownManager {
    flag: Arc<AtomicBool>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Wrap an existing flag (tasks that were handed a clone)
    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    /// Spawn a Ctrl+C handler that clears the flag
    pub fn spawn_signal_handler(&self) {
        let flag = Arc::clone(&self.flag);
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                info!("Received shutdown signal (Ctrl+C)");
                flag.store(false, Ordering::Release);
            }
        });
    }

    /// Request shutdown from inside the process (e.g. the `q` key)
    pub fn trigger(&self) {
        self.flag.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Clone of the flag for async tasks
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Sleep for `duration`, waking early once shutdown is requested
    pub async fn interruptible_sleep(&self, duration: Duration) {
        let check_interval = Duration::from_millis(50);
        let mut elapsed = Duration::ZERO;

        while elapsed < duration && self.is_running() {
            sleep(check_interval).await;
            elapsed += check_interval;
        }
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_trigger_clears_shared_flag() {
        let shutdown = ShutdownManager::new();
        let flag = shutdown.flag();
        assert!(shutdown.is_running());

        shutdown.trigger();
        assert!(!flag.load(Ordering::Acquire));
        assert!(!ShutdownManager::from_flag(flag).is_running());
    }

    #[tokio::test]
    async fn test_interruptible_sleep_returns_early() {
        let shutdown = ShutdownManager::new();
        shutdown.trigger();

        let start = Instant::now();
        shutdown.interruptible_sleep(Duration::from_secs(5)).await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
