//! Order-book row sources
//!
//! The dashboard only depends on [`OrderBookSource`]. The ClickHouse source
//! does the query and strict decoding, [`CachedSource`] puts a TTL cache in
//! front of any source.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use crate::domain::{decode_batch, OrderBookRow, SchemaError};
use crate::infrastructure::cache::{CacheStats, TtlCache};
use crate::infrastructure::clickhouse::{queries, ClickHouseClient, ClickHouseError, QueryWindow};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Query failed: {0}")]
    Query(#[from] ClickHouseError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),
}

pub type Result<T> = std::result::Result<T, SourceError>;

/// Anything that can produce a batch of rows for a query window
#[async_trait]
pub trait OrderBookSource: Send + Sync {
    async fn fetch(&self, window: &QueryWindow) -> Result<Arc<Vec<OrderBookRow>>>;

    /// Drop anything memoized so the next fetch reads fresh data
    fn invalidate(&self) {}
}

// =============================================================================
// ClickHouse
// =============================================================================

pub struct ClickHouseSource {
    client: ClickHouseClient,
    table: String,
}

impl ClickHouseSource {
    pub fn new(client: ClickHouseClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl OrderBookSource for ClickHouseSource {
    async fn fetch(&self, window: &QueryWindow) -> Result<Arc<Vec<OrderBookRow>>> {
        let sql = queries::select_window(&self.table, window);
        let records = self.client.query_records(&sql).await?;
        let rows = decode_batch(&records)?;

        debug!("[Source] {} rows for {}", rows.len(), window);
        Ok(Arc::new(rows))
    }
}

// =============================================================================
// TTL cache
// =============================================================================

/// Memoizes another source per query window
pub struct CachedSource<S> {
    inner: S,
    cache: Mutex<TtlCache<QueryWindow, Arc<Vec<OrderBookRow>>>>,
}

impl<S: OrderBookSource> CachedSource<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Mutex::new(TtlCache::new(ttl)),
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: OrderBookSource> OrderBookSource for CachedSource<S> {
    async fn fetch(&self, window: &QueryWindow) -> Result<Arc<Vec<OrderBookRow>>> {
        // Lock is released before the inner fetch
        let cached = self
            .cache
            .lock()
            .get(window)
            .map(|entry| Arc::clone(&entry.value));

        if let Some(rows) = cached {
            debug!("[Source] Cache hit for {}", window);
            return Ok(rows);
        }

        // Age is measured from when the query was issued
        let started = Instant::now();
        let rows = self.inner.fetch(window).await?;

        let mut cache = self.cache.lock();
        cache.purge_expired();
        cache.insert_at(*window, Arc::clone(&rows), started);

        Ok(rows)
    }

    fn invalidate(&self) {
        self.cache.lock().clear();
        self.inner.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderType;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl OrderBookSource for CountingSource {
        async fn fetch(&self, _window: &QueryWindow) -> Result<Arc<Vec<OrderBookRow>>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SchemaError::MissingField { index: 0, field: "volume" }.into());
            }
            Ok(Arc::new(vec![OrderBookRow::new(
                Utc::now(),
                OrderType::Bid,
                1,
                100.0 + n as f64,
                1.0,
            )]))
        }
    }

    #[tokio::test]
    async fn test_cached_within_ttl() {
        let source = CachedSource::new(CountingSource::new(false), Duration::from_secs(10));
        let window = QueryWindow::last_minutes(10);

        let first = source.fetch(&window).await.unwrap();
        let second = source.fetch(&window).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(source.stats().hits, 1);
    }

    #[tokio::test]
    async fn test_refetch_after_ttl() {
        let source = CachedSource::new(CountingSource::new(false), Duration::from_millis(30));
        let window = QueryWindow::last_minutes(10);

        let first = source.fetch(&window).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = source.fetch(&window).await.unwrap();

        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
        assert_ne!(first[0].price, second[0].price);
    }

    #[tokio::test]
    async fn test_windows_cached_separately() {
        let source = CachedSource::new(CountingSource::new(false), Duration::from_secs(10));

        source.fetch(&QueryWindow::last_minutes(10)).await.unwrap();
        source.fetch(&QueryWindow::last_minutes(5)).await.unwrap();
        source.fetch(&QueryWindow::last_minutes(10)).await.unwrap();

        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let source = CachedSource::new(CountingSource::new(true), Duration::from_secs(10));
        let window = QueryWindow::last_minutes(10);

        assert!(matches!(source.fetch(&window).await, Err(SourceError::Schema(_))));
        assert!(source.fetch(&window).await.is_err());
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let source = CachedSource::new(CountingSource::new(false), Duration::from_secs(10));
        let window = QueryWindow::last_minutes(10);

        source.fetch(&window).await.unwrap();
        source.invalidate();
        source.fetch(&window).await.unwrap();

        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 2);
    }
}
