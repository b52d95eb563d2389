//! SQL for the order-book snapshot table
//!
//! Timestamps are selected as epoch milliseconds so rows decode the same way
//! whatever timezone the column was declared with. The converted value gets
//! its own name: ClickHouse resolves a select alias before a column of the
//! same name, so reusing `timestamp` would make filters compare milliseconds
//! against a DateTime64.

use std::fmt;

use crate::domain::TIMESTAMP_MS_FIELD;

/// Stored columns read for view building, after the timestamp
const VIEW_COLUMNS: &str = "order_type, order_level, price, volume";

/// Stored columns read for export (adds the venue)
const EXPORT_COLUMNS: &str = "platform, order_level, order_type, price, volume";

/// True if `name` is safe to splice into SQL as a table identifier
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Which slice of the table a query covers. Also the cache key for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryWindow {
    /// Only rows newer than now − lookback
    pub lookback_minutes: Option<u32>,
    pub limit: Option<usize>,
    pub newest_first: bool,
}

impl QueryWindow {
    /// Rows from the last `minutes` minutes
    pub fn last_minutes(minutes: u32) -> Self {
        Self {
            lookback_minutes: Some(minutes),
            limit: None,
            newest_first: false,
        }
    }

    /// First `limit` rows in storage order
    pub fn limit(limit: usize) -> Self {
        Self {
            lookback_minutes: None,
            limit: Some(limit),
            newest_first: false,
        }
    }

    /// The `limit` most recent rows
    pub fn newest(limit: usize) -> Self {
        Self {
            lookback_minutes: None,
            limit: Some(limit),
            newest_first: true,
        }
    }
}

impl fmt::Display for QueryWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.lookback_minutes, self.limit) {
            (Some(m), Some(l)) => write!(f, "last {}m, limit {}", m, l),
            (Some(m), None) => write!(f, "last {}m", m),
            (None, Some(l)) if self.newest_first => write!(f, "newest {}", l),
            (None, Some(l)) => write!(f, "limit {}", l),
            (None, None) => write!(f, "all rows"),
        }
    }
}

fn select(columns: &str, table: &str, window: &QueryWindow) -> String {
    let mut sql = format!(
        "SELECT toUnixTimestamp64Milli(timestamp) AS {}, {} FROM {}",
        TIMESTAMP_MS_FIELD, columns, table
    );

    if let Some(minutes) = window.lookback_minutes {
        sql.push_str(&format!(" WHERE timestamp > now64(3) - INTERVAL {} MINUTE", minutes));
    }
    if window.newest_first {
        sql.push_str(" ORDER BY timestamp DESC");
    }
    if let Some(limit) = window.limit {
        sql.push_str(&format!(" LIMIT {}", limit));
    }

    sql
}

/// Rows for the dashboard views
pub fn select_window(table: &str, window: &QueryWindow) -> String {
    select(VIEW_COLUMNS, table, window)
}

/// Newest `limit` rows with every stored column
pub fn select_export(table: &str, limit: usize) -> String {
    select(EXPORT_COLUMNS, table, &QueryWindow::newest(limit))
}

/// `SELECT *` for inspecting what the table actually holds
pub fn select_raw_limit(table: &str, limit: usize) -> String {
    format!("SELECT * FROM {} LIMIT {}", table, limit)
}

/// MergeTree snapshot table ordered by time
pub fn create_table(table: &str, timezone: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n\
         \x20   timestamp DateTime64(3, '{tz}'),\n\
         \x20   platform String CODEC(ZSTD(1)),\n\
         \x20   order_level Float64 CODEC(ZSTD(1)),\n\
         \x20   order_type String CODEC(ZSTD(1)),\n\
         \x20   price Float64 CODEC(ZSTD(1)),\n\
         \x20   volume Float64 CODEC(ZSTD(1))\n\
         ) ENGINE = MergeTree() ORDER BY timestamp",
        table = table,
        tz = timezone.replace('\'', ""),
    )
}
