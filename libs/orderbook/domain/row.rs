//! Order-book observation rows
//!
//! One row is one (timestamp, side, level) quote as stored in the snapshot
//! table. Rows come off the wire as JSON objects and are decoded strictly:
//! a batch with a single malformed record is rejected as a whole.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// =============================================================================
// Schema Errors
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("record {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("record {index} is missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("record {index} field '{field}' has wrong type (expected {expected})")]
    WrongType {
        index: usize,
        field: &'static str,
        expected: &'static str,
    },

    #[error("record {index} field '{field}' is invalid: {reason}")]
    InvalidValue {
        index: usize,
        field: &'static str,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, SchemaError>;

/// Column names every record must carry
pub const REQUIRED_FIELDS: [&str; 5] = ["timestamp", "order_type", "order_level", "price", "volume"];

/// Output name for the epoch-millisecond timestamp in selects. Must differ
/// from `timestamp` so WHERE and ORDER BY still see the DateTime64 column.
pub const TIMESTAMP_MS_FIELD: &str = "timestamp_ms";

// =============================================================================
// OrderType
// =============================================================================

/// Side of the book.
///
/// Declared Ask first so ordered collections list columns the same way the
/// stored string values sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderType {
    Ask,
    Bid,
}

impl OrderType {
    /// Stored string value ("Ask" / "Bid")
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Ask => "Ask",
            OrderType::Bid => "Bid",
        }
    }

    /// Parse a stored value, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" => Some(OrderType::Ask),
            "bid" => Some(OrderType::Bid),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// OrderBookRow
// =============================================================================

/// A single quote observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBookRow {
    pub timestamp: DateTime<Utc>,
    pub order_type: OrderType,
    /// Depth level, 1 = top of book
    pub order_level: u32,
    pub price: f64,
    pub volume: f64,
}

impl OrderBookRow {
    pub fn new(
        timestamp: DateTime<Utc>,
        order_type: OrderType,
        order_level: u32,
        price: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            order_type,
            order_level,
            price,
            volume,
        }
    }

    /// Decode one wire record. `index` is only used for error reporting.
    pub fn from_record(index: usize, record: &Value) -> Result<Self> {
        let obj = record
            .as_object()
            .ok_or(SchemaError::NotAnObject { index })?;

        let field = |name: &'static str| {
            obj.get(name)
                .filter(|v| !v.is_null())
                .ok_or(SchemaError::MissingField { index, field: name })
        };

        let timestamp = obj
            .get("timestamp")
            .filter(|v| !v.is_null())
            .or_else(|| obj.get(TIMESTAMP_MS_FIELD).filter(|v| !v.is_null()))
            .ok_or(SchemaError::MissingField {
                index,
                field: "timestamp",
            })?;
        let timestamp = parse_timestamp(index, timestamp)?;

        let order_type = match field("order_type")? {
            Value::String(s) => OrderType::parse(s).ok_or_else(|| SchemaError::InvalidValue {
                index,
                field: "order_type",
                reason: format!("unknown order type '{}'", s),
            })?,
            _ => {
                return Err(SchemaError::WrongType {
                    index,
                    field: "order_type",
                    expected: "string",
                })
            }
        };

        let level = parse_number(index, "order_level", field("order_level")?)?;
        if level.fract() != 0.0 || level < 1.0 || level > u32::MAX as f64 {
            return Err(SchemaError::InvalidValue {
                index,
                field: "order_level",
                reason: format!("expected an integer >= 1, got {}", level),
            });
        }

        let price = parse_number(index, "price", field("price")?)?;

        let volume = parse_number(index, "volume", field("volume")?)?;
        if volume < 0.0 {
            return Err(SchemaError::InvalidValue {
                index,
                field: "volume",
                reason: format!("must be non-negative, got {}", volume),
            });
        }

        Ok(Self {
            timestamp,
            order_type,
            order_level: level as u32,
            price,
            volume,
        })
    }
}

/// Decode a whole batch. Fails on the first malformed record.
pub fn decode_batch(records: &[Value]) -> Result<Vec<OrderBookRow>> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| OrderBookRow::from_record(index, record))
        .collect()
}

// =============================================================================
// Field parsers
// =============================================================================

fn parse_number(index: usize, field: &'static str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => Some(s.trim().parse::<f64>().map_err(|_| SchemaError::InvalidValue {
            index,
            field,
            reason: format!("'{}' is not a number", s),
        })?),
        _ => None,
    };

    let number = parsed.ok_or(SchemaError::WrongType {
        index,
        field,
        expected: "number",
    })?;

    if !number.is_finite() {
        return Err(SchemaError::InvalidValue {
            index,
            field,
            reason: "not a finite number".to_string(),
        });
    }

    Ok(number)
}

/// Accepts epoch milliseconds, RFC 3339, or `YYYY-MM-DD HH:MM:SS[.fff]` (UTC)
fn parse_timestamp(index: usize, value: &Value) -> Result<DateTime<Utc>> {
    let invalid = |reason: String| SchemaError::InvalidValue {
        index,
        field: "timestamp",
        reason,
    };

    match value {
        Value::Number(n) => {
            let millis = n
                .as_i64()
                .ok_or_else(|| invalid(format!("{} is not integer milliseconds", n)))?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| invalid(format!("{} is out of range", millis)))
        }
        Value::String(s) => parse_timestamp_str(s).ok_or_else(|| invalid(format!("unparsable timestamp '{}'", s))),
        _ => Err(SchemaError::WrongType {
            index,
            field: "timestamp",
            expected: "string or integer",
        }),
    }
}

pub(crate) fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();

    // Quoted 64-bit integers are epoch milliseconds
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return s
            .parse::<i64>()
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single());
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
