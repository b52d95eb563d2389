//! CSV export of the most recent snapshot rows

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::domain::{OrderBookRow, OrderType, SchemaError};
use crate::infrastructure::clickhouse::{queries, ClickHouseClient, ClickHouseError};
use crate::infrastructure::config::ExportConfig;

pub const CSV_HEADER: [&str; 6] = [
    "timestamp",
    "platform",
    "order_level",
    "order_type",
    "price",
    "volume",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Query failed: {0}")]
    Query(#[from] ClickHouseError),

    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

/// A stored row including the venue column
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub timestamp: DateTime<Utc>,
    pub platform: String,
    pub order_level: u32,
    pub order_type: OrderType,
    pub price: f64,
    pub volume: f64,
}

impl ExportRow {
    pub fn from_record(index: usize, record: &Value) -> std::result::Result<Self, SchemaError> {
        let row = OrderBookRow::from_record(index, record)?;

        let platform = match record.get("platform") {
            None | Some(Value::Null) => {
                return Err(SchemaError::MissingField {
                    index,
                    field: "platform",
                })
            }
            Some(Value::String(s)) => s.clone(),
            Some(_) => {
                return Err(SchemaError::WrongType {
                    index,
                    field: "platform",
                    expected: "string",
                })
            }
        };

        Ok(Self {
            timestamp: row.timestamp,
            platform,
            order_level: row.order_level,
            order_type: row.order_type,
            price: row.price,
            volume: row.volume,
        })
    }

    fn to_record(&self) -> [String; 6] {
        [
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            self.platform.clone(),
            self.order_level.to_string(),
            self.order_type.to_string(),
            self.price.to_string(),
            self.volume.to_string(),
        ]
    }
}

pub fn decode_export_rows(records: &[Value]) -> std::result::Result<Vec<ExportRow>, SchemaError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| ExportRow::from_record(index, record))
        .collect()
}

/// Write the header and every row
pub fn write_csv<W: io::Write>(writer: W, rows: &[ExportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.write_record(row.to_record())?;
    }

    writer.flush()?;
    Ok(())
}

/// Write rows to `path`, creating parent directories
pub fn write_csv_file(path: impl AsRef<Path>, rows: &[ExportRow]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    write_csv(fs::File::create(path)?, rows)
}

/// Export the newest `config.limit` rows of `table`.
///
/// Returns the number of rows written, or `None` when the table returned
/// nothing (no file is written in that case).
pub async fn export_newest(
    client: &ClickHouseClient,
    table: &str,
    config: &ExportConfig,
) -> Result<Option<usize>> {
    let records = client
        .query_records(&queries::select_export(table, config.limit))
        .await?;

    if records.is_empty() {
        return Ok(None);
    }

    let rows = decode_export_rows(&records)?;
    write_csv_file(&config.output_path, &rows)?;

    info!("[Export] Wrote {} rows to {}", rows.len(), config.output_path);
    Ok(Some(rows.len()))
}
