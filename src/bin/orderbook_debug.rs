//! Debug fetch - shows what the snapshot table actually holds
//!
//! Prints the row count, the column names and a preview of the first rows
//! of `SELECT * ... LIMIT n`.
//!
//! Usage:
//!   cargo run --bin orderbook-debug [config.yaml]

use anyhow::{Context, Result};
use serde_json::Value;

use orderbook::infrastructure::clickhouse::queries;
use orderbook::infrastructure::config::OrderBookConfig;
use orderbook::ClickHouseClient;
use orderbook_dashboard::bin_common::{
    load_config, parse_args, resolve_config_path, BinaryRunner, RunConfig,
};

/// Widest a preview column gets before truncation
const MAX_COLUMN_WIDTH: usize = 28;

/// Column names in server order, taken from the first record
fn record_columns(records: &[Value]) -> Vec<String> {
    records
        .first()
        .and_then(Value::as_object)
        .map(|obj| obj.keys().cloned().collect())
        .unwrap_or_default()
}

fn cell_text(value: Option<&Value>) -> String {
    let text = match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    if text.chars().count() > MAX_COLUMN_WIDTH {
        let cut: String = text.chars().take(MAX_COLUMN_WIDTH - 3).collect();
        format!("{}...", cut)
    } else {
        text
    }
}

/// Aligned text table of the first `limit` records
fn format_preview(records: &[Value], columns: &[String], limit: usize) -> Vec<String> {
    let rows: Vec<Vec<String>> = records
        .iter()
        .take(limit)
        .map(|record| columns.iter().map(|c| cell_text(record.get(c))).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    let mut lines = vec![format_line(columns)];
    lines.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-"));
    lines.extend(rows.iter().map(|r| format_line(r)));
    lines
}

struct DebugBinary {
    run_config: RunConfig,
    config: OrderBookConfig,
}

impl BinaryRunner for DebugBinary {
    async fn run(&mut self) -> Result<()> {
        let client = ClickHouseClient::new(&self.config.clickhouse)?;
        client
            .ping()
            .await
            .with_context(|| format!("ClickHouse unreachable at {}", self.config.clickhouse.url))?;

        let sql = queries::select_raw_limit(&self.config.table, self.config.debug.limit);
        let records = client.query_records(&sql).await?;
        let columns = record_columns(&records);

        println!();
        println!("Rows fetched: {}", records.len());
        println!("Columns: [{}]", columns.join(", "));
        println!();
        println!(
            "Raw data preview (first {} rows)",
            self.config.debug.preview_rows.min(records.len())
        );
        for line in format_preview(&records, &columns, self.config.debug.preview_rows) {
            println!("{}", line);
        }

        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.run_config
    }

    fn app_config(&self) -> &OrderBookConfig {
        &self.config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = resolve_config_path(&parse_args());
    let config = load_config(&config_path)?;

    let run_config = RunConfig::new("orderbook-debug", &config_path);
    run_config.init_logging(&config.log_level)?;

    DebugBinary { run_config, config }.execute().await
}
