//! ClickHouse HTTP client
//!
//! Talks to the HTTP interface directly: the query goes in the POST body,
//! results come back as `JSONEachRow` (one JSON object per line).

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::infrastructure::config::ClickHouseConfig;

#[derive(Error, Debug)]
pub enum ClickHouseError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("ClickHouse returned {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("Failed to decode line {line}: {source}")]
    DecodeFailed {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode rows: {0}")]
    EncodeFailed(#[source] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClickHouseError>;

/// Thin ClickHouse HTTP client
pub struct ClickHouseClient {
    base_url: String,
    user: String,
    password: String,
    database: String,
    client: Client,
}

impl ClickHouseClient {
    pub fn new(config: &ClickHouseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
            database: config.database.clone(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST a statement and return the raw response body
    async fn post(&self, body: String, settings: &[(&str, &str)]) -> Result<String> {
        let mut params: Vec<(&str, &str)> = vec![("database", self.database.as_str())];
        params.extend_from_slice(settings);

        let response = self
            .client
            .post(format!("{}/", self.base_url))
            .query(&params)
            .header("X-ClickHouse-User", &self.user)
            .header("X-ClickHouse-Key", &self.password)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ClickHouseError::ServerError {
                status: status.as_u16(),
                body: text.trim().to_string(),
            });
        }

        Ok(text)
    }

    /// Run a SELECT and return each row as a JSON object
    pub async fn query_records(&self, sql: &str) -> Result<Vec<Value>> {
        debug!("[ClickHouse] Query: {}", sql);

        let body = self
            .post(
                format!("{} FORMAT JSONEachRow", sql),
                &[("output_format_json_quote_64bit_integers", "0")],
            )
            .await?;
        let records = parse_json_each_row(&body)?;

        debug!("[ClickHouse] Received {} rows", records.len());
        Ok(records)
    }

    /// Run a statement that returns nothing (DDL)
    pub async fn execute(&self, sql: &str) -> Result<()> {
        debug!("[ClickHouse] Execute: {}", sql);
        self.post(sql.to_string(), &[]).await?;
        Ok(())
    }

    /// Insert serializable rows in one `JSONEachRow` batch
    pub async fn insert_json_rows<T: Serialize>(&self, table: &str, rows: &[T]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let body = encode_insert(table, rows)?;
        self.post(body, &[("date_time_input_format", "best_effort")])
            .await?;

        debug!("[ClickHouse] Inserted {} rows into {}", rows.len(), table);
        Ok(())
    }

    /// `SELECT 1` round trip
    pub async fn ping(&self) -> Result<()> {
        self.post("SELECT 1".to_string(), &[]).await.map(|_| ())
    }
}

/// Parse newline-delimited JSON objects, skipping blank lines
pub fn parse_json_each_row(body: &str) -> Result<Vec<Value>> {
    body.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|source| ClickHouseError::DecodeFailed {
                line: i + 1,
                source,
            })
        })
        .collect()
}

/// Build an `INSERT ... FORMAT JSONEachRow` body
pub fn encode_insert<T: Serialize>(table: &str, rows: &[T]) -> Result<String> {
    let mut body = format!("INSERT INTO {} FORMAT JSONEachRow\n", table);
    for row in rows {
        body.push_str(&serde_json::to_string(row).map_err(ClickHouseError::EncodeFailed)?);
        body.push('\n');
    }
    Ok(body)
}
