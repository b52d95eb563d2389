//! ClickHouse access for the order-book snapshot table

mod client;
pub mod queries;

pub use client::{encode_insert, parse_json_each_row, ClickHouseClient, ClickHouseError};
pub use queries::{is_valid_identifier, QueryWindow};
