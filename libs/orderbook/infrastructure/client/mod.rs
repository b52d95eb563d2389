//! Clients for external venues

pub mod binance;
