//! Application Layer
//!
//! Refresh loop and the terminal dashboard.
//! Depends on domain and infrastructure layers.

pub mod dashboard;
pub mod refresh;

pub use dashboard::{App, DashboardState, SharedDashboardState};
pub use refresh::{refresh_once, spawn_refresh_task, RefreshHandle, RefreshSettings};
