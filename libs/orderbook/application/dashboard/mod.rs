//! Order-book dashboard
//!
//! Terminal UI over the shared dashboard state. The refresh task writes the
//! state, the UI loop only reads it.

pub mod app;
pub mod state;
pub mod ui;

pub use app::App;
pub use state::{DashboardState, SharedDashboardState};
