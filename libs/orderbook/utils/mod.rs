//! Process utilities shared by the binaries

mod heartbeat;
mod shutdown;

pub use heartbeat::Heartbeat;
pub use shutdown::ShutdownManager;
