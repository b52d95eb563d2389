//! Logging initialization

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing with standard configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}

/// Initialize tracing with a level from config. `RUST_LOG` still wins.
pub fn init_tracing_with_level(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .init();
}

/// Log to an append-only file, and to the console when `console` is set.
///
/// The terminal dashboard passes `console = false`: anything written to
/// stdout would corrupt the alternate screen.
pub fn init_tracing_with_file(level: &str, path: impl AsRef<Path>, console: bool) -> std::io::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let file_layer = fmt::layer()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false);

    let console_layer = console.then(|| {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_line_number(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(file_layer)
        .with(console_layer)
        .init();

    Ok(())
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}
