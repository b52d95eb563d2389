//! Order book dashboard - terminal UI over the snapshot table
//!
//! Shows spread over time, the average-volume heatmap and a raw preview of
//! the configured window, refreshed on a fixed interval.
//!
//! Usage:
//!   cargo run --bin orderbook-dashboard [config.yaml]

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info};

use orderbook::application::dashboard::{ui, App, DashboardState};
use orderbook::application::refresh::{spawn_refresh_task, RefreshSettings};
use orderbook::infrastructure::config::OrderBookConfig;
use orderbook::{CachedSource, ClickHouseClient, ClickHouseSource, OrderBookSource, ShutdownManager};
use orderbook_dashboard::bin_common::{load_config, parse_args, resolve_config_path};

/// Input poll timeout; also the redraw cadence
const POLL_INTERVAL: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    let config_path = resolve_config_path(&parse_args());
    let config = load_config(&config_path)?;

    // File only: stdout belongs to the alternate screen
    orderbook::init_tracing_with_file(&config.log_level, &config.dashboard.log_file, false)?;
    info!("[Dashboard] Config: {}", config_path.display());
    config.log();

    let runtime = tokio::runtime::Runtime::new()?;
    let _guard = runtime.enter();

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let mut app = build_app(&config, shutdown)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    runtime.block_on(app.shutdown());

    if let Err(e) = &result {
        error!("[Dashboard] {:#}", e);
        eprintln!("Error: {:#}", e);
    }

    result
}

fn build_app(config: &OrderBookConfig, shutdown: ShutdownManager) -> Result<App> {
    let client = ClickHouseClient::new(&config.clickhouse)?;
    let source: Arc<dyn OrderBookSource> = Arc::new(CachedSource::new(
        ClickHouseSource::new(client, config.table.clone()),
        config.dashboard.cache_ttl(),
    ));

    let settings = RefreshSettings::from_config(&config.dashboard);
    let state = DashboardState::new(
        config.table.clone(),
        settings.window,
        config.dashboard.spread_policy,
    )
    .shared();

    let refresh = spawn_refresh_task(source, settings, state.clone(), shutdown.flag());

    Ok(App::new(state, refresh, shutdown))
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    // Raw mode swallows SIGINT
                    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                        app.quit();
                    } else {
                        app.handle_key(key.code);
                    }
                }
            }
        }

        if app.is_done() {
            break;
        }

        if app.refresh_stopped() {
            anyhow::bail!("refresh task stopped unexpectedly");
        }
    }

    Ok(())
}
