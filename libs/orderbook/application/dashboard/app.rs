//! Dashboard application state and key handling

use crossterm::event::KeyCode;
use std::time::Duration;
use tracing::info;

use super::state::SharedDashboardState;
use crate::application::refresh::RefreshHandle;
use crate::utils::ShutdownManager;

/// Grace period for the refresh task on quit
const STOP_GRACE: Duration = Duration::from_secs(3);

pub struct App {
    pub state: SharedDashboardState,
    refresh: RefreshHandle,
    shutdown: ShutdownManager,
    /// First preview row shown
    pub preview_offset: usize,
    pub should_quit: bool,
}

impl App {
    pub fn new(state: SharedDashboardState, refresh: RefreshHandle, shutdown: ShutdownManager) -> Self {
        Self {
            state,
            refresh,
            shutdown,
            preview_offset: 0,
            should_quit: false,
        }
    }

    /// Apply one key press
    pub fn handle_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.quit(),
            KeyCode::Char('r') => self.refresh.request_refresh(),
            KeyCode::Char('j') | KeyCode::Down => self.scroll_down(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_up(1),
            KeyCode::PageDown => self.scroll_down(10),
            KeyCode::PageUp => self.scroll_up(10),
            KeyCode::Home => self.preview_offset = 0,
            _ => {}
        }
    }

    pub fn scroll_down(&mut self, by: usize) {
        let last = self.state.read().preview_len().saturating_sub(1);
        self.preview_offset = (self.preview_offset + by).min(last);
    }

    pub fn scroll_up(&mut self, by: usize) {
        self.preview_offset = self.preview_offset.saturating_sub(by);
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
        self.shutdown.trigger();
    }

    /// True once quit was requested here or by Ctrl+C
    pub fn is_done(&self) -> bool {
        self.should_quit || !self.shutdown.is_running()
    }

    /// Refresh task died without a shutdown request
    pub fn refresh_stopped(&self) -> bool {
        self.refresh.is_finished() && self.shutdown.is_running()
    }

    pub async fn shutdown(self) {
        info!("[Dashboard] Shutting down...");
        self.shutdown.trigger();
        self.refresh.stop(STOP_GRACE).await;
    }
}
