//! UI widgets for the dashboard

pub mod heatmap;
pub mod preview;
pub mod spread;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::state::DashboardState;
use super::App;

/// Draw the main UI layout
pub fn draw(frame: &mut Frame, app: &App) {
    let state = app.state.read();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Views
            Constraint::Length(3), // Footer
        ])
        .split(frame.area());

    draw_header(frame, &state, chunks[0]);
    draw_main(frame, app, &state, chunks[1]);
    draw_footer(frame, chunks[2]);
}

fn draw_header(frame: &mut Frame, state: &DashboardState, area: Rect) {
    let refreshed = state
        .last_refresh
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());

    let mut spans = vec![Span::raw(format!(
        " {} | {} | Refreshed: {} | Rows: {} | Cycles: {} | Spread: {}",
        state.table,
        state.window,
        refreshed,
        state.row_count(),
        state.cycles,
        state.policy
    ))];

    let color = match &state.last_error {
        Some(error) => {
            spans.push(Span::styled(
                format!(" | Error: {}", error),
                Style::default().fg(Color::Red),
            ));
            Color::Yellow
        }
        None if state.last_refresh.is_some() => Color::Green,
        None => Color::Yellow,
    };

    let header = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title(" Order Book Dashboard "));

    frame.render_widget(header, area);
}

fn draw_main(frame: &mut Frame, app: &App, state: &DashboardState, area: Rect) {
    let Some(views) = state.views.as_ref() else {
        let waiting = Paragraph::new(" Waiting for the first refresh...")
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(waiting, area);
        return;
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[0]);

    spread::draw(frame, &views.spread, top[0]);
    heatmap::draw(frame, &views.volume, top[1]);
    preview::draw(frame, &views.preview, app.preview_offset, rows[1]);
}

fn draw_footer(frame: &mut Frame, area: Rect) {
    let footer = Paragraph::new(" q=quit r=refresh j/k=scroll preview PgUp/PgDn=page")
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(footer, area);
}
