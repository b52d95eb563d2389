//! Raw row preview table

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use crate::domain::{OrderBookRow, OrderType};

pub fn draw(frame: &mut Frame, rows: &[OrderBookRow], offset: usize, area: Rect) {
    // Borders and header take three lines
    let visible = area.height.saturating_sub(3) as usize;
    let end = (offset + visible).min(rows.len());
    let start = offset.min(end);

    let title = if rows.is_empty() {
        " Raw Data Preview ".to_string()
    } else {
        format!(" Raw Data Preview ({}-{} of {}) ", start + 1, end, rows.len())
    };

    let header = Row::new(["Timestamp", "Type", "Level", "Price", "Volume"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let body: Vec<Row> = rows[start..end]
        .iter()
        .map(|row| {
            let color = match row.order_type {
                OrderType::Bid => Color::Green,
                OrderType::Ask => Color::Red,
            };
            Row::new([
                Cell::from(row.timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()),
                Cell::from(row.order_type.as_str()).style(Style::default().fg(color)),
                Cell::from(row.order_level.to_string()),
                Cell::from(format!("{:.2}", row.price)),
                Cell::from(format!("{:.6}", row.volume)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(24),
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(14),
        Constraint::Min(12),
    ];

    let table = Table::new(body, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title));

    frame.render_widget(table, area);
}
