//! Average-volume heatmap (level × order type)

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::domain::VolumeMatrix;

/// Cold to hot
const SCALE: [Color; 5] = [Color::Blue, Color::Cyan, Color::Green, Color::Yellow, Color::Red];

/// Colour for `value` relative to the largest cell
pub fn heat_color(value: f64, max: f64) -> Color {
    if max <= 0.0 {
        return SCALE[0];
    }
    let ratio = (value / max).clamp(0.0, 1.0);
    let idx = ((ratio * SCALE.len() as f64) as usize).min(SCALE.len() - 1);
    SCALE[idx]
}

fn format_volume(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.2}M", value / 1_000_000.0)
    } else if value >= 10_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{:.4}", value)
    }
}

pub fn draw(frame: &mut Frame, matrix: &VolumeMatrix, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Avg Volume by Level ");

    if matrix.is_empty() {
        frame.render_widget(Paragraph::new(" No rows").block(block), area);
        return;
    }

    let max = matrix.max_value().unwrap_or(0.0);

    let header = Row::new(
        std::iter::once(Cell::from("Level"))
            .chain(matrix.order_types().iter().map(|t| Cell::from(t.as_str()))),
    )
    .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = matrix
        .rows()
        .map(|(level, cells)| {
            let cells = cells.iter().map(|cell| match cell {
                Some(v) => Cell::from(format_volume(*v))
                    .style(Style::default().fg(Color::Black).bg(heat_color(*v, max))),
                // Unobserved pair stays blank
                None => Cell::from(""),
            });
            Row::new(std::iter::once(Cell::from(level.to_string())).chain(cells))
        })
        .collect();

    let widths = std::iter::once(Constraint::Length(6))
        .chain(matrix.order_types().iter().map(|_| Constraint::Min(12)));

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(block);

    frame.render_widget(table, area);
}
