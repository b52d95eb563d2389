//! Spread-over-time line chart

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    symbols,
    text::Span,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, Paragraph},
    Frame,
};

use crate::domain::SpreadPoint;

/// Chart points as (seconds since first point, spread)
pub fn chart_points(series: &[SpreadPoint]) -> Vec<(f64, f64)> {
    let Some(first) = series.first() else {
        return Vec::new();
    };

    series
        .iter()
        .map(|p| {
            let offset = (p.timestamp - first.timestamp).num_milliseconds() as f64 / 1000.0;
            (offset, p.spread)
        })
        .collect()
}

/// Axis bounds padded so a flat or single-point series still renders
pub fn bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });

    if !min.is_finite() {
        return [0.0, 1.0];
    }
    if max - min < f64::EPSILON {
        let pad = if min == 0.0 { 1.0 } else { min.abs() * 0.01 };
        return [min - pad, max + pad];
    }
    [min, max]
}

pub fn draw(frame: &mut Frame, series: &[SpreadPoint], area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Spread ({} points) ", series.len()));

    if series.is_empty() {
        frame.render_widget(Paragraph::new(" No two-sided timestamps").block(block), area);
        return;
    }

    let points = chart_points(series);
    let x = bounds(points.iter().map(|p| p.0));
    let y = bounds(points.iter().map(|p| p.1));

    let first = series[0].timestamp;
    let last = series[series.len() - 1].timestamp;
    let x_labels = vec![
        Span::raw(first.format("%H:%M:%S").to_string()),
        Span::raw(last.format("%H:%M:%S").to_string()),
    ];
    let y_labels = vec![
        Span::raw(format!("{:.2}", y[0])),
        Span::raw(format!("{:.2}", (y[0] + y[1]) / 2.0)),
        Span::raw(format!("{:.2}", y[1])),
    ];

    let dataset = Dataset::default()
        .name("ask - bid")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(x)
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds(y)
                .labels(y_labels),
        );

    frame.render_widget(chart, area);
}
