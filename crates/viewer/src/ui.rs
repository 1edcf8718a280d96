//! Rendering of the telemetry view.
//!
//! Layout:
//! ```text
//! ┌ Simulation parameters ─────────────────────────────┐
//! │ alt=50                                             │
//! └ Enter: submit · Esc: quit ─────────────────────────┘
//! ┌ Drone ─────────────────────────────────────────────┐
//! │              ⣿                                     │
//! └────────────────────────────────────────────────────┘
//! ┌ Altitude ──────────────────────────────────────────┐
//! │ 62 ⠤⠒⠉⠉⠒⠤⣀                                          │
//! └────────────────────────────────────────────────────┘
//!  ● Connected  samples: 42  x=1.00 y=2.00 z=3.00
//! ```

use dronewatch_core::{AltitudeSeries, LinkState, TelemetryView};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle},
        Axis, Block, Chart, Dataset, GraphType, Paragraph,
    },
    Frame,
};

/// Virtual drawing surface in pixels; the drone marker is placed in this space.
pub const SURFACE_WIDTH_PX: f64 = 800.0;
pub const SURFACE_HEIGHT_PX: f64 = 300.0;
const MARKER_RADIUS_PX: f64 = 12.0;

const PLACEHOLDER: &str = "Enter simulation parameters...";

/// Input row, drone surface, altitude chart and status line, top to bottom.
pub fn layout(area: Rect) -> [Rect; 4] {
    Layout::vertical([
        Constraint::Length(3),
        Constraint::Percentage(55),
        Constraint::Min(6),
        Constraint::Length(1),
    ])
    .areas(area)
}

pub fn draw(frame: &mut Frame, view: &TelemetryView) {
    let [input, surface, chart, status] = layout(frame.area());

    draw_input(frame, input, view);
    draw_surface(frame, surface, view);
    draw_chart(frame, chart, view.altitude());
    draw_status(frame, status, view);
}

fn draw_input(frame: &mut Frame, area: Rect, view: &TelemetryView) {
    let draft = view.draft();
    let text = if draft.is_empty() {
        Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(draft.as_str(), Style::default().fg(Color::White))
    };
    let block = Block::bordered()
        .title(" Simulation parameters ")
        .title_bottom(" Enter: submit · Esc: quit ");
    frame.render_widget(Paragraph::new(Line::from(text)).block(block), area);

    let inner_width = area.width.saturating_sub(2);
    let typed = draft.as_str().chars().count() as u16;
    frame.set_cursor_position((area.x + 1 + typed.min(inner_width.saturating_sub(1)), area.y + 1));
}

fn draw_surface(frame: &mut Frame, area: Rect, view: &TelemetryView) {
    let pos = view.position();
    // Canvas y grows upwards; pixel offsets grow downwards from the top edge.
    let canvas = Canvas::default()
        .block(Block::bordered().title(" Drone "))
        .marker(Marker::Braille)
        .x_bounds([0.0, SURFACE_WIDTH_PX])
        .y_bounds([-SURFACE_HEIGHT_PX, 0.0])
        .paint(move |ctx| {
            ctx.draw(&Circle {
                x: pos.x_px,
                y: -pos.y_px,
                radius: MARKER_RADIUS_PX,
                color: Color::Yellow,
            });
        });
    frame.render_widget(canvas, area);
}

fn draw_chart(frame: &mut Frame, area: Rect, series: &AltitudeSeries) {
    let points = chart_points(series);
    let (x_bounds, y_bounds) = chart_bounds(&points);

    let dataset = Dataset::default()
        .name("altitude")
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let mid = (y_bounds[0] + y_bounds[1]) / 2.0;
    let chart = Chart::new(vec![dataset])
        .block(Block::bordered().title(" Altitude "))
        .x_axis(Axis::default().bounds(x_bounds))
        .y_axis(
            Axis::default()
                .bounds(y_bounds)
                .style(Style::default().fg(Color::DarkGray))
                .labels(vec![
                    format!("{:.1}", y_bounds[0]),
                    format!("{:.1}", mid),
                    format!("{:.1}", y_bounds[1]),
                ]),
        );
    frame.render_widget(chart, area);
}

fn draw_status(frame: &mut Frame, area: Rect, view: &TelemetryView) {
    let (label, color) = match view.link_state() {
        LinkState::Connected => ("● Connected", Color::Green),
        LinkState::Disconnected => ("○ Disconnected", Color::Red),
    };
    let mut spans = vec![
        Span::styled(format!(" {}", label), Style::default().fg(color)),
        Span::styled(
            format!("  samples: {}", view.samples_applied()),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if let Some(s) = view.last_sample() {
        spans.push(Span::raw(format!("  x={:.2} y={:.2} z={:.2}", s.x, s.y, s.z)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Series as (seconds since the oldest retained point, altitude).
pub fn chart_points(series: &AltitudeSeries) -> Vec<(f64, f64)> {
    let Some(origin) = series.oldest().map(|p| p.time) else {
        return Vec::new();
    };
    series
        .iter()
        .map(|p| ((p.time - origin).num_milliseconds() as f64 / 1000.0, p.altitude))
        .collect()
}

/// Axis bounds covering `points`, padded so a flat line stays visible.
pub fn chart_bounds(points: &[(f64, f64)]) -> ([f64; 2], [f64; 2]) {
    let x_max = points.last().map(|p| p.0).unwrap_or(0.0).max(1.0);
    let (lo, hi) = points
        .iter()
        .map(|p| p.1)
        .fold(None, |acc: Option<(f64, f64)>, a| match acc {
            None => Some((a, a)),
            Some((lo, hi)) => Some((lo.min(a), hi.max(a))),
        })
        .unwrap_or((0.0, 0.0));
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    ([0.0, x_max], [lo - pad, hi + pad])
}
