// src/ui/widgets/summary.rs

use crate::app::{App, AppState};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, Gauge, Paragraph},
};

/// Renders the summary widget: task outcome counts, expiry warnings and the mix
/// of leaf key types. Nothing is drawn until a scan has finished.
///
/// # Arguments
/// * `frame` - The `Frame` used for rendering the UI.
/// * `app` - The application state holding the scan result.
/// * `area` - The `Rect` defining the drawable area for this widget.
pub fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let summary_container = Block::default().borders(Borders::ALL).title("Summary");
    frame.render_widget(summary_container, area);

    let summary_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3), // Target
            Constraint::Length(1), // Success gauge
            Constraint::Length(1), // Spacer
            Constraint::Length(6), // Counts
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Key types
        ])
        .split(area);

    if !matches!(app.state, AppState::Finished) {
        return;
    }
    let Some(result) = &app.scan_result else {
        return;
    };
    let summary = &app.summary;

    // --- Target ---
    let via = if result.target.cname_chain.is_empty() {
        Line::from("no CNAME redirection".dark_gray())
    } else {
        Line::from(format!("via {}", result.target.cname_chain.join(" → "))).dark_gray()
    };
    let target_text = Text::from(vec![
        Line::from(Span::from(result.target.requested_host.clone()).bold()),
        Line::from(format!("canonical: {}", result.target.canonical_name)),
        via,
    ]);
    frame.render_widget(Paragraph::new(target_text), summary_chunks[0]);

    // --- Success Gauge ---
    let percent = if summary.tasks == 0 { 0 } else { (summary.succeeded * 100 / summary.tasks) as u16 };
    let gauge = Gauge::default()
        .percent(percent)
        .label(format!("{}/{} endpoints", summary.succeeded, summary.tasks))
        .style(Style::default().fg(if percent >= 50 { Color::Green } else { Color::Yellow }));
    frame.render_widget(gauge, summary_chunks[1]);

    // --- Counts ---
    let counts_block = Block::default().title("OUTCOME".bold());
    let counts = Text::from(vec![
        Line::from(vec![Span::raw("Addresses:    "), Span::raw(result.target.resolved_ips.len().to_string())]),
        Line::from(vec![Span::raw("Failed:       "), Span::styled(summary.failed.to_string(), Style::default().fg(Color::Red))]),
        Line::from(vec![Span::raw("Certificates: "), Span::styled(summary.certificates.to_string(), Style::default().fg(Color::Cyan))]),
        Line::from(vec![
            Span::raw("Expiring ≤30d: "),
            Span::styled(summary.expiring_soon.to_string(), Style::default().fg(Color::Yellow)),
        ]),
        Line::from(vec![Span::raw("Expired:      "), Span::styled(summary.expired.to_string(), Style::default().fg(Color::Red))]),
    ]);
    frame.render_widget(Paragraph::new(counts).block(counts_block), summary_chunks[3]);

    // --- Key Types ---
    let keys_block = Block::default().title("LEAF KEYS".bold());
    let key_lines: Vec<Line> = if summary.key_mix.is_empty() {
        vec![Line::from("None captured.")]
    } else {
        summary
            .key_mix
            .iter()
            .map(|(label, count)| {
                Line::from(vec![
                    Span::raw("- "),
                    Span::styled(label.clone(), Style::default().fg(Color::Cyan)),
                    Span::raw(format!(" ×{count}")),
                ])
            })
            .collect()
    };
    frame.render_widget(Paragraph::new(key_lines).block(keys_block), summary_chunks[5]);
}
