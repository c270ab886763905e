// src/ui/widgets/results_view.rs

use crate::app::{App, AppState, SPINNER_CHARS, key_label};
use ratatui::{
    prelude::*,
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use vanguard_rs_certscan::core::models::{CertificateMetadata, NegotiationMode, TaskResult};

pub fn render_results_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let main_block = Block::default()
        .borders(Borders::ALL)
        .title("Endpoints (Navigate with ↑ ↓)");

    if !matches!(app.state, AppState::Finished) {
        let content = match app.state {
            AppState::Scanning => {
                let spinner_char = SPINNER_CHARS[app.spinner_frame];
                Paragraph::new(Line::from(vec![
                    Span::styled(format!("{} ", spinner_char), Style::default().fg(Color::Cyan)),
                    Span::raw("Resolving and fetching certificates... Please wait."),
                ]))
                .alignment(Alignment::Center)
            }
            _ => Paragraph::new("Certificate chains will appear here...").alignment(Alignment::Center),
        };
        frame.render_widget(content.block(main_block), area);
        return;
    }

    if let Some(error) = &app.scan_error {
        let p = Paragraph::new(Line::from(format!("Scan rejected: {error}")).red())
            .alignment(Alignment::Center)
            .block(main_block);
        frame.render_widget(p, area);
        return;
    }

    let inner_area = main_block.inner(area);
    frame.render_widget(main_block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Min(0)])
        .split(inner_area);

    let items: Vec<ListItem> = app
        .scan_result
        .iter()
        .flat_map(|r| r.results.iter())
        .map(|entry| ListItem::new(task_line(entry)))
        .collect();

    let list = List::new(items).highlight_style(Style::new().bg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_stateful_widget(list, chunks[0], &mut app.results_state);

    let detail_block = Block::default().borders(Borders::TOP).title("Chain");
    let text = match app.selected() {
        Some(entry) => chain_text(entry),
        None => Text::from("No endpoints were scheduled for this target."),
    };
    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: false }).block(detail_block), chunks[1]);
}

fn task_line(entry: &TaskResult) -> Line<'static> {
    let task = &entry.task;
    let mode = match (task.mode, task.protocol) {
        (NegotiationMode::StartTls, Some(protocol)) => format!("StartTLS/{protocol}"),
        (mode, _) => mode.to_string(),
    };
    let outcome = match (&entry.result.leaf, &entry.result.error) {
        (_, Some(error)) => Span::styled(error.clone(), Style::default().fg(Color::Red)),
        (Some(leaf), None) => Span::styled(
            format!("{} [{}] ({} certs)", leaf.display_name(), key_label(leaf), entry.result.chain_len()),
            Style::default().fg(Color::Green),
        ),
        (None, None) => Span::raw("no certificate"),
    };

    Line::from(vec![
        Span::styled(format!("{:<40}", task.ip.connect_string(task.port)), Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{mode:<14}"), Style::default().fg(Color::Cyan)),
        outcome,
    ])
}

fn chain_text(entry: &TaskResult) -> Text<'static> {
    let mut lines = vec![Line::from(vec![Span::raw("SNI: "), Span::styled(entry.task.sni.clone(), Style::default().bold())])];

    if let Some(error) = &entry.result.error {
        lines.push(Line::from(""));
        lines.push(Line::from("ERROR:".red().bold()));
        lines.push(Line::from(error.clone()));
        return Text::from(lines);
    }

    for (depth, cert) in entry.result.chain.iter().flatten().enumerate() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::from(format!("#{depth} {}", cert.display_name())).yellow().bold()));
        lines.extend(certificate_lines(cert));
    }
    Text::from(lines)
}

fn certificate_lines(cert: &CertificateMetadata) -> Vec<Line<'static>> {
    if cert.is_unparseable() {
        return Vec::new();
    }
    let field = |name: &str, value: Option<String>| {
        Line::from(vec![
            Span::styled(format!("  {name:<12}"), Style::default().fg(Color::DarkGray)),
            Span::raw(value.unwrap_or_else(|| "-".to_string())),
        ])
    };

    let expiry = match (cert.not_after, cert.days_until_expiry) {
        (Some(not_after), Some(days)) => Some(format!("{} ({days} days)", not_after.format("%Y-%m-%d"))),
        (Some(not_after), None) => Some(not_after.format("%Y-%m-%d").to_string()),
        _ => None,
    };
    let signature = cert.signature_algorithm_name.clone().or_else(|| cert.signature_algorithm_oid.clone());

    let mut lines = vec![
        field("issuer", cert.issuer.clone()),
        field("expires", expiry),
        field("key", Some(key_label(cert))),
        field("signature", signature),
        field("serial", cert.serial_number.clone()),
        field("sha256", cert.sha256_fingerprint.clone()),
    ];
    if !cert.san.is_empty() {
        lines.push(field("san", Some(cert.san.join(", "))));
    }
    for (name, reason) in &cert.field_errors {
        lines.push(Line::from(format!("  ! {name}: {reason}")).red());
    }
    lines
}
