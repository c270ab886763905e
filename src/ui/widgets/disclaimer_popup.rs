// src/ui/widgets/disclaimer_popup.rs

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    text::Line,
};

/// Renders the start-up disclaimer as a centred modal over the UI.
///
/// # Arguments
/// * `frame` - A mutable reference to the `Frame` used for rendering the TUI.
/// * `area` - The `Rect` representing the total area available for rendering.
pub fn render_disclaimer_popup(frame: &mut Frame, area: Rect) {
    let disclaimer_text = Text::from(vec![
        Line::from("BEFORE YOU SCAN".bold().yellow()),
        Line::from(""),
        Line::from("This tool connects to every TLS port of the target, opens handshakes and runs STARTTLS upgrades to record the certificates each endpoint presents."),
        Line::from(""),
        Line::from("Only scan hosts you operate or are explicitly authorised to assess. Repeated connection attempts against third-party mail and web servers may be logged and treated as hostile."),
        Line::from(""),
        Line::from("Certificates are collected with verification disabled. A successful fetch says nothing about whether the chain is trusted."),
        Line::from(""),
        Line::from("Press ".bold() + "Enter".bold().yellow() + " to continue or ".bold() + "Q".bold().yellow() + " to quit".bold()),
    ]);

    let block = Block::default()
        .title("Authorised Use Only")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let popup_area = centered_rect(70, 60, area);

    let popup = Paragraph::new(disclaimer_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center);

    // Clear first so the panes underneath do not bleed through.
    frame.render_widget(Clear, popup_area);
    frame.render_widget(popup, popup_area);
}

/// A `Rect` of the given percentages centred in `r`.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}