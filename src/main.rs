// src/main.rs

use color_eyre::eyre::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use vanguard_rs_certscan::core::config::ScanOptions;
use vanguard_rs_certscan::core::models::ScanResult;
use vanguard_rs_certscan::core::scanner::Scanner;
use vanguard_rs_certscan::logging::initialize_logging;

mod app;
mod ui;

use app::{App, AppState, parse_target_input};

type ScanOutcome = std::result::Result<ScanResult, String>;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    initialize_logging()?;
    info!("Starting {}.", env!("CARGO_PKG_NAME"));

    // --- Setup ---
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableMouseCapture)?;
    enable_raw_mode()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    terminal.clear()?;

    let result = run(&mut terminal).await;

    // --- Restore Terminal ---
    stdout().execute(LeaveAlternateScreen)?;
    stdout().execute(DisableMouseCapture)?;
    disable_raw_mode()?;
    result
}

async fn run(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    let mut app = App::new();
    let (tx, mut rx) = mpsc::channel::<ScanOutcome>(1);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        if event::poll(Duration::from_millis(100))? {
            handle_events(&mut app, &tx)?;
        }
        app.on_tick();

        if let Ok(outcome) = rx.try_recv() {
            app.finish_scan(outcome);
        }
    }
    Ok(())
}

/// Dispatches a key press according to the current screen.
fn handle_events(app: &mut App, tx: &mpsc::Sender<ScanOutcome>) -> Result<()> {
    if let Event::Key(key) = event::read()? {
        if key.kind == KeyEventKind::Press {
            match app.state {
                AppState::Disclaimer => match key.code {
                    KeyCode::Enter => app.state = AppState::Idle,
                    KeyCode::Char('q') => app.quit(),
                    _ => {}
                },
                AppState::Idle => handle_idle_input(app, key.code, tx),
                AppState::Finished => handle_finished_input(app, key.code),
                AppState::Scanning => {
                    if key.code == KeyCode::Char('q') {
                        app.quit();
                    }
                }
            }
        }
    }
    Ok(())
}

fn handle_idle_input(app: &mut App, key_code: KeyCode, tx: &mpsc::Sender<ScanOutcome>) {
    match key_code {
        KeyCode::Char('q') if app.input.is_empty() => app.quit(),
        KeyCode::Char(c) => app.input.push(c),
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Esc => app.quit(),
        KeyCode::Enter => {
            let Some((host, ports)) = parse_target_input(&app.input) else {
                return;
            };
            app.state = AppState::Scanning;
            let tx_clone = tx.clone();

            tokio::spawn(async move {
                let mut options = ScanOptions::from_env();
                if let Some(ports) = ports {
                    options = options.with_ports(ports);
                }
                let outcome = Scanner::new(&options).scan_with(&host, &options).await.map_err(|e| {
                    error!(host = %host, error = %e, "Scan rejected.");
                    e.to_string()
                });
                if tx_clone.send(outcome).await.is_err() {
                    debug!(host = %host, "Scan result receiver dropped.");
                }
            });
        }
        _ => {}
    }
}

fn handle_finished_input(app: &mut App, key_code: KeyCode) {
    match key_code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('n') | KeyCode::Char('N') => app.reset(),
        KeyCode::Char('e') | KeyCode::Char('E') => app.export(),
        KeyCode::Up => app.select_previous(),
        KeyCode::Down => app.select_next(),
        _ => {}
    }
}
