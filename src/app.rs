// src/app.rs

use color_eyre::eyre::{Result, WrapErr};
use ratatui::widgets::ListState;
use std::collections::BTreeMap;
use std::path::PathBuf;
use url::Url;
use vanguard_rs_certscan::core::models::{CertificateMetadata, ScanResult, TaskResult};
use vanguard_rs_certscan::logging::get_data_dir;

pub const SPINNER_CHARS: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Certificates closer than this to expiry are counted as expiring soon.
const EXPIRY_WARNING_DAYS: i64 = 30;

pub enum ExportStatus {
    Idle,
    Success(String),
    Error(String),
}

pub enum AppState {
    Disclaimer,
    Idle,
    Scanning,
    Finished,
}

#[derive(Debug, Default)]
pub struct ScanSummary {
    pub tasks: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub certificates: usize,
    pub expiring_soon: usize,
    pub expired: usize,
    /// Leaf key types, e.g. "RSA-2048" or "ECDSA secp256r1", with their counts.
    pub key_mix: BTreeMap<String, usize>,
}

impl ScanSummary {
    pub fn from_result(result: &ScanResult) -> Self {
        let mut summary = ScanSummary {
            tasks: result.results.len(),
            succeeded: result.successful().count(),
            failed: result.failed().count(),
            certificates: result.certificate_count(),
            ..Default::default()
        };

        for entry in result.successful() {
            if let Some(leaf) = &entry.result.leaf {
                *summary.key_mix.entry(key_label(leaf)).or_default() += 1;
            }
            for cert in entry.result.chain.iter().flatten() {
                match cert.days_until_expiry {
                    Some(days) if days < 0 => summary.expired += 1,
                    Some(days) if days <= EXPIRY_WARNING_DAYS => summary.expiring_soon += 1,
                    _ => {}
                }
            }
        }
        summary
    }
}

/// Short key description used in listings.
pub fn key_label(cert: &CertificateMetadata) -> String {
    let algorithm = cert.public_key_algorithm.as_deref().unwrap_or("unknown");
    match (&cert.public_key_curve, cert.public_key_bits) {
        (Some(curve), _) => format!("{algorithm} {curve}"),
        (None, Some(bits)) => format!("{algorithm}-{bits}"),
        (None, None) => algorithm.to_string(),
    }
}

/// Splits operator input such as `example.com`, `example.com:443,993`,
/// `https://example.com:8443/` or `[2001:db8::1]:443` into host and ports.
pub fn parse_target_input(raw: &str) -> Option<(String, Option<Vec<u16>>)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if raw.contains("://") {
        let url = Url::parse(raw).ok()?;
        let host = url.host_str()?.trim_start_matches('[').trim_end_matches(']').to_string();
        return Some((host, url.port().map(|p| vec![p])));
    }

    let (host, ports) = match raw.rsplit_once(':') {
        Some((head, tail))
            if !tail.is_empty()
                && tail.chars().all(|c| c.is_ascii_digit() || c == ',')
                && (!head.contains(':') || head.ends_with(']')) =>
        {
            let ports: Vec<u16> = tail.split(',').filter_map(|p| p.parse().ok()).collect();
            (head, if ports.is_empty() { None } else { Some(ports) })
        }
        _ => (raw, None),
    };

    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        return None;
    }
    Some((host.to_string(), ports))
}

/// Writes `result` as pretty JSON into the data directory and returns the path.
pub fn export_report(result: &ScanResult) -> Result<PathBuf> {
    let directory = get_data_dir().join("exports");
    std::fs::create_dir_all(&directory).wrap_err("creating export directory")?;

    let host: String = result
        .target
        .requested_host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    let path = directory.join(format!("{}-{}.json", host, result.scanned_at.format("%Y%m%dT%H%M%SZ")));

    let json = result.to_json_pretty().wrap_err("serialising scan result")?;
    std::fs::write(&path, json).wrap_err_with(|| format!("writing {}", path.display()))?;
    Ok(path)
}

pub struct App {
    pub should_quit: bool,
    pub state: AppState,
    pub input: String,
    pub scan_result: Option<ScanResult>,
    pub scan_error: Option<String>,
    pub summary: ScanSummary,
    pub results_state: ListState,
    pub spinner_frame: usize,
    pub export_status: ExportStatus,
}

impl App {
    pub fn new() -> Self {
        Self {
            should_quit: false,
            state: AppState::Disclaimer,
            input: String::new(),
            scan_result: None,
            scan_error: None,
            summary: ScanSummary::default(),
            results_state: ListState::default(),
            spinner_frame: 0,
            export_status: ExportStatus::Idle,
        }
    }

    pub fn selected(&self) -> Option<&TaskResult> {
        let index = self.results_state.selected()?;
        self.scan_result.as_ref()?.results.get(index)
    }

    pub fn select_previous(&mut self) {
        let len = self.result_count();
        if len == 0 {
            return;
        }
        let index = self.results_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.results_state.select(Some(index));
    }

    pub fn select_next(&mut self) {
        let len = self.result_count();
        if len == 0 {
            return;
        }
        let index = self.results_state.selected().map_or(0, |i| (i + 1).min(len - 1));
        self.results_state.select(Some(index));
    }

    fn result_count(&self) -> usize {
        self.scan_result.as_ref().map_or(0, |r| r.results.len())
    }

    pub fn finish_scan(&mut self, outcome: std::result::Result<ScanResult, String>) {
        match outcome {
            Ok(result) => {
                self.summary = ScanSummary::from_result(&result);
                self.results_state.select(if result.results.is_empty() { None } else { Some(0) });
                self.scan_result = Some(result);
                self.scan_error = None;
            }
            Err(e) => {
                self.scan_result = None;
                self.scan_error = Some(e);
            }
        }
        self.state = AppState::Finished;
    }

    pub fn export(&mut self) {
        let Some(result) = &self.scan_result else {
            return;
        };
        self.export_status = match export_report(result) {
            Ok(path) => ExportStatus::Success(path.display().to_string()),
            Err(e) => ExportStatus::Error(format!("{e:#}")),
        };
    }

    pub fn on_tick(&mut self) {
        if matches!(self.state, AppState::Scanning) {
            self.spinner_frame = (self.spinner_frame + 1) % SPINNER_CHARS.len();
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn reset(&mut self) {
        self.state = AppState::Idle;
        self.input = String::new();
        self.scan_result = None;
        self.scan_error = None;
        self.summary = ScanSummary::default();
        self.results_state = ListState::default();
        self.spinner_frame = 0;
        self.export_status = ExportStatus::Idle;
    }
}
