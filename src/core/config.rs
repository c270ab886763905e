// src/core/config.rs

//! Scan configuration: port classification tables and per-scan options.
//!
//! Options start from compiled-in defaults and can be overridden through
//! environment variables prefixed with the project name, the same way the log
//! level is picked up in `logging.rs`.

use crate::core::error::ScanError;
use crate::core::models::StartTlsProtocol;
use lazy_static::lazy_static;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use strum::IntoEnumIterator;
use tracing::{debug, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_OPENSSL: &str = "openssl";

/// Ports where the handshake starts right after connect.
pub const IMPLICIT_TLS_PORTS: &[u16] = &[443, 8443, 993, 995, 465, 5061];

/// Ports where a plaintext greeting precedes the upgrade.
pub const STARTTLS_PORTS: &[(u16, StartTlsProtocol)] = &[
    (25, StartTlsProtocol::Smtp),
    (587, StartTlsProtocol::Smtp),
    (143, StartTlsProtocol::Imap),
    (110, StartTlsProtocol::Pop3),
    (21, StartTlsProtocol::Ftp),
    (5222, StartTlsProtocol::Xmpp),
];

lazy_static! {
    static ref ENV_PREFIX: String = env!("CARGO_CRATE_NAME").to_uppercase();
    pub static ref TIMEOUT_ENV: String = format!("{}_TIMEOUT", ENV_PREFIX.as_str());
    pub static ref CONCURRENCY_ENV: String = format!("{}_CONCURRENCY", ENV_PREFIX.as_str());
    pub static ref STARTTLS_ENV: String = format!("{}_STARTTLS", ENV_PREFIX.as_str());
    pub static ref OPENSSL_ENV: String = format!("{}_OPENSSL", ENV_PREFIX.as_str());
    pub static ref RESOLVE_ALL_IPS_ENV: String = format!("{}_RESOLVE_ALL_IPS", ENV_PREFIX.as_str());
    pub static ref FOLLOW_CNAME_ENV: String = format!("{}_FOLLOW_CNAME", ENV_PREFIX.as_str());
}

/// Static port classification consulted by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortTable {
    implicit: BTreeSet<u16>,
    starttls: BTreeMap<u16, StartTlsProtocol>,
}

impl PortTable {
    pub fn new(
        implicit: impl IntoIterator<Item = u16>,
        starttls: impl IntoIterator<Item = (u16, StartTlsProtocol)>,
    ) -> Self {
        Self {
            implicit: implicit.into_iter().collect(),
            starttls: starttls.into_iter().collect(),
        }
    }

    pub fn with_implicit(mut self, port: u16) -> Self {
        self.implicit.insert(port);
        self
    }

    pub fn with_starttls(mut self, port: u16, protocol: StartTlsProtocol) -> Self {
        self.starttls.insert(port, protocol);
        self
    }

    pub fn is_implicit(&self, port: u16) -> bool {
        self.implicit.contains(&port)
    }

    pub fn starttls_protocol(&self, port: u16) -> Option<StartTlsProtocol> {
        self.starttls.get(&port).copied()
    }

    /// Sorted union of both tables; the default port list.
    pub fn all_ports(&self) -> Vec<u16> {
        self.implicit
            .iter()
            .chain(self.starttls.keys())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl Default for PortTable {
    fn default() -> Self {
        Self::new(IMPLICIT_TLS_PORTS.iter().copied(), STARTTLS_PORTS.iter().copied())
    }
}

/// What to do with a port that appears in neither table (or whose STARTTLS
/// protocol is not enabled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnmappedPortPolicy {
    /// Probe it with an implicit TLS handshake anyway.
    #[default]
    Implicit,
    /// Do not schedule a task for it.
    Skip,
}

/// Everything a single scan needs besides the host name.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Explicit port list; `None` or empty means every port in `port_table`.
    pub ports: Option<Vec<u16>>,
    pub follow_cname: bool,
    pub resolve_all_ips: bool,
    pub starttls: BTreeSet<StartTlsProtocol>,
    pub concurrency: usize,
    pub timeout: Duration,
    pub openssl_path: PathBuf,
    pub unmapped_ports: UnmappedPortPolicy,
    pub port_table: PortTable,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            ports: None,
            follow_cname: true,
            resolve_all_ips: true,
            starttls: BTreeSet::new(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            openssl_path: PathBuf::from(DEFAULT_OPENSSL),
            unmapped_ports: UnmappedPortPolicy::default(),
            port_table: PortTable::default(),
        }
    }
}

impl ScanOptions {
    /// Defaults overlaid with any `<PROJECT>_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ScanOptions::from_env`] but reading from an arbitrary source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(raw) = lookup(&TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => options.timeout = Duration::from_secs(secs),
                _ => warn!(var = %TIMEOUT_ENV.as_str(), value = %raw, "Ignoring invalid timeout."),
            }
        }
        if let Some(raw) = lookup(&CONCURRENCY_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => options.concurrency = n,
                _ => warn!(var = %CONCURRENCY_ENV.as_str(), value = %raw, "Ignoring invalid concurrency."),
            }
        }
        if let Some(raw) = lookup(&STARTTLS_ENV) {
            options.starttls = parse_protocol_list(&raw);
        }
        if let Some(raw) = lookup(&OPENSSL_ENV) {
            if !raw.trim().is_empty() {
                options.openssl_path = PathBuf::from(raw.trim());
            }
        }
        if let Some(raw) = lookup(&RESOLVE_ALL_IPS_ENV) {
            match parse_flag(&raw) {
                Some(flag) => options.resolve_all_ips = flag,
                None => warn!(var = %RESOLVE_ALL_IPS_ENV.as_str(), value = %raw, "Ignoring invalid flag."),
            }
        }
        if let Some(raw) = lookup(&FOLLOW_CNAME_ENV) {
            match parse_flag(&raw) {
                Some(flag) => options.follow_cname = flag,
                None => warn!(var = %FOLLOW_CNAME_ENV.as_str(), value = %raw, "Ignoring invalid flag."),
            }
        }

        debug!(?options, "Scan options loaded.");
        options
    }

    pub fn with_ports(mut self, ports: impl IntoIterator<Item = u16>) -> Self {
        self.ports = Some(ports.into_iter().collect());
        self
    }

    pub fn with_starttls(mut self, protocols: impl IntoIterator<Item = StartTlsProtocol>) -> Self {
        self.starttls = protocols.into_iter().collect();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn uses_default_ports(&self) -> bool {
        self.ports.as_ref().is_none_or(|p| p.is_empty())
    }

    /// The ports to scan, de-duplicated in their original order.
    pub fn effective_ports(&self) -> Vec<u16> {
        match &self.ports {
            Some(ports) if !ports.is_empty() => {
                let mut seen = BTreeSet::new();
                ports.iter().copied().filter(|p| seen.insert(*p)).collect()
            }
            _ => self.port_table.all_ports(),
        }
    }

    /// STARTTLS protocols to attempt. A full default-port sweep with nothing
    /// selected enables every protocol.
    pub fn effective_starttls(&self) -> BTreeSet<StartTlsProtocol> {
        if self.starttls.is_empty() && self.uses_default_ports() {
            StartTlsProtocol::iter().collect()
        } else {
            self.starttls.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.concurrency == 0 {
            return Err(ScanError::ZeroConcurrency);
        }
        if self.ports.as_ref().is_some_and(|ports| ports.contains(&0)) {
            return Err(ScanError::InvalidPort);
        }
        Ok(())
    }
}

/// Parses a comma/space separated protocol list, dropping unknown names.
pub fn parse_protocol_list(raw: &str) -> BTreeSet<StartTlsProtocol> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .filter_map(|name| match StartTlsProtocol::from_str(name) {
            Ok(protocol) => Some(protocol),
            Err(_) => {
                warn!(protocol = name, "Unknown STARTTLS protocol ignored.");
                None
            }
        })
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
