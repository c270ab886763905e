// src/core/models.rs

use crate::core::error::GatewayError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use strum::{AsRefStr, Display, EnumIter, EnumString};

// --- Target & Task Models ---

/// An address a task connects to.
///
/// `Literal` only appears when DNS produced no A/AAAA records and the requested
/// host is handed to the connect step as-is. Serialises as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScanAddress {
    Ip(IpAddr),
    Literal(String),
}

impl ScanAddress {
    /// Builds an address from user input, preferring the IP form when it parses.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
        match trimmed.parse::<IpAddr>() {
            Ok(ip) => ScanAddress::Ip(ip),
            Err(_) => ScanAddress::Literal(raw.trim().to_string()),
        }
    }

    /// The `host:port` form expected by `openssl s_client -connect`.
    pub fn connect_string(&self, port: u16) -> String {
        match self {
            ScanAddress::Ip(IpAddr::V6(v6)) => format!("[{v6}]:{port}"),
            ScanAddress::Ip(IpAddr::V4(v4)) => format!("{v4}:{port}"),
            ScanAddress::Literal(host) => format!("{host}:{port}"),
        }
    }
}

impl fmt::Display for ScanAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanAddress::Ip(ip) => write!(f, "{ip}"),
            ScanAddress::Literal(host) => write!(f, "{host}"),
        }
    }
}

impl From<IpAddr> for ScanAddress {
    fn from(ip: IpAddr) -> Self {
        ScanAddress::Ip(ip)
    }
}

/// The outcome of name resolution for one requested host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTarget {
    pub requested_host: String,
    pub canonical_name: String,
    pub cname_chain: Vec<String>,
    pub resolved_ips: Vec<ScanAddress>,
}

/// How TLS is negotiated on a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
pub enum NegotiationMode {
    Implicit,
    #[serde(rename = "StartTLS")]
    #[strum(serialize = "StartTLS")]
    StartTls,
}

/// STARTTLS dialects understood by `openssl s_client -starttls`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
    Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StartTlsProtocol {
    Smtp,
    Imap,
    Pop3,
    Ftp,
    Xmpp,
}

/// One unit of work: a single (address, port) probe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTask {
    pub ip: ScanAddress,
    pub port: u16,
    pub mode: NegotiationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<StartTlsProtocol>,
    pub sni: String,
}

impl ScanTask {
    pub fn implicit(ip: ScanAddress, port: u16, sni: &str) -> Self {
        Self { ip, port, mode: NegotiationMode::Implicit, protocol: None, sni: sni.to_string() }
    }

    pub fn starttls(ip: ScanAddress, port: u16, protocol: StartTlsProtocol, sni: &str) -> Self {
        Self {
            ip,
            port,
            mode: NegotiationMode::StartTls,
            protocol: Some(protocol),
            sni: sni.to_string(),
        }
    }

    /// Canonical ordering key used for the final report.
    pub fn sort_key(&self) -> (&ScanAddress, u16, NegotiationMode) {
        (&self.ip, self.port, self.mode)
    }
}

impl fmt::Display for ScanTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            Some(protocol) => write!(f, "{} {} ({}/{})", self.ip, self.port, self.mode, protocol),
            None => write!(f, "{} {} ({})", self.ip, self.port, self.mode),
        }
    }
}

// --- Certificate Models ---

/// Structured view of one certificate.
///
/// Every field is extracted independently. A field that could not be read is left
/// empty and its reason is recorded in `field_errors`; a certificate that could not
/// be parsed at all carries `parse_error` and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateMetadata {
    pub subject: Option<String>,
    pub issuer: Option<String>,
    #[serde(default)]
    pub san: Vec<String>,
    pub not_before: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub days_until_expiry: Option<i64>,
    pub serial_number: Option<String>,
    pub public_key_algorithm: Option<String>,
    pub public_key_bits: Option<usize>,
    pub public_key_curve: Option<String>,
    pub public_key_oid: Option<String>,
    pub signature_algorithm_oid: Option<String>,
    pub signature_algorithm_name: Option<String>,
    pub signature_hash_algorithm: Option<String>,
    pub sha256_fingerprint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_errors: BTreeMap<String, String>,
}

impl CertificateMetadata {
    /// Marker entry for a certificate that could not be decoded at all.
    pub fn unparseable(reason: impl Into<String>) -> Self {
        Self { parse_error: Some(reason.into()), ..Default::default() }
    }

    pub fn is_unparseable(&self) -> bool {
        self.parse_error.is_some()
    }

    /// Short one-line label for listings.
    pub fn display_name(&self) -> String {
        match (&self.subject, &self.parse_error) {
            (_, Some(err)) => format!("<unparseable: {err}>"),
            (Some(subject), None) => subject.clone(),
            (None, None) => "<unknown subject>".to_string(),
        }
    }
}

/// A certificate as captured in transit, before metadata extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawCertificate {
    Der(Vec<u8>),
    Malformed(String),
}

// --- Result Models ---

/// The outcome of a single task. Build it through [`FetchResult::success`] or
/// [`FetchResult::failure`] so that `success` and `error` never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchResult {
    pub success: bool,
    pub leaf: Option<CertificateMetadata>,
    pub chain: Option<Vec<CertificateMetadata>>,
    pub error: Option<String>,
    /// Head of the external client's output when it yielded no certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl FetchResult {
    pub fn success(leaf: CertificateMetadata, chain: Vec<CertificateMetadata>) -> Self {
        Self {
            success: true,
            leaf: Some(leaf),
            chain: if chain.is_empty() { None } else { Some(chain) },
            error: None,
            raw_output: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, leaf: None, chain: None, error: Some(error.into()), raw_output: None }
    }

    /// Failure from the external client, keeping any raw output it attached.
    pub fn gateway_failure(error: &GatewayError) -> Self {
        Self { raw_output: error.raw_output().map(str::to_string), ..Self::failure(error.to_string()) }
    }

    pub fn chain_len(&self) -> usize {
        self.chain.as_ref().map_or(0, Vec::len)
    }
}

/// A task paired with its outcome; both are flattened into one JSON record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(flatten)]
    pub task: ScanTask,
    #[serde(flatten)]
    pub result: FetchResult,
}

// --- Main Report ---

/// The aggregate of one scan: one entry per scheduled task, in canonical order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    #[serde(flatten)]
    pub target: ScanTarget,
    pub scanned_at: DateTime<Utc>,
    pub results: Vec<TaskResult>,
}

impl ScanResult {
    pub fn successful(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| r.result.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &TaskResult> {
        self.results.iter().filter(|r| !r.result.success)
    }

    /// Total number of certificates captured across all chains.
    pub fn certificate_count(&self) -> usize {
        self.results
            .iter()
            .map(|r| match &r.result.chain {
                Some(chain) => chain.len(),
                None => usize::from(r.result.leaf.is_some()),
            })
            .sum()
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::str::FromStr;

    #[test]
    fn address_parse_prefers_ip_form() {
        assert_eq!(ScanAddress::parse("192.0.2.1"), ScanAddress::Ip(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))));
        assert_eq!(ScanAddress::parse("[::1]"), ScanAddress::Ip(IpAddr::V6(Ipv6Addr::LOCALHOST)));
        assert_eq!(ScanAddress::parse("mail.example.com"), ScanAddress::Literal("mail.example.com".into()));
    }

    #[test]
    fn connect_string_brackets_ipv6() {
        assert_eq!(ScanAddress::Ip(IpAddr::V6(Ipv6Addr::LOCALHOST)).connect_string(993), "[::1]:993");
        assert_eq!(ScanAddress::parse("10.0.0.1").connect_string(443), "10.0.0.1:443");
        assert_eq!(ScanAddress::parse("host.test").connect_string(25), "host.test:25");
    }

    #[test]
    fn starttls_protocol_names_are_case_insensitive() {
        assert_eq!(StartTlsProtocol::from_str("SMTP").unwrap(), StartTlsProtocol::Smtp);
        assert_eq!(StartTlsProtocol::from_str("pop3").unwrap(), StartTlsProtocol::Pop3);
        assert_eq!(StartTlsProtocol::Xmpp.to_string(), "xmpp");
        assert!(StartTlsProtocol::from_str("ldap").is_err());
    }

    #[test]
    fn fetch_result_constructors_keep_flags_consistent() {
        let ok = FetchResult::success(CertificateMetadata::default(), vec![]);
        assert!(ok.success && ok.error.is_none() && ok.chain.is_none());

        let failed = FetchResult::failure("connection refused");
        assert!(!failed.success && failed.leaf.is_none());
        assert_eq!(failed.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn task_result_serialises_flat() {
        let entry = TaskResult {
            task: ScanTask::starttls(ScanAddress::parse("192.0.2.7"), 25, StartTlsProtocol::Smtp, "mail.example.com"),
            result: FetchResult::failure("connection failed"),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["ip"], "192.0.2.7");
        assert_eq!(value["port"], 25);
        assert_eq!(value["mode"], "StartTLS");
        assert_eq!(value["protocol"], "smtp");
        assert_eq!(value["sni"], "mail.example.com");
        assert_eq!(value["error"], "connection failed");
        assert!(value["leaf"].is_null());

        let back: TaskResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn implicit_task_omits_protocol() {
        let task = ScanTask::implicit(ScanAddress::parse("192.0.2.7"), 443, "example.com");
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["mode"], "Implicit");
        assert!(value.get("protocol").is_none());
    }
}
