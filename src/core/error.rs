// src/core/error.rs

use std::time::Duration;
use thiserror::Error;

/// Rejections of the scan request itself. Once task scheduling has begun nothing
/// else is surfaced through this type.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("scan target must not be empty")]
    EmptyTarget,
    #[error("port 0 is not a valid scan port")]
    InvalidPort,
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,
}

/// Failures of the external TLS client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("external TLS client unavailable: {0}")]
    ToolUnavailable(String),
    #[error("external TLS client timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connection(String),
    /// Carries the head of the tool's stdout for diagnosis.
    #[error("no certificates found in external TLS client output")]
    NoCertificates { output: String },
}

/// Characters of raw client output kept on a [`GatewayError::NoCertificates`].
pub const RAW_OUTPUT_EXCERPT: usize = 2000;

impl GatewayError {
    pub fn no_certificates(stdout: &str) -> Self {
        GatewayError::NoCertificates { output: stdout.chars().take(RAW_OUTPUT_EXCERPT).collect() }
    }

    /// Raw client output attached to the error, if any.
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            GatewayError::NoCertificates { output } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

/// Failures of the in-process TLS handshake.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("connection timeout after {}s", .0.as_secs())]
    ConnectTimeout(Duration),
    #[error("connection refused")]
    ConnectionRefused,
    #[error("DNS resolution failed: {0}")]
    Resolution(String),
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("SSL/TLS error: {0}")]
    Tls(String),
    #[error("no certificate returned by server")]
    NoCertificate,
    #[error("TLS connector setup failed: {0}")]
    Setup(String),
    #[error("handshake task panicked: {0}")]
    Panicked(String),
}

impl HandshakeError {
    /// Maps a socket-level error onto the connect variants.
    pub fn from_io(err: &std::io::Error, timeout: Duration) -> Self {
        match err.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                HandshakeError::ConnectTimeout(timeout)
            }
            std::io::ErrorKind::ConnectionRefused => HandshakeError::ConnectionRefused,
            _ => HandshakeError::Connect(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn io_errors_map_to_connect_variants() {
        let timeout = Duration::from_secs(8);
        let refused = io::Error::from(io::ErrorKind::ConnectionRefused);
        assert_eq!(HandshakeError::from_io(&refused, timeout), HandshakeError::ConnectionRefused);

        let timed_out = io::Error::from(io::ErrorKind::TimedOut);
        assert_eq!(HandshakeError::from_io(&timed_out, timeout).to_string(), "connection timeout after 8s");

        let other = io::Error::new(io::ErrorKind::Other, "network unreachable");
        assert!(matches!(HandshakeError::from_io(&other, timeout), HandshakeError::Connect(_)));
    }

    #[test]
    fn gateway_messages_distinguish_failure_kinds() {
        assert!(GatewayError::ToolUnavailable("openssl not found in PATH".into()).to_string().contains("unavailable"));
        assert_eq!(GatewayError::Timeout(Duration::from_secs(8)).to_string(), "external TLS client timed out after 8s");
        assert!(GatewayError::no_certificates("").to_string().contains("no certificates"));
    }

    #[test]
    fn raw_output_is_truncated() {
        let long = "x".repeat(RAW_OUTPUT_EXCERPT + 500);
        let err = GatewayError::no_certificates(&long);
        assert_eq!(err.raw_output().map(|o| o.chars().count()), Some(RAW_OUTPUT_EXCERPT));
        assert!(!err.to_string().contains("xxx"));
        assert_eq!(GatewayError::no_certificates("").raw_output(), None);
        assert_eq!(GatewayError::Timeout(Duration::from_secs(1)).raw_output(), None);
    }
}
