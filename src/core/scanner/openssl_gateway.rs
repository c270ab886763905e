// src/core/scanner/openssl_gateway.rs

use tracing::{debug, warn};

use crate::core::error::GatewayError;
use crate::core::models::{RawCertificate, ScanAddress, ScanTask, StartTlsProtocol};
use crate::core::scanner::certificate::decode_pem_block;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

static PEM_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)-----BEGIN CERTIFICATE-----.+?-----END CERTIFICATE-----").unwrap());

/// What to ask the external client for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRequest {
    pub address: ScanAddress,
    pub port: u16,
    pub sni: String,
    pub starttls: Option<StartTlsProtocol>,
}

impl ChainRequest {
    pub fn from_task(task: &ScanTask) -> Self {
        Self { address: task.ip.clone(), port: task.port, sni: task.sni.clone(), starttls: task.protocol }
    }
}

/// Retrieves the full presented chain, leaf first, in the order the server sent it.
#[async_trait]
pub trait ChainGateway: Send + Sync {
    async fn fetch_chain(&self, request: &ChainRequest) -> Result<Vec<RawCertificate>, GatewayError>;
}

/// [`ChainGateway`] that shells out to `openssl s_client -showcerts`.
#[derive(Debug, Clone)]
pub struct OpensslGateway {
    program: PathBuf,
    timeout: Duration,
}

impl OpensslGateway {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }

    pub fn args(request: &ChainRequest) -> Vec<String> {
        let mut args = vec![
            "s_client".to_string(),
            "-connect".to_string(),
            request.address.connect_string(request.port),
            "-showcerts".to_string(),
        ];
        if !request.sni.is_empty() {
            args.push("-servername".to_string());
            args.push(request.sni.clone());
        }
        if let Some(protocol) = request.starttls {
            args.push("-starttls".to_string());
            args.push(protocol.to_string());
        }
        args
    }
}

#[async_trait]
impl ChainGateway for OpensslGateway {
    async fn fetch_chain(&self, request: &ChainRequest) -> Result<Vec<RawCertificate>, GatewayError> {
        let args = Self::args(request);
        debug!(program = %self.program.display(), args = ?args, "Spawning external TLS client.");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                warn!(program = %self.program.display(), error = %e, "Could not start external TLS client.");
                GatewayError::ToolUnavailable(format!("{}: {}", self.program.display(), e))
            })?;

        // A single "Q" makes s_client close the session once the handshake is done.
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(b"Q\n").await {
                debug!(error = %e, "External TLS client closed stdin early.");
            }
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(GatewayError::Connection(e.to_string())),
            Err(_) => {
                warn!(endpoint = %request.address.connect_string(request.port), "External TLS client timed out.");
                return Err(GatewayError::Timeout(self.timeout));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let blocks = extract_pem_blocks(&stdout);
        if blocks.is_empty() {
            if !output.status.success() || stdout.trim().is_empty() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(GatewayError::Connection(summarize_stderr(&stderr, output.status.code())));
            }
            return Err(GatewayError::no_certificates(&stdout));
        }

        debug!(count = blocks.len(), "Captured certificate blocks.");
        Ok(decode_pem_blocks(&blocks))
    }
}

/// Returns every `BEGIN/END CERTIFICATE` block in `output`, in order.
pub fn extract_pem_blocks(output: &str) -> Vec<&str> {
    PEM_BLOCK.find_iter(output).map(|m| m.as_str()).collect()
}

/// Decodes each block independently. A block that fails to decode stays in
/// place as [`RawCertificate::Malformed`].
pub fn decode_pem_blocks(blocks: &[&str]) -> Vec<RawCertificate> {
    blocks.iter().map(|block| decode_pem_block(block)).collect()
}

fn summarize_stderr(stderr: &str, code: Option<i32>) -> String {
    let lines: Vec<&str> = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let line = lines
        .iter()
        .find(|l| l.contains("errno") || l.contains(":error:"))
        .or_else(|| lines.last());
    match (line, code) {
        (Some(line), _) => line.chars().take(200).collect(),
        (None, Some(code)) => format!("external TLS client exited with status {code}"),
        (None, None) => "external TLS client terminated by signal".to_string(),
    }
}
