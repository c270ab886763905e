// src/core/scanner/mod.rs

// Public interface of the scanning engine.
pub mod certificate;
pub mod dns_scanner;
pub mod openssl_gateway;
pub mod orchestrator;
pub mod scheduler;
pub mod ssl_scanner;
pub mod starttls_scanner;

use tracing::{info, instrument};

use crate::core::config::ScanOptions;
use crate::core::error::ScanError;
use crate::core::models::{FetchResult, NegotiationMode, ScanResult, ScanTask};
use self::dns_scanner::{DnsBackend, HickoryBackend, resolve_target};
use self::openssl_gateway::{ChainGateway, OpensslGateway};
use self::orchestrator::{CertificateFetcher, run_tasks};
use self::ssl_scanner::{ImplicitTlsFetcher, LeafHandshaker, NativeTlsHandshaker};
use self::starttls_scanner::StartTlsFetcher;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// Routes each task to the fetcher matching its negotiation mode.
pub struct DualPathFetcher {
    implicit: ImplicitTlsFetcher,
    starttls: StartTlsFetcher,
}

impl DualPathFetcher {
    pub fn new(handshaker: Arc<dyn LeafHandshaker>, gateway: Arc<dyn ChainGateway>) -> Self {
        Self {
            implicit: ImplicitTlsFetcher::new(handshaker, Arc::clone(&gateway)),
            starttls: StartTlsFetcher::new(gateway),
        }
    }
}

#[async_trait]
impl CertificateFetcher for DualPathFetcher {
    async fn fetch(&self, task: &ScanTask) -> FetchResult {
        match task.mode {
            NegotiationMode::Implicit => self.implicit.fetch(task).await,
            NegotiationMode::StartTls => self.starttls.fetch(task).await,
        }
    }
}

/// The scanning engine with its network collaborators.
#[derive(Clone)]
pub struct Scanner {
    dns: Arc<dyn DnsBackend>,
    handshaker: Arc<dyn LeafHandshaker>,
    gateway: Arc<dyn ChainGateway>,
}

impl Scanner {
    /// Production wiring: system DNS, native-tls and the `openssl` binary from `options`.
    pub fn new(options: &ScanOptions) -> Self {
        Self {
            dns: Arc::new(HickoryBackend::new()),
            handshaker: Arc::new(NativeTlsHandshaker::new(options.timeout)),
            gateway: Arc::new(OpensslGateway::new(options.openssl_path.clone(), options.timeout)),
        }
    }

    pub fn with_backends(
        dns: Arc<dyn DnsBackend>,
        handshaker: Arc<dyn LeafHandshaker>,
        gateway: Arc<dyn ChainGateway>,
    ) -> Self {
        Self { dns, handshaker, gateway }
    }

    /// Resolves `host`, schedules one task per (address, port) and runs them all.
    ///
    /// # Errors
    /// Only structurally invalid input is rejected. Once tasks are scheduled every
    /// outcome, good or bad, is reported inside the returned [`ScanResult`].
    #[instrument(skip(self, options))]
    pub async fn scan_with(&self, host: &str, options: &ScanOptions) -> Result<ScanResult, ScanError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ScanError::EmptyTarget);
        }
        options.validate()?;

        let target = resolve_target(self.dns.as_ref(), host, options.follow_cname).await;
        let tasks = scheduler::plan(&target, options);
        let fetcher = Arc::new(DualPathFetcher::new(Arc::clone(&self.handshaker), Arc::clone(&self.gateway)));
        let results = run_tasks(tasks, fetcher, options.concurrency).await;

        info!(results = results.len(), "Scan complete.");
        Ok(ScanResult { target, scanned_at: Utc::now(), results })
    }
}

/// Scans `host` on `ports` (or the default port tables) with settings taken from
/// the environment.
///
/// # Arguments
/// * `host` - Hostname or IP literal, e.g. "example.com" or "2001:db8::1".
/// * `ports` - Explicit ports; `None` sweeps every known TLS port with all STARTTLS protocols enabled.
pub async fn scan(host: &str, ports: Option<Vec<u16>>) -> Result<ScanResult, ScanError> {
    let mut options = ScanOptions::from_env();
    if let Some(ports) = ports {
        options = options.with_ports(ports);
    }
    Scanner::new(&options).scan_with(host, &options).await
}
