// src/core/scanner/ssl_scanner.rs

use tracing::{debug, error, info, warn};

use crate::core::error::{GatewayError, HandshakeError};
use crate::core::models::{FetchResult, RawCertificate, ScanAddress, ScanTask};
use crate::core::scanner::certificate::{extract_metadata, metadata_for};
use crate::core::scanner::openssl_gateway::{ChainGateway, ChainRequest};
use async_trait::async_trait;
use native_tls::TlsConnector;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;

/// Performs a TLS handshake and returns the peer's leaf certificate as DER.
#[async_trait]
pub trait LeafHandshaker: Send + Sync {
    async fn fetch_leaf(&self, address: &ScanAddress, port: u16, sni: &str) -> Result<Vec<u8>, HandshakeError>;
}

/// In-process handshake over `native-tls` with verification switched off: the
/// goal is to see what the server presents, not to decide whether to trust it.
#[derive(Debug, Clone)]
pub struct NativeTlsHandshaker {
    timeout: Duration,
}

impl NativeTlsHandshaker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl LeafHandshaker for NativeTlsHandshaker {
    async fn fetch_leaf(&self, address: &ScanAddress, port: u16, sni: &str) -> Result<Vec<u8>, HandshakeError> {
        let address = address.clone();
        let sni = sni.to_string();
        let timeout = self.timeout;

        debug!(%address, port, "Spawning blocking task for TLS handshake.");
        let handshake = spawn_blocking(move || perform_handshake(&address, port, &sni, timeout));

        // Socket timeouts bound each read, not the whole exchange. The blocking
        // thread is left to finish on its own once the deadline passes.
        match tokio::time::timeout(timeout, handshake).await {
            Ok(joined) => joined.unwrap_or_else(|e| {
                error!(panic = %e, "Blocking TLS handshake task panicked!");
                Err(HandshakeError::Panicked(e.to_string()))
            }),
            Err(_) => {
                warn!(port, timeout = ?timeout, "TLS handshake exceeded its deadline.");
                Err(HandshakeError::ConnectTimeout(timeout))
            }
        }
    }
}

fn socket_addr(address: &ScanAddress, port: u16) -> Result<SocketAddr, HandshakeError> {
    match address {
        ScanAddress::Ip(ip) => Ok(SocketAddr::new(*ip, port)),
        ScanAddress::Literal(host) => (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| HandshakeError::Resolution(e.to_string()))?
            .next()
            .ok_or_else(|| HandshakeError::Resolution(format!("no addresses for {host}"))),
    }
}

fn perform_handshake(address: &ScanAddress, port: u16, sni: &str, timeout: Duration) -> Result<Vec<u8>, HandshakeError> {
    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .danger_accept_invalid_hostnames(true)
        .use_sni(!sni.is_empty())
        .build()
        .map_err(|e| {
            error!(error = %e, "Failed to create TlsConnector");
            HandshakeError::Setup(e.to_string())
        })?;

    let addr = socket_addr(address, port)?;
    debug!(%addr, "Connecting TCP stream.");
    let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
        debug!(%addr, error = %e, "TCP connection failed");
        HandshakeError::from_io(&e, timeout)
    })?;
    stream
        .set_read_timeout(Some(timeout))
        .and_then(|_| stream.set_write_timeout(Some(timeout)))
        .map_err(|e| HandshakeError::Connect(e.to_string()))?;

    let domain = if sni.is_empty() { address.to_string() } else { sni.to_string() };
    debug!(%addr, sni = %domain, "Performing TLS handshake.");
    let stream = connector.connect(&domain, stream).map_err(|e| match e {
        native_tls::HandshakeError::Failure(err) => HandshakeError::Tls(err.to_string()),
        native_tls::HandshakeError::WouldBlock(_) => HandshakeError::ConnectTimeout(timeout),
    })?;

    match stream.peer_certificate() {
        Ok(Some(cert)) => cert.to_der().map_err(|e| HandshakeError::Tls(e.to_string())),
        Ok(None) => Err(HandshakeError::NoCertificate),
        Err(e) => Err(HandshakeError::Tls(e.to_string())),
    }
}

/// Combines the native leaf with the externally captured chain.
///
/// The native leaf always comes first and any chain entry byte-identical to it
/// is dropped. Without a native leaf the external chain is used as-is. When
/// both paths fail the native reason is reported.
pub fn merge_implicit(
    leaf: Result<Vec<u8>, HandshakeError>,
    chain: Result<Vec<RawCertificate>, GatewayError>,
) -> FetchResult {
    match (leaf, chain) {
        (Ok(leaf_der), chain) => {
            let leaf = extract_metadata(&leaf_der);
            let mut entries = vec![leaf.clone()];
            match chain {
                Ok(raw) => entries.extend(
                    raw.iter()
                        .filter(|cert| !matches!(cert, RawCertificate::Der(der) if *der == leaf_der))
                        .map(metadata_for),
                ),
                Err(e) => debug!(error = %e, "Chain capture failed, keeping native leaf only."),
            }
            FetchResult::success(leaf, entries)
        }
        (Err(native), Ok(raw)) => {
            debug!(error = %native, "Native handshake failed, using external chain.");
            let entries: Vec<_> = raw.iter().map(metadata_for).collect();
            match entries.first().cloned() {
                Some(leaf) => FetchResult::success(leaf, entries),
                None => FetchResult::failure(native.to_string()),
            }
        }
        (Err(native), Err(gateway)) => {
            debug!(native = %native, gateway = %gateway, "Both certificate paths failed.");
            FetchResult::failure(native.to_string())
        }
    }
}

/// Fetcher for ports where TLS starts right after connect.
pub struct ImplicitTlsFetcher {
    handshaker: Arc<dyn LeafHandshaker>,
    gateway: Arc<dyn ChainGateway>,
}

impl ImplicitTlsFetcher {
    pub fn new(handshaker: Arc<dyn LeafHandshaker>, gateway: Arc<dyn ChainGateway>) -> Self {
        Self { handshaker, gateway }
    }

    pub async fn fetch(&self, task: &ScanTask) -> FetchResult {
        let request = ChainRequest { starttls: None, ..ChainRequest::from_task(task) };
        let (leaf, chain) = tokio::join!(
            self.handshaker.fetch_leaf(&task.ip, task.port, &task.sni),
            self.gateway.fetch_chain(&request)
        );
        let result = merge_implicit(leaf, chain);
        match &result.error {
            None => info!(task = %task, certificates = result.chain_len(), "Implicit TLS fetch succeeded."),
            Some(e) => warn!(task = %task, error = %e, "Implicit TLS fetch failed."),
        }
        result
    }
}
