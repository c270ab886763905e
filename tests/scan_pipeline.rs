// tests/scan_pipeline.rs

use async_trait::async_trait;
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use vanguard_rs_certscan::core::config::ScanOptions;
use vanguard_rs_certscan::core::error::{GatewayError, HandshakeError, ScanError};
use vanguard_rs_certscan::core::models::{NegotiationMode, RawCertificate, ScanAddress, StartTlsProtocol};
use vanguard_rs_certscan::core::scanner::Scanner;
use vanguard_rs_certscan::core::scanner::certificate::decode_pem_block;
use vanguard_rs_certscan::core::scanner::dns_scanner::DnsBackend;
use vanguard_rs_certscan::core::scanner::openssl_gateway::{ChainGateway, ChainRequest, decode_pem_blocks, extract_pem_blocks};
use vanguard_rs_certscan::core::scanner::ssl_scanner::LeafHandshaker;

const RSA_LEAF: &str = include_str!("fixtures/rsa_leaf.pem");
const EC_INTERMEDIATE: &str = include_str!("fixtures/ec_intermediate.pem");
const MALFORMED_TRANSCRIPT: &str = include_str!("fixtures/s_client_malformed_block.txt");

fn der(pem: &str) -> Vec<u8> {
    match decode_pem_block(pem) {
        RawCertificate::Der(der) => der,
        RawCertificate::Malformed(e) => panic!("fixture did not decode: {e}"),
    }
}

#[derive(Default)]
struct FakeDns {
    cnames: HashMap<&'static str, &'static str>,
    a: HashMap<&'static str, Vec<Ipv4Addr>>,
    aaaa: HashMap<&'static str, Vec<Ipv6Addr>>,
}

#[async_trait]
impl DnsBackend for FakeDns {
    async fn lookup_cname(&self, name: &str) -> Result<Option<String>, String> {
        Ok(self.cnames.get(name).map(|s| s.to_string()))
    }

    async fn lookup_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, String> {
        self.a.get(name).cloned().ok_or_else(|| "no A records".to_string())
    }

    async fn lookup_aaaa(&self, name: &str) -> Result<Vec<Ipv6Addr>, String> {
        self.aaaa.get(name).cloned().ok_or_else(|| "no AAAA records".to_string())
    }
}

struct FakeHandshaker {
    leaf: Result<Vec<u8>, HandshakeError>,
    calls: AtomicUsize,
}

impl FakeHandshaker {
    fn new(leaf: Result<Vec<u8>, HandshakeError>) -> Self {
        Self { leaf, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl LeafHandshaker for FakeHandshaker {
    async fn fetch_leaf(&self, _: &ScanAddress, _: u16, _: &str) -> Result<Vec<u8>, HandshakeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.leaf.clone()
    }
}

struct FnGateway<F>(F);

#[async_trait]
impl<F> ChainGateway for FnGateway<F>
where
    F: Fn(&ChainRequest) -> Result<Vec<RawCertificate>, GatewayError> + Send + Sync,
{
    async fn fetch_chain(&self, request: &ChainRequest) -> Result<Vec<RawCertificate>, GatewayError> {
        (self.0)(request)
    }
}

fn example_dns() -> FakeDns {
    let mut dns = FakeDns::default();
    dns.cnames.insert("www.example.com", "example.com");
    dns.a.insert("example.com", vec![Ipv4Addr::new(192, 0, 2, 10)]);
    dns.a.insert("mail.example.com", vec![Ipv4Addr::new(192, 0, 2, 25)]);
    dns
}

#[tokio::test]
async fn implicit_port_reports_rsa_leaf_and_deduplicated_chain() {
    let leaf = der(RSA_LEAF);
    let chain_leaf = leaf.clone();
    let scanner = Scanner::with_backends(
        Arc::new(example_dns()),
        Arc::new(FakeHandshaker::new(Ok(leaf))),
        Arc::new(FnGateway(move |_: &ChainRequest| {
            Ok(vec![RawCertificate::Der(chain_leaf.clone()), RawCertificate::Der(der(EC_INTERMEDIATE))])
        })),
    );

    let result = scanner
        .scan_with("example.com", &ScanOptions::default().with_ports([443]))
        .await
        .unwrap();

    assert_eq!(result.results.len(), 1);
    let entry = &result.results[0];
    assert_eq!(entry.task.mode, NegotiationMode::Implicit);
    assert_eq!(entry.task.sni, "example.com");
    assert!(entry.result.error.is_none());

    let leaf = entry.result.leaf.as_ref().unwrap();
    assert_eq!(leaf.public_key_algorithm.as_deref(), Some("RSA"));
    assert_eq!(leaf.public_key_bits, Some(2048));
    assert_eq!(leaf.signature_hash_algorithm.as_deref(), Some("sha256"));

    let chain = entry.result.chain.as_ref().unwrap();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.iter().filter(|c| c.sha256_fingerprint == leaf.sha256_fingerprint).count(), 1);
}

#[tokio::test]
async fn closed_starttls_port_is_reported_without_leaf() {
    let handshaker = Arc::new(FakeHandshaker::new(Err(HandshakeError::ConnectionRefused)));
    let scanner = Scanner::with_backends(
        Arc::new(example_dns()),
        handshaker.clone(),
        Arc::new(FnGateway(|request: &ChainRequest| {
            assert_eq!(request.starttls, Some(StartTlsProtocol::Smtp));
            Err(GatewayError::Connection("connect:errno=111".into()))
        })),
    );
    let options = ScanOptions::default()
        .with_ports([25])
        .with_starttls([StartTlsProtocol::Smtp]);

    let result = scanner.scan_with("mail.example.com", &options).await.unwrap();

    assert_eq!(result.results.len(), 1);
    let entry = &result.results[0];
    assert_eq!(entry.task.mode, NegotiationMode::StartTls);
    assert_eq!(entry.task.protocol, Some(StartTlsProtocol::Smtp));
    assert!(!entry.result.success);
    assert!(entry.result.leaf.is_none());
    assert!(entry.result.error.as_deref().unwrap().contains("connection failed"));
    assert_eq!(handshaker.calls.load(Ordering::SeqCst), 0);

    let json: serde_json::Value = serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["results"][0]["mode"], "StartTLS");
    assert_eq!(json["results"][0]["protocol"], "smtp");
    assert!(json["results"][0]["leaf"].is_null());
}

#[tokio::test]
async fn malformed_block_only_marks_its_own_entry() {
    let scanner = Scanner::with_backends(
        Arc::new(example_dns()),
        Arc::new(FakeHandshaker::new(Err(HandshakeError::Tls("handshake failure".into())))),
        Arc::new(FnGateway(|_: &ChainRequest| Ok(decode_pem_blocks(&extract_pem_blocks(MALFORMED_TRANSCRIPT))))),
    );

    let result = scanner
        .scan_with("example.com", &ScanOptions::default().with_ports([8443]))
        .await
        .unwrap();

    let entry = &result.results[0];
    assert!(entry.result.success);
    let chain = entry.result.chain.as_ref().unwrap();
    assert_eq!(chain.len(), 3);
    assert!(!chain[0].is_unparseable());
    assert!(chain[1].is_unparseable());
    assert!(!chain[2].is_unparseable());
    assert_eq!(entry.result.leaf.as_ref(), Some(&chain[0]));
}

#[tokio::test]
async fn every_address_and_port_gets_exactly_one_sorted_result() {
    let mut dns = example_dns();
    dns.a.insert("example.com", vec![Ipv4Addr::new(192, 0, 2, 11), Ipv4Addr::new(192, 0, 2, 10)]);
    dns.aaaa.insert("example.com", vec![Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1)]);

    let scanner = Scanner::with_backends(
        Arc::new(dns),
        Arc::new(FakeHandshaker::new(Ok(der(RSA_LEAF)))),
        Arc::new(FnGateway(|_: &ChainRequest| Err(GatewayError::no_certificates("")))),
    );
    let options = ScanOptions::default().with_ports([993, 443, 25]).with_concurrency(2);

    let result = scanner.scan_with("www.example.com", &options).await.unwrap();

    assert_eq!(result.target.canonical_name, "example.com");
    assert_eq!(result.target.cname_chain, vec!["example.com"]);
    assert_eq!(result.results.len(), 3 * 3);
    let keys: Vec<_> = result.results.iter().map(|r| (r.task.ip.clone(), r.task.port)).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert!(result.results.iter().all(|r| r.task.sni == "www.example.com"));
    // Port 25 without SMTP enabled is probed as implicit TLS.
    assert!(result.results.iter().all(|r| r.task.mode == NegotiationMode::Implicit));
}

#[tokio::test]
async fn unresolvable_host_is_scanned_literally() {
    let scanner = Scanner::with_backends(
        Arc::new(FakeDns::default()),
        Arc::new(FakeHandshaker::new(Err(HandshakeError::Resolution("no addresses".into())))),
        Arc::new(FnGateway(|request: &ChainRequest| {
            Err(GatewayError::Connection(format!("cannot reach {}", request.address)))
        })),
    );

    let result = scanner
        .scan_with("intranet.test", &ScanOptions::default().with_ports([443]))
        .await
        .unwrap();

    assert_eq!(result.target.resolved_ips, vec![ScanAddress::Literal("intranet.test".into())]);
    assert_eq!(result.results.len(), 1);
    assert_eq!(result.results[0].result.error.as_deref(), Some("DNS resolution failed: no addresses"));
}

#[tokio::test]
async fn structurally_invalid_requests_are_rejected() {
    let scanner = Scanner::with_backends(
        Arc::new(FakeDns::default()),
        Arc::new(FakeHandshaker::new(Err(HandshakeError::NoCertificate))),
        Arc::new(FnGateway(|_: &ChainRequest| Err(GatewayError::no_certificates("")))),
    );

    assert_eq!(scanner.scan_with("   ", &ScanOptions::default()).await.unwrap_err(), ScanError::EmptyTarget);
    assert_eq!(
        scanner.scan_with("example.com", &ScanOptions::default().with_concurrency(0)).await.unwrap_err(),
        ScanError::ZeroConcurrency
    );
}
