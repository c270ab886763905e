// src/core/scanner/dns_scanner.rs

use tracing::{debug, info, warn};

use crate::core::models::{ScanAddress, ScanTarget};
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::{RData, RecordType};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Upper bound on CNAME redirections followed before the current name is taken
/// as canonical.
pub const MAX_CNAME_HOPS: usize = 10;

/// The record lookups the resolver needs. Every method reports failure as a
/// plain message; callers treat failures like empty answers.
#[async_trait]
pub trait DnsBackend: Send + Sync {
    async fn lookup_cname(&self, name: &str) -> Result<Option<String>, String>;
    async fn lookup_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, String>;
    async fn lookup_aaaa(&self, name: &str) -> Result<Vec<Ipv6Addr>, String>;
}

/// [`DnsBackend`] over an asynchronous hickory resolver.
pub struct HickoryBackend {
    resolver: TokioAsyncResolver,
}

impl HickoryBackend {
    /// Uses the host's resolver configuration, or public defaults when it cannot be read.
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            warn!(error = %e, "Could not load system resolver configuration, using defaults.");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }

    pub fn with_config(config: ResolverConfig, options: ResolverOpts) -> Self {
        Self { resolver: TokioAsyncResolver::tokio(config, options) }
    }
}

impl Default for HickoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsBackend for HickoryBackend {
    async fn lookup_cname(&self, name: &str) -> Result<Option<String>, String> {
        let lookup = self
            .resolver
            .lookup(name, RecordType::CNAME)
            .await
            .map_err(|e| format!("DNS Error: {}", e))?;
        Ok(lookup.iter().find_map(|rdata| match rdata {
            RData::CNAME(cname) => Some(cname.0.to_utf8().trim_end_matches('.').to_string()),
            _ => None,
        }))
    }

    async fn lookup_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, String> {
        match self.resolver.ipv4_lookup(name).await {
            Ok(lookup) => Ok(lookup.iter().map(|a| a.0).collect()),
            Err(e) => Err(format!("DNS Error: {}", e)),
        }
    }

    async fn lookup_aaaa(&self, name: &str) -> Result<Vec<Ipv6Addr>, String> {
        match self.resolver.ipv6_lookup(name).await {
            Ok(lookup) => Ok(lookup.iter().map(|aaaa| aaaa.0).collect()),
            Err(e) => Err(format!("DNS Error: {}", e)),
        }
    }
}

/// Follows CNAME records from `host` for at most [`MAX_CNAME_HOPS`] hops.
///
/// # Returns
/// The canonical name and the ordered chain of names visited after `host`.
pub async fn follow_cname_chain(backend: &dyn DnsBackend, host: &str) -> (String, Vec<String>) {
    let mut current = host.to_string();
    let mut chain = Vec::new();

    for _ in 0..MAX_CNAME_HOPS {
        match backend.lookup_cname(&current).await {
            Ok(Some(next)) => {
                debug!(from = %current, to = %next, "Followed CNAME.");
                chain.push(next.clone());
                current = next;
            }
            Ok(None) => break,
            Err(e) => {
                debug!(name = %current, error = %e, "No CNAME record, stopping.");
                break;
            }
        }
    }

    if chain.len() == MAX_CNAME_HOPS {
        warn!(host, "CNAME chain hit the hop limit.");
    }
    (current, chain)
}

/// Looks up A then AAAA records for `name`. A failure of either type only
/// empties that half of the answer.
pub async fn resolve_ips(backend: &dyn DnsBackend, name: &str) -> Vec<IpAddr> {
    let (v4, v6) = tokio::join!(backend.lookup_a(name), backend.lookup_aaaa(name));

    let mut ips: Vec<IpAddr> = Vec::new();
    match v4 {
        Ok(addrs) => ips.extend(addrs.into_iter().map(IpAddr::V4)),
        Err(e) => debug!(name, error = %e, "A lookup failed."),
    }
    match v6 {
        Ok(addrs) => ips.extend(addrs.into_iter().map(IpAddr::V6)),
        Err(e) => debug!(name, error = %e, "AAAA lookup failed."),
    }

    let mut seen = std::collections::HashSet::new();
    ips.retain(|ip| seen.insert(*ip));
    ips
}

/// Resolves the user-supplied host into a [`ScanTarget`].
///
/// IP literals skip DNS entirely. When neither record type yields an address
/// the host itself becomes the only address, so raw targets are still scanned.
/// This function never fails.
pub async fn resolve_target(backend: &dyn DnsBackend, host: &str, follow_cname: bool) -> ScanTarget {
    let host = host.trim();
    if let ScanAddress::Ip(ip) = ScanAddress::parse(host) {
        debug!(%ip, "Target is an IP literal, skipping DNS.");
        return ScanTarget {
            requested_host: host.to_string(),
            canonical_name: host.to_string(),
            cname_chain: Vec::new(),
            resolved_ips: vec![ScanAddress::Ip(ip)],
        };
    }

    info!(target = %host, "Resolving scan target.");
    let (canonical_name, cname_chain) = if follow_cname {
        follow_cname_chain(backend, host).await
    } else {
        (host.to_string(), Vec::new())
    };

    let ips = resolve_ips(backend, &canonical_name).await;
    let resolved_ips = if ips.is_empty() {
        warn!(target = %host, "No A/AAAA records, falling back to the literal host.");
        vec![ScanAddress::parse(host)]
    } else {
        ips.into_iter().map(ScanAddress::Ip).collect()
    };

    info!(
        canonical = %canonical_name,
        hops = cname_chain.len(),
        addresses = resolved_ips.len(),
        "Target resolved."
    );
    ScanTarget { requested_host: host.to_string(), canonical_name, cname_chain, resolved_ips }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct StaticDns {
        cnames: HashMap<String, String>,
        a: HashMap<String, Vec<Ipv4Addr>>,
        aaaa: HashMap<String, Vec<Ipv6Addr>>,
        cname_queries: Mutex<usize>,
    }

    #[async_trait]
    impl DnsBackend for StaticDns {
        async fn lookup_cname(&self, name: &str) -> Result<Option<String>, String> {
            *self.cname_queries.lock().unwrap() += 1;
            match self.cnames.get(name) {
                Some(target) => Ok(Some(target.clone())),
                None => Err("no records found".to_string()),
            }
        }

        async fn lookup_a(&self, name: &str) -> Result<Vec<Ipv4Addr>, String> {
            self.a.get(name).cloned().ok_or_else(|| "NXDOMAIN".to_string())
        }

        async fn lookup_aaaa(&self, name: &str) -> Result<Vec<Ipv6Addr>, String> {
            self.aaaa.get(name).cloned().ok_or_else(|| "NXDOMAIN".to_string())
        }
    }

    #[tokio::test]
    async fn follows_cname_to_canonical_name() {
        let mut dns = StaticDns::default();
        dns.cnames.insert("www.example.com".into(), "edge.cdn.example.net".into());
        dns.cnames.insert("edge.cdn.example.net".into(), "pop1.cdn.example.net".into());
        dns.a.insert("pop1.cdn.example.net".into(), vec![Ipv4Addr::new(192, 0, 2, 10)]);
        dns.aaaa.insert("pop1.cdn.example.net".into(), vec![Ipv6Addr::LOCALHOST]);

        let target = resolve_target(&dns, "www.example.com", true).await;

        assert_eq!(target.requested_host, "www.example.com");
        assert_eq!(target.canonical_name, "pop1.cdn.example.net");
        assert_eq!(target.cname_chain, vec!["edge.cdn.example.net", "pop1.cdn.example.net"]);
        assert_eq!(
            target.resolved_ips,
            vec![ScanAddress::parse("192.0.2.10"), ScanAddress::Ip(IpAddr::V6(Ipv6Addr::LOCALHOST))]
        );
    }

    #[tokio::test]
    async fn cyclic_cname_chain_terminates() {
        let mut dns = StaticDns::default();
        dns.cnames.insert("a.example".into(), "b.example".into());
        dns.cnames.insert("b.example".into(), "a.example".into());

        let (canonical, chain) = follow_cname_chain(&dns, "a.example").await;

        assert_eq!(chain.len(), MAX_CNAME_HOPS);
        assert_eq!(*dns.cname_queries.lock().unwrap(), MAX_CNAME_HOPS);
        assert_eq!(canonical, "a.example");
    }

    #[tokio::test]
    async fn no_records_falls_back_to_literal_host() {
        let dns = StaticDns::default();
        let target = resolve_target(&dns, "internal.test", true).await;

        assert_eq!(target.canonical_name, "internal.test");
        assert!(target.cname_chain.is_empty());
        assert_eq!(target.resolved_ips, vec![ScanAddress::Literal("internal.test".into())]);
    }

    #[tokio::test]
    async fn ip_literal_skips_dns() {
        let dns = StaticDns::default();
        let target = resolve_target(&dns, "2001:db8::1", true).await;

        assert_eq!(target.resolved_ips, vec![ScanAddress::parse("2001:db8::1")]);
        assert_eq!(*dns.cname_queries.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn one_failing_record_type_keeps_the_other() {
        let mut dns = StaticDns::default();
        dns.aaaa.insert("v6only.example".into(), vec![Ipv6Addr::LOCALHOST]);

        let ips = resolve_ips(&dns, "v6only.example").await;
        assert_eq!(ips, vec![IpAddr::V6(Ipv6Addr::LOCALHOST)]);
    }

    #[tokio::test]
    async fn cname_following_can_be_disabled() {
        let mut dns = StaticDns::default();
        dns.cnames.insert("www.example.com".into(), "elsewhere.example".into());
        dns.a.insert("www.example.com".into(), vec![Ipv4Addr::new(198, 51, 100, 1)]);

        let target = resolve_target(&dns, "www.example.com", false).await;
        assert_eq!(target.canonical_name, "www.example.com");
        assert!(target.cname_chain.is_empty());
        assert_eq!(target.resolved_ips.len(), 1);
    }
}
