// src/core/scanner/scheduler.rs

use tracing::debug;

use crate::core::config::{PortTable, ScanOptions, UnmappedPortPolicy};
use crate::core::models::{NegotiationMode, ScanTarget, ScanTask, StartTlsProtocol};
use std::collections::BTreeSet;

/// Decides how to negotiate TLS on `port`.
///
/// Implicit-table ports always win. A STARTTLS port is only used as such when
/// its protocol is enabled; everything else follows `policy`.
pub fn classify_port(
    port: u16,
    table: &PortTable,
    enabled: &BTreeSet<StartTlsProtocol>,
    policy: UnmappedPortPolicy,
) -> Option<(NegotiationMode, Option<StartTlsProtocol>)> {
    if table.is_implicit(port) {
        return Some((NegotiationMode::Implicit, None));
    }
    if let Some(protocol) = table.starttls_protocol(port).filter(|p| enabled.contains(p)) {
        return Some((NegotiationMode::StartTls, Some(protocol)));
    }
    match policy {
        UnmappedPortPolicy::Implicit => Some((NegotiationMode::Implicit, None)),
        UnmappedPortPolicy::Skip => None,
    }
}

/// Expands a resolved target into one task per (address, port) pair.
///
/// Only the first address is used unless `resolve_all_ips` is set. SNI is
/// always the host the user asked for, never the address or canonical name.
pub fn build_tasks(
    target: &ScanTarget,
    ports: &[u16],
    enabled: &BTreeSet<StartTlsProtocol>,
    resolve_all_ips: bool,
    table: &PortTable,
    policy: UnmappedPortPolicy,
) -> Vec<ScanTask> {
    let addresses = if resolve_all_ips {
        &target.resolved_ips[..]
    } else {
        &target.resolved_ips[..target.resolved_ips.len().min(1)]
    };

    let mut tasks = Vec::with_capacity(addresses.len() * ports.len());
    for address in addresses {
        for &port in ports {
            match classify_port(port, table, enabled, policy) {
                Some((NegotiationMode::StartTls, Some(protocol))) => {
                    tasks.push(ScanTask::starttls(address.clone(), port, protocol, &target.requested_host));
                }
                Some(_) => tasks.push(ScanTask::implicit(address.clone(), port, &target.requested_host)),
                None => debug!(port, "Skipping unmapped port."),
            }
        }
    }
    debug!(count = tasks.len(), "Scheduled scan tasks.");
    tasks
}

/// [`build_tasks`] driven by a full option set.
pub fn plan(target: &ScanTarget, options: &ScanOptions) -> Vec<ScanTask> {
    build_tasks(
        target,
        &options.effective_ports(),
        &options.effective_starttls(),
        options.resolve_all_ips,
        &options.port_table,
        options.unmapped_ports,
    )
}
