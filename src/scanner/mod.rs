/*!
Liveness scanning.

Turns CIDR strings into candidate host addresses and keeps the ones that answer a probe.
Probes run on a fixed-size pool; an address that never answers is simply absent from the result.
*/

pub mod probe;

use std::{
    collections::BTreeSet,
    net::IpAddr,
    sync::Arc,
    time::Duration,
};

use ipnetwork::{IpNetwork, Ipv4Network, Ipv6Network};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

pub use probe::{PingProber, Prober};

pub const DEFAULT_SCAN_CONCURRENCY: usize = 20;
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
/// IPv6 blocks larger than this are refused rather than swept (a /64 would never finish).
pub const MAX_HOSTS_PER_SUBNET: u128 = 1 << 16;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidAddressSpec {
    #[error("'{spec}' is not a valid CIDR block: {reason}")]
    Malformed { spec: String, reason: String },
    #[error("'{spec}' spans {hosts} addresses, more than the {limit} allowed")]
    TooLarge { spec: String, hosts: u128, limit: u128 },
}

/// Usable host addresses of one CIDR block.
///
/// IPv4 blocks shorter than /31 lose their network and broadcast addresses, a /31 has no usable
/// hosts, and a /32 is the single host it names. IPv6 blocks shorter than /127 lose the
/// subnet-router anycast address.
pub fn expand_subnet(spec: &str) -> Result<Vec<IpAddr>, InvalidAddressSpec> {
    let network = spec.trim().parse::<IpNetwork>().map_err(|e| {
        InvalidAddressSpec::Malformed {
            spec: spec.to_string(),
            reason: e.to_string(),
        }
    })?;

    match network {
        IpNetwork::V4(net) => Ok(expand_v4(net)),
        IpNetwork::V6(net) => {
            let host_bits = 128 - u32::from(net.prefix());
            let hosts = if host_bits >= 127 { u128::MAX } else { 1u128 << host_bits };
            if hosts > MAX_HOSTS_PER_SUBNET {
                return Err(InvalidAddressSpec::TooLarge {
                    spec: spec.to_string(),
                    hosts,
                    limit: MAX_HOSTS_PER_SUBNET,
                });
            }
            Ok(expand_v6(net))
        }
    }
}

fn expand_v4(net: Ipv4Network) -> Vec<IpAddr> {
    match net.prefix() {
        32 => vec![IpAddr::V4(net.ip())],
        31 => Vec::new(),
        _ => {
            let (first, last) = (net.network(), net.broadcast());
            net.iter()
                .filter(|ip| *ip != first && *ip != last)
                .map(IpAddr::V4)
                .collect()
        }
    }
}

fn expand_v6(net: Ipv6Network) -> Vec<IpAddr> {
    if net.prefix() >= 127 {
        net.iter().map(IpAddr::V6).collect()
    } else {
        let anycast = net.network();
        net.iter().filter(|ip| *ip != anycast).map(IpAddr::V6).collect()
    }
}

/// Expands every block, logging and skipping the ones that cannot be used.
pub fn expand_subnets<S: AsRef<str>>(subnets: &[S]) -> BTreeSet<IpAddr> {
    let mut candidates = BTreeSet::new();
    for spec in subnets {
        match expand_subnet(spec.as_ref()) {
            Ok(hosts) => {
                debug!(subnet = spec.as_ref(), hosts = hosts.len(), "Expanded subnet");
                candidates.extend(hosts);
            }
            Err(e) => warn!(subnet = spec.as_ref(), error = %e, "Skipping subnet"),
        }
    }
    candidates
}

/// Probes every candidate with at most `concurrency` probes in flight and returns the responders.
pub async fn scan_addresses<P: Prober>(
    candidates: impl IntoIterator<Item = IpAddr>,
    concurrency: usize,
    prober: Arc<P>,
) -> BTreeSet<IpAddr> {
    let concurrency = concurrency.max(1);
    let mut tasks = JoinSet::new();
    let mut reachable = BTreeSet::new();
    let mut probed = 0usize;

    let mut collect = |result: Result<Option<IpAddr>, tokio::task::JoinError>| match result {
        Ok(Some(ip)) => {
            debug!(ip = %ip, "Host answered");
            reachable.insert(ip);
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Probe task failed"),
    };

    for ip in candidates {
        while tasks.len() >= concurrency {
            if let Some(result) = tasks.join_next().await {
                collect(result);
            }
        }
        let prober = Arc::clone(&prober);
        tasks.spawn(async move { prober.probe(ip).await.then_some(ip) });
        probed += 1;
    }
    while let Some(result) = tasks.join_next().await {
        collect(result);
    }

    info!(probed, reachable = reachable.len(), "Liveness scan complete");
    reachable
}

/// Expands `subnets` and probes the resulting hosts.
pub async fn scan<S: AsRef<str>, P: Prober>(
    subnets: &[S],
    concurrency: usize,
    prober: Arc<P>,
) -> BTreeSet<IpAddr> {
    let candidates = expand_subnets(subnets);
    scan_addresses(candidates, concurrency, prober).await
}
