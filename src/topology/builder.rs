/*!
Discovery run orchestration.

Each reachable address gets its own task that opens a session, resolves interface names and
extracts neighbors, in that order. Tasks hand their results back and this task alone writes
the graph, so devices that report the same neighbor never race on its node.
*/

use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    net::IpAddr,
    sync::Arc,
};

use serde::{Serialize, Serializer};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{
    acquisition::{
        core::{SessionError, SessionFactory, VarBind},
        path::Path,
    },
    neighbors::{
        CorrelationPolicy, NeighborRecord, NeighborScan, NeighborTable, PortResolution, PortTable,
        extract_neighbors, resolve_ports,
    },
    network::{DeviceNode, Edge, TopologyGraph},
    topology::source::HostNameResolver,
};

pub const DEFAULT_POLL_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("no addresses to poll")]
    NoAddresses,
}

/// What was learned about one polled device, whether or not it made it into the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceReport {
    pub address: IpAddr,
    pub display_name: String,
    /// Raw LLDP/CDP bindings
    #[serde(serialize_with = "rendered_bindings")]
    pub neighbors: Vec<VarBind>,
    pub records: Vec<NeighborRecord>,
    pub ports: PortTable,
    pub errors: Vec<String>,
    /// False when the device added nothing to the graph
    pub contributed: bool,
}

impl DeviceReport {
    fn new(address: IpAddr, display_name: String) -> Self {
        Self {
            address,
            display_name,
            neighbors: Vec::new(),
            records: Vec::new(),
            ports: PortTable::new(),
            errors: Vec::new(),
            contributed: false,
        }
    }
}

#[derive(Serialize)]
struct RenderedBinding<'a> {
    path: &'a Path,
    value: String,
}

fn rendered_bindings<S: Serializer>(bindings: &[VarBind], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(bindings.iter().map(|b| RenderedBinding {
        path: &b.path,
        value: b.value.to_string(),
    }))
}

/// Result of one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryRun {
    pub graph: TopologyGraph,
    pub devices: BTreeMap<IpAddr, DeviceReport>,
    /// Address of the host that ran the discovery
    pub collector: Option<IpAddr>,
}

/// Per-address document written next to the graph.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub collector: Option<IpAddr>,
    pub devices: &'a BTreeMap<IpAddr, DeviceReport>,
}

impl DiscoveryRun {
    pub fn report(&self) -> RunReport<'_> {
        RunReport { collector: self.collector, devices: &self.devices }
    }
}

/// Everything a device task sends back to the builder.
#[derive(Debug)]
struct DevicePoll {
    address: IpAddr,
    display_name: String,
    outcome: Result<(PortResolution, NeighborScan), SessionError>,
}

async fn poll_device<F: SessionFactory, R: HostNameResolver>(
    factory: Arc<F>,
    resolver: Arc<R>,
    tables: Arc<Vec<NeighborTable>>,
    correlation: CorrelationPolicy,
    address: IpAddr,
) -> DevicePoll {
    let display_name = resolver
        .resolve(address)
        .await
        .unwrap_or_else(|| address.to_string());

    let outcome = match factory.open(address).await {
        Ok(mut session) => {
            let ports = resolve_ports(&mut session).await;
            let scan = extract_neighbors(&mut session, &tables, correlation).await;
            Ok((ports, scan))
        }
        Err(e) => Err(e),
    };

    DevicePoll { address, display_name, outcome }
}

/// Adds one device and its neighbors to the graph.
///
/// The local node is keyed by its display name. Each record becomes an edge to a node keyed by
/// the remote device id, labelled with the remote port; the local port comes from `ports`.
pub fn merge_neighbors(
    graph: &mut TopologyGraph,
    display_name: &str,
    ports: &PortTable,
    records: &[NeighborRecord],
) {
    graph.upsert_node(DeviceNode::new(display_name, display_name));
    for record in records {
        let local_port = ports.label_for(record.local_interface_ref.as_deref());
        graph.upsert_node(DeviceNode::named(record.remote_device_id.as_str()));
        graph.add_edge(Edge::new(
            display_name,
            record.remote_device_id.as_str(),
            record.remote_port_label.as_str(),
            local_port,
        ));
    }
}

fn merge(graph: &mut TopologyGraph, poll: DevicePoll) -> DeviceReport {
    let DevicePoll { address, display_name, outcome } = poll;
    let mut report = DeviceReport::new(address, display_name);

    let (ports, scan) = match outcome {
        Ok(results) => results,
        Err(e) => {
            warn!(ip = %address, error = %e, "Cannot open session, device skipped");
            report.errors.push(e.to_string());
            return report;
        }
    };

    report.errors.extend(ports.error.iter().map(ToString::to_string));
    report.errors.extend(scan.errors.iter().map(ToString::to_string));

    let nothing_answered = ports.error.is_some() && ports.ports.is_empty() && scan.is_total_failure();
    if nothing_answered {
        warn!(ip = %address, "Every walk failed, device skipped");
    } else {
        merge_neighbors(graph, &report.display_name, &ports.ports, &scan.records);
        report.contributed = true;
        info!(
            ip = %address,
            name = %report.display_name,
            neighbors = scan.records.len(),
            ports = ports.ports.len(),
            "Polled device"
        );
    }

    report.neighbors = scan.observations;
    report.records = scan.records;
    report.ports = ports.ports;
    report
}

/// Polls addresses and assembles the device graph.
pub struct TopologyBuilder<F, R> {
    factory: Arc<F>,
    resolver: Arc<R>,
    concurrency: usize,
    correlation: CorrelationPolicy,
    tables: Arc<Vec<NeighborTable>>,
    collector: Option<IpAddr>,
}

impl<F: SessionFactory, R: HostNameResolver> TopologyBuilder<F, R> {
    pub fn new(factory: F, resolver: R) -> Self {
        Self {
            factory: Arc::new(factory),
            resolver: Arc::new(resolver),
            concurrency: DEFAULT_POLL_CONCURRENCY,
            correlation: CorrelationPolicy::default(),
            tables: Arc::new(NeighborTable::standard()),
            collector: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_correlation(mut self, correlation: CorrelationPolicy) -> Self {
        self.correlation = correlation;
        self
    }

    pub fn with_collector(mut self, collector: Option<IpAddr>) -> Self {
        self.collector = collector;
        self
    }

    fn spawn(&self, tasks: &mut JoinSet<DevicePoll>, address: IpAddr) -> tokio::task::Id {
        let poll = poll_device(
            Arc::clone(&self.factory),
            Arc::clone(&self.resolver),
            Arc::clone(&self.tables),
            self.correlation,
            address,
        );
        tasks.spawn(poll).id()
    }

    /// Polls every address and merges the results as they arrive.
    ///
    /// Failures stay with their device; only an empty address set fails the run.
    pub async fn build(
        &self,
        addresses: impl IntoIterator<Item = IpAddr>,
    ) -> Result<DiscoveryRun, DiscoveryError> {
        let addresses: BTreeSet<IpAddr> = addresses.into_iter().collect();
        if addresses.is_empty() {
            return Err(DiscoveryError::NoAddresses);
        }
        info!(devices = addresses.len(), concurrency = self.concurrency, "Starting discovery");

        let mut graph = TopologyGraph::new();
        let mut devices = BTreeMap::new();
        let mut tasks = JoinSet::new();
        let mut in_flight: HashMap<tokio::task::Id, IpAddr> = HashMap::new();

        let mut pending = addresses.into_iter();
        loop {
            while tasks.len() < self.concurrency {
                let Some(address) = pending.next() else { break };
                debug!(ip = %address, "Polling device");
                in_flight.insert(self.spawn(&mut tasks, address), address);
            }

            let Some(joined) = tasks.join_next_with_id().await else {
                break;
            };
            match joined {
                Ok((id, poll)) => {
                    in_flight.remove(&id);
                    let report = merge(&mut graph, poll);
                    devices.insert(report.address, report);
                }
                Err(e) => {
                    let Some(address) = in_flight.remove(&e.id()) else {
                        warn!(error = %e, "Device task failed");
                        continue;
                    };
                    warn!(ip = %address, error = %e, "Device task failed");
                    let mut report = DeviceReport::new(address, address.to_string());
                    report.errors.push(e.to_string());
                    devices.insert(address, report);
                }
            }
        }

        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Discovery complete"
        );
        Ok(DiscoveryRun { graph, devices, collector: self.collector })
    }
}
