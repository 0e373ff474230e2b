//! Discovery entry point
//!
//! Scans the configured subnets, polls every live host and writes the neighbor report and the
//! device graph to the output directory.

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use snmp_topology::{
    acquisition::snmp::SnmpSessionFactory,
    config::DiscoveryConfig,
    scanner::{self, PingProber, probe::detect_local_address},
    topology::{
        DotExporter, JsonExporter, StaticNameResolver, TopologyBuilder, TopologyExporter,
    },
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("snmp-topology v{}", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("discovery.json"));
    let config = DiscoveryConfig::load(&config_path)?;
    info!(
        path = %config_path.display(),
        subnets = config.subnets.len(),
        "Configuration loaded"
    );

    let mut resolver = StaticNameResolver::new(config.host_names.clone());
    if let Some(file) = &config.host_names_file {
        match StaticNameResolver::from_file(file) {
            Ok(from_file) => resolver = resolver.merged_with(from_file.into_names()),
            Err(e) => warn!(error = %e, "Ignoring host name file"),
        }
    }

    let collector = config.local_address.or_else(detect_local_address);
    match collector {
        Some(address) => info!(address = %address, "Collector address"),
        None => warn!("Could not determine the collector address"),
    }

    let prober = Arc::new(PingProber::new(config.probe_timeout));
    let reachable = scanner::scan(&config.subnets, config.scan_concurrency, prober).await;

    let factory = SnmpSessionFactory::new(config.snmp.clone(), config.device_overrides.clone());
    let run = TopologyBuilder::new(factory, resolver)
        .with_concurrency(config.poll_concurrency)
        .with_correlation(config.correlation)
        .with_collector(collector)
        .build(reachable)
        .await?;

    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("cannot create {}", config.output_dir.display()))?;
    let write = |name: &str, contents: String| -> Result<()> {
        let path = config.output_dir.join(name);
        fs::write(&path, contents).with_context(|| format!("cannot write {}", path.display()))?;
        info!(path = %path.display(), "Wrote");
        Ok(())
    };

    write("neighbors.json", serde_json::to_string_pretty(&run.report())?)?;
    write("topology.json", JsonExporter::pretty().export(&run.graph)?)?;
    write("topology.dot", DotExporter.export(&run.graph)?)?;

    let skipped = run.devices.values().filter(|d| !d.contributed).count();
    info!(
        devices = run.devices.len(),
        skipped,
        nodes = run.graph.node_count(),
        edges = run.graph.edge_count(),
        "Done"
    );
    Ok(())
}
