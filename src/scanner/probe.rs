use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use tracing::trace;

use crate::scanner::DEFAULT_PROBE_TIMEOUT;

/// A bounded-time reachability check for one address.
#[async_trait]
pub trait Prober: Send + Sync + 'static {
    async fn probe(&self, address: IpAddr) -> bool;
}

/// Sends a single ICMP echo with the system `ping` binary.
#[derive(Debug, Clone)]
pub struct PingProber {
    timeout: Duration,
}

impl Default for PingProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}

impl PingProber {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn arguments(&self, address: IpAddr) -> Vec<String> {
        if cfg!(windows) {
            let millis = self.timeout.as_millis().max(1);
            vec!["-n".into(), "1".into(), "-w".into(), millis.to_string(), address.to_string()]
        } else {
            // Unix ping takes whole seconds
            let secs = self.timeout.as_secs().max(1);
            let mut args = vec!["-c".into(), "1".into(), "-W".into(), secs.to_string()];
            if address.is_ipv6() && cfg!(target_os = "macos") {
                args.clear();
                args.extend(["-c".into(), "1".into()]);
            }
            args.push(address.to_string());
            args
        }
    }

    fn program(address: IpAddr) -> &'static str {
        // macOS still ships a separate binary for v6
        if address.is_ipv6() && cfg!(target_os = "macos") { "ping6" } else { "ping" }
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, address: IpAddr) -> bool {
        let child = tokio::process::Command::new(Self::program(address))
            .args(self.arguments(address))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        // Slack over the ping's own deadline for process start-up
        let deadline = self.timeout + Duration::from_secs(1);
        match tokio::time::timeout(deadline, child).await {
            Ok(Ok(status)) => status.success(),
            Ok(Err(e)) => {
                trace!(ip = %address, error = %e, "Could not run ping");
                false
            }
            Err(_) => false,
        }
    }
}

/// Address of the interface the host would use to reach the outside world.
///
/// Connecting a UDP socket sends nothing; it only asks the kernel to pick a route.
pub fn detect_local_address() -> Option<IpAddr> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).ok()?;
    socket.connect(SocketAddr::from((Ipv4Addr::new(8, 8, 8, 8), 80))).ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}
