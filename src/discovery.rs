#![cfg(feature = "std")]

//! Local network peer discovery over mDNS/DNS-SD.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use crate::config::SERVICE_TYPE;

/// How long `stop` waits for the daemon to confirm the unregistration.
const UNREGISTER_TIMEOUT: Duration = Duration::from_secs(1);
/// TXT key carrying the per-process id used to recognise our own advertisement.
const NODE_ID_KEY: &str = "node";

/// A resolved peer offering the game service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerInfo {
    /// Advertised instance name; peers are identified by it.
    pub name: String,
    pub addr: SocketAddr,
}

impl PeerInfo {
    pub fn new(name: impl Into<String>, addr: SocketAddr) -> Self {
        Self {
            name: name.into(),
            addr,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryEvent {
    Resolved(PeerInfo),
    /// The advertisement with this instance name went away.
    Lost(String),
}

/// Advertising and browsing backend used by the player node.
#[async_trait::async_trait]
pub trait Discovery: Send {
    /// Announce this instance on `port`.
    async fn advertise(&mut self, instance: &str, port: u16) -> anyhow::Result<()>;

    /// Start reporting peers to `events`.
    async fn browse(&mut self, events: mpsc::UnboundedSender<DiscoveryEvent>) -> anyhow::Result<()>;

    /// Withdraw the advertisement and stop browsing. Safe to call when not started.
    async fn stop(&mut self);
}

/// Backend that neither advertises nor finds anyone. Peers must be dialed by address.
#[derive(Debug, Default)]
pub struct OfflineDiscovery;

#[async_trait::async_trait]
impl Discovery for OfflineDiscovery {
    async fn advertise(&mut self, _instance: &str, _port: u16) -> anyhow::Result<()> {
        Ok(())
    }

    async fn browse(&mut self, _events: mpsc::UnboundedSender<DiscoveryEvent>) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&mut self) {}
}

pub struct MdnsDiscovery {
    daemon: ServiceDaemon,
    /// Random id advertised in TXT; two processes may share an instance name.
    node_id: String,
    registered: Option<String>,
    browsing: Option<JoinHandle<()>>,
}

impl MdnsDiscovery {
    pub fn new() -> anyhow::Result<Self> {
        let daemon = ServiceDaemon::new().map_err(|e| anyhow::anyhow!("mDNS error: {}", e))?;
        Ok(Self {
            daemon,
            node_id: format!("{:016x}", rand::random::<u64>()),
            registered: None,
            browsing: None,
        })
    }
}

#[async_trait::async_trait]
impl Discovery for MdnsDiscovery {
    async fn advertise(&mut self, instance: &str, port: u16) -> anyhow::Result<()> {
        let host = host_name(instance, &self.node_id);
        let mut properties = HashMap::new();
        properties.insert(NODE_ID_KEY.to_string(), self.node_id.clone());
        let info = ServiceInfo::new(SERVICE_TYPE, instance, &host, "", port, Some(properties))
            .map_err(|e| anyhow::anyhow!("Service registration failed: {}", e))?
            .enable_addr_auto();
        let fullname = info.get_fullname().to_string();
        self.daemon
            .register(info)
            .map_err(|e| anyhow::anyhow!("Service registration failed: {}", e))?;
        log::info!("advertising {} on port {} as {}", fullname, port, host);
        self.registered = Some(fullname);
        Ok(())
    }

    async fn browse(&mut self, events: mpsc::UnboundedSender<DiscoveryEvent>) -> anyhow::Result<()> {
        let receiver = self
            .daemon
            .browse(SERVICE_TYPE)
            .map_err(|e| anyhow::anyhow!("mDNS browse failed: {}", e))?;
        let own_id = self.node_id.clone();
        let task = tokio::spawn(async move {
            while let Ok(event) = receiver.recv_async().await {
                let event = match event {
                    ServiceEvent::ServiceResolved(info) => {
                        let service = ResolvedService {
                            service_type: info.get_type(),
                            fullname: info.get_fullname(),
                            port: info.get_port(),
                            node_id: info.get_property_val_str(NODE_ID_KEY),
                            addresses: info
                                .get_addresses()
                                .iter()
                                .filter_map(|a| a.to_string().parse::<IpAddr>().ok())
                                .collect(),
                        };
                        match service.into_peer(&own_id) {
                            Some(peer) => {
                                log::debug!("resolved peer {} at {}", peer.name, peer.addr);
                                DiscoveryEvent::Resolved(peer)
                            }
                            None => continue,
                        }
                    }
                    ServiceEvent::ServiceRemoved(ty, fullname) => {
                        if ty != SERVICE_TYPE {
                            continue;
                        }
                        DiscoveryEvent::Lost(instance_name(&fullname))
                    }
                    _ => continue,
                };
                if events.send(event).is_err() {
                    break;
                }
            }
        });
        self.browsing = Some(task);
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(task) = self.browsing.take() {
            task.abort();
            if let Err(e) = self.daemon.stop_browse(SERVICE_TYPE) {
                log::debug!("stop_browse failed: {}", e);
            }
        }
        if let Some(fullname) = self.registered.take() {
            match self.daemon.unregister(&fullname) {
                Ok(status) => {
                    let _ = tokio::time::timeout(UNREGISTER_TIMEOUT, status.recv_async()).await;
                }
                Err(e) => log::debug!("unregister of {} failed: {}", fullname, e),
            }
        }
    }
}

impl Drop for MdnsDiscovery {
    fn drop(&mut self) {
        let _ = self.daemon.shutdown();
    }
}

/// What the browser learned about one advertisement.
struct ResolvedService<'a> {
    service_type: &'a str,
    fullname: &'a str,
    port: u16,
    node_id: Option<&'a str>,
    addresses: Vec<IpAddr>,
}

impl ResolvedService<'_> {
    /// The dialable peer behind this advertisement, unless it is ours or unusable.
    fn into_peer(self, own_id: &str) -> Option<PeerInfo> {
        if self.service_type != SERVICE_TYPE || self.node_id == Some(own_id) {
            return None;
        }
        let ip = pick_address(&self.addresses)?;
        Some(PeerInfo::new(instance_name(self.fullname), SocketAddr::new(ip, self.port)))
    }
}

/// IPv4 first, then routable IPv6. Link-local IPv6 needs a scope id we do not get.
fn pick_address(addresses: &[IpAddr]) -> Option<IpAddr> {
    let rank = |ip: &IpAddr| match ip {
        IpAddr::V4(v4) if v4.is_loopback() => Some(1),
        IpAddr::V4(_) => Some(0),
        IpAddr::V6(v6) if is_unicast_link_local(v6) || v6.is_unspecified() => None,
        IpAddr::V6(v6) if v6.is_loopback() => Some(3),
        IpAddr::V6(_) => Some(2),
    };
    addresses
        .iter()
        .filter_map(|ip| rank(ip).map(|r| (r, *ip)))
        .min()
        .map(|(_, ip)| ip)
}

fn is_unicast_link_local(ip: &Ipv6Addr) -> bool {
    ip.segments()[0] & 0xffc0 == 0xfe80
}

/// Unique mDNS host name: the instance name made DNS-safe plus our node id.
fn host_name(instance: &str, node_id: &str) -> String {
    let label: String = instance
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("{}-{}.local.", label.trim_matches('-'), node_id)
}

/// `"Alice._navalbattle._tcp.local."` → `"Alice"`.
fn instance_name(fullname: &str) -> String {
    fullname
        .strip_suffix(SERVICE_TYPE)
        .map(|s| s.trim_end_matches('.'))
        .unwrap_or(fullname)
        .to_string()
}
