use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::net::{IpAddr, Ipv4Addr};
use core::time::Duration;

use rand::Rng;

use crate::ship::ShipConfig;

pub const DEFAULT_GRID_SIZE: u32 = 10;
pub const MIN_GRID_SIZE: u32 = 6;
pub const MAX_GRID_SIZE: u32 = 15;
/// Upper bound on how many copies of one catalog entry a fleet may carry.
pub const MAX_SHIP_COUNT: u32 = 5;

/// DNS-SD service type advertised and browsed on the local network.
pub const SERVICE_TYPE: &str = "_navalbattle._tcp.local.";
pub const DEFAULT_PORT: u16 = 47832;

const DEFAULT_FLEET: [(&str, u32, u32); 5] = [
    ("Carrier", 5, 1),
    ("Battleship", 4, 1),
    ("Cruiser", 3, 2),
    ("Destroyer", 2, 3),
    ("Submarine", 1, 2),
];

/// The ship catalog a fresh session starts with.
pub fn default_ship_configs() -> Vec<ShipConfig> {
    DEFAULT_FLEET
        .iter()
        .map(|&(name, size, count)| ShipConfig::new(name, size, count))
        .collect()
}

/// `Battleship-3F2A`: a name unlikely to clash with another player on the same network.
pub fn default_instance_name<R: Rng>(rng: &mut R) -> String {
    format!("{}-{:04X}", DEFAULT_INSTANCE_PREFIX, rng.random::<u16>())
}

const DEFAULT_INSTANCE_PREFIX: &str = "Battleship";

/// Runtime settings for one networked node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Instance name advertised to other peers.
    pub instance_name: String,
    pub bind_addr: IpAddr,
    /// Listening port; `0` picks an ephemeral one.
    pub port: u16,
    pub connect_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            instance_name: DEFAULT_INSTANCE_PREFIX.to_string(),
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(30),
        }
    }
}
