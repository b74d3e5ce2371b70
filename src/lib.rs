#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod board;
mod common;
mod config;
mod game;
mod ship;
mod shot;
pub mod protocol;
#[cfg(feature = "std")]
pub mod discovery;
#[cfg(feature = "std")]
mod logging;
#[cfg(feature = "std")]
mod player_cli;
#[cfg(feature = "std")]
pub mod player_node;
#[cfg(feature = "std")]
pub mod transport;

pub use board::*;
pub use common::*;
pub use config::*;
pub use game::*;
pub use protocol::*;
pub use ship::*;
pub use shot::*;
#[cfg(feature = "std")]
pub use discovery::{Discovery, DiscoveryEvent, MdnsDiscovery, OfflineDiscovery, PeerInfo};
#[cfg(feature = "std")]
pub use logging::init_logging;
#[cfg(feature = "std")]
pub use player_cli::*;
#[cfg(feature = "std")]
pub use player_node::*;
#[cfg(feature = "std")]
pub use transport::Channel;
