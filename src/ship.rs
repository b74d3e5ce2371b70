//! Ship catalog, negotiated settings, placed ships and opponent fleet knowledge.

use alloc::collections::BTreeSet;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::board::footprint;
use crate::common::{Position, SessionError};
use crate::config::{
    default_ship_configs, DEFAULT_GRID_SIZE, MAX_GRID_SIZE, MAX_SHIP_COUNT, MIN_GRID_SIZE,
};

/// Orientation of a ship on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Extends along `+col`.
    Horizontal,
    /// Extends along `+row`.
    Vertical,
}

impl Orientation {
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

/// Catalog entry: `count` ships called `name`, each `size` cells long.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipConfig {
    pub name: String,
    pub size: u32,
    pub count: u32,
}

impl ShipConfig {
    pub fn new(name: &str, size: u32, count: u32) -> Self {
        Self {
            name: name.to_string(),
            size,
            count,
        }
    }
}

/// Grid size and ship catalog, chosen by the host and adopted by the guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    pub grid_size: u32,
    pub ship_configs: Vec<ShipConfig>,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            ship_configs: default_ship_configs(),
        }
    }
}

impl GameSettings {
    pub fn new(grid_size: u32, ship_configs: Vec<ShipConfig>) -> Self {
        Self {
            grid_size,
            ship_configs,
        }
    }

    /// Check the settings are playable.
    pub fn validate(&self) -> Result<(), SessionError> {
        if !(MIN_GRID_SIZE..=MAX_GRID_SIZE).contains(&self.grid_size) {
            return Err(SessionError::InvalidSettings("grid size out of range"));
        }
        for cfg in &self.ship_configs {
            if cfg.name.is_empty() {
                return Err(SessionError::InvalidSettings("ship without a name"));
            }
            if cfg.size == 0 || cfg.size > self.grid_size {
                return Err(SessionError::InvalidSettings("ship size does not fit the grid"));
            }
            if cfg.count > MAX_SHIP_COUNT {
                return Err(SessionError::InvalidSettings("too many ships of one kind"));
            }
        }
        if self.total_ships() == 0 {
            return Err(SessionError::InvalidSettings("fleet is empty"));
        }
        Ok(())
    }

    /// Number of ship instances across the whole catalog.
    pub fn total_ships(&self) -> usize {
        self.ship_configs.iter().map(|c| c.count as usize).sum()
    }

    /// One `(name, size)` per ship instance, in catalog order.
    pub fn ship_instances(&self) -> Vec<(String, u32)> {
        self.ship_configs
            .iter()
            .flat_map(|cfg| (0..cfg.count).map(move |_| (cfg.name.clone(), cfg.size)))
            .collect()
    }

    /// Fresh opponent fleet knowledge: one unhit entry per ship instance.
    pub fn fleet_entries(&self) -> Vec<FleetEntry> {
        self.ship_instances()
            .into_iter()
            .enumerate()
            .map(|(id, (name, size))| FleetEntry::new(id as u32, name, size))
            .collect()
    }
}

/// A ship on the local board, with the cells the opponent has hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedShip {
    id: u32,
    name: String,
    size: u32,
    origin: Position,
    orientation: Orientation,
    footprint: Vec<Position>,
    hits: BTreeSet<Position>,
}

impl PlacedShip {
    /// Lay a ship of `size` cells from `origin` along `orientation`.
    pub fn new(id: u32, name: &str, size: u32, origin: Position, orientation: Orientation) -> Self {
        Self {
            id,
            name: name.to_string(),
            size,
            origin,
            orientation,
            footprint: footprint(origin, size, orientation),
            hits: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Cells occupied by the ship, starting at the origin.
    pub fn footprint(&self) -> &[Position] {
        &self.footprint
    }

    pub fn hits(&self) -> &BTreeSet<Position> {
        &self.hits
    }

    pub fn occupies(&self, pos: Position) -> bool {
        self.footprint.contains(&pos)
    }

    /// Record a hit at `pos`. Returns `false` when `pos` is not part of the ship.
    pub fn receive_hit(&mut self, pos: Position) -> bool {
        if !self.occupies(pos) {
            return false;
        }
        self.hits.insert(pos);
        true
    }

    pub fn is_sunk(&self) -> bool {
        self.hits.len() >= self.size as usize
    }

    pub(crate) fn clear_hits(&mut self) {
        self.hits.clear();
    }
}

/// What the local player knows about one opponent ship.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetEntry {
    pub id: u32,
    pub name: String,
    pub size: u32,
    hit_count: u32,
}

impl FleetEntry {
    pub fn new(id: u32, name: String, size: u32) -> Self {
        Self {
            id,
            name,
            size,
            hit_count: 0,
        }
    }

    pub fn hit_count(&self) -> u32 {
        self.hit_count
    }

    pub fn is_sunk(&self) -> bool {
        self.hit_count >= self.size
    }

    /// Mark the ship as sunk. The hit count never decreases.
    pub fn mark_sunk(&mut self) {
        self.hit_count = self.hit_count.max(self.size);
    }
}
