use alloc::string::String;

use crate::common::{Position, ShotOutcome};
use crate::ship::PlacedShip;

/// What an incoming shot did to the defending fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Miss,
    /// Hit the ship at index `ship` without sinking it.
    Hit { ship: usize },
    /// Hit the ship at index `ship` and sank it.
    Sunk { ship: usize, name: String, size: u32 },
}

impl Resolution {
    pub fn outcome(&self) -> ShotOutcome {
        match self {
            Resolution::Miss => ShotOutcome::Miss,
            Resolution::Hit { .. } => ShotOutcome::Hit,
            Resolution::Sunk { .. } => ShotOutcome::Sunk,
        }
    }
}

/// Resolve a shot at `pos` against `ships`, recording the hit on the ship struck.
///
/// Footprints are disjoint, so only the first ship containing `pos` is considered.
pub fn resolve_shot(pos: Position, ships: &mut [PlacedShip]) -> Resolution {
    let Some(index) = ships.iter().position(|s| s.occupies(pos)) else {
        return Resolution::Miss;
    };
    let ship = &mut ships[index];
    ship.receive_hit(pos);
    if ship.is_sunk() {
        Resolution::Sunk {
            ship: index,
            name: String::from(ship.name()),
            size: ship.size(),
        }
    } else {
        Resolution::Hit { ship: index }
    }
}
