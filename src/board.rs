//! Ship placement: footprint generation, the legality check and the placement workflow.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec::Vec;

use rand::Rng;

use crate::common::{Position, SessionError};
use crate::ship::{GameSettings, Orientation, PlacedShip};

/// Attempts to find a spot for a single ship before giving up on the current layout.
const SHIP_ATTEMPTS: usize = 100;
/// Full layouts tried by `auto_place` before reporting failure.
const LAYOUT_ATTEMPTS: usize = 50;

/// `size` consecutive cells from `origin`, along `+col` when horizontal or `+row` when vertical.
pub fn footprint(origin: Position, size: u32, orientation: Orientation) -> Vec<Position> {
    (0..size as i32)
        .map(|i| match orientation {
            Orientation::Horizontal => Position::new(origin.row, origin.col.saturating_add(i)),
            Orientation::Vertical => Position::new(origin.row.saturating_add(i), origin.col),
        })
        .collect()
}

/// Whether a ship of `size` at `origin` may be placed given the cells already `occupied`.
///
/// Every cell must be on the board, must not be occupied, and must not touch an occupied
/// cell outside the footprint, diagonals included.
pub fn is_valid_placement(
    origin: Position,
    size: u32,
    orientation: Orientation,
    grid_size: u32,
    occupied: &BTreeSet<Position>,
) -> bool {
    is_valid_footprint(&footprint(origin, size, orientation), grid_size, occupied)
}

/// Footprint form of [`is_valid_placement`].
pub fn is_valid_footprint(cells: &[Position], grid_size: u32, occupied: &BTreeSet<Position>) -> bool {
    if cells.is_empty() {
        return false;
    }
    for cell in cells {
        if !cell.in_bounds(grid_size) || occupied.contains(cell) {
            return false;
        }
        for dr in -1..=1 {
            for dc in -1..=1 {
                let neighbour = Position::new(cell.row + dr, cell.col + dc);
                if occupied.contains(&neighbour) && !cells.contains(&neighbour) {
                    return false;
                }
            }
        }
    }
    true
}

/// Places a random legal fleet for `settings`.
pub fn random_fleet<R: Rng>(settings: &GameSettings, rng: &mut R) -> Result<Vec<PlacedShip>, SessionError> {
    let mut plan = PlacementPlan::new(settings);
    plan.auto_place(rng)?;
    plan.finish()
}

/// Ships still to place, in catalog order, and the ones already on the board.
#[derive(Debug, Clone)]
pub struct PlacementPlan {
    grid_size: u32,
    queue: Vec<(String, u32)>,
    placed: Vec<PlacedShip>,
    occupied: BTreeSet<Position>,
}

impl PlacementPlan {
    pub fn new(settings: &GameSettings) -> Self {
        Self {
            grid_size: settings.grid_size,
            queue: settings.ship_instances(),
            placed: Vec::new(),
            occupied: BTreeSet::new(),
        }
    }

    /// Name and size of the next ship to place.
    pub fn current(&self) -> Option<(&str, u32)> {
        self.queue
            .get(self.placed.len())
            .map(|(name, size)| (name.as_str(), *size))
    }

    pub fn remaining(&self) -> &[(String, u32)] {
        &self.queue[self.placed.len()..]
    }

    pub fn placed(&self) -> &[PlacedShip] {
        &self.placed
    }

    pub fn occupied(&self) -> &BTreeSet<Position> {
        &self.occupied
    }

    pub fn is_complete(&self) -> bool {
        self.placed.len() == self.queue.len()
    }

    /// Cells the current ship would cover at `origin`.
    pub fn preview(&self, origin: Position, orientation: Orientation) -> Vec<Position> {
        match self.current() {
            Some((_, size)) => footprint(origin, size, orientation),
            None => Vec::new(),
        }
    }

    pub fn can_place(&self, origin: Position, orientation: Orientation) -> bool {
        match self.current() {
            Some((_, size)) => {
                is_valid_placement(origin, size, orientation, self.grid_size, &self.occupied)
            }
            None => false,
        }
    }

    /// Place the current ship.
    pub fn place(&mut self, origin: Position, orientation: Orientation) -> Result<&PlacedShip, SessionError> {
        let (name, size) = match self.current() {
            Some((name, size)) => (String::from(name), size),
            None => return Err(SessionError::InvalidPlacement),
        };
        if !is_valid_placement(origin, size, orientation, self.grid_size, &self.occupied) {
            return Err(SessionError::InvalidPlacement);
        }
        let ship = PlacedShip::new(self.placed.len() as u32, &name, size, origin, orientation);
        self.occupied.extend(ship.footprint().iter().copied());
        self.placed.push(ship);
        Ok(&self.placed[self.placed.len() - 1])
    }

    /// Take back the most recently placed ship.
    pub fn undo(&mut self) -> Option<PlacedShip> {
        let ship = self.placed.pop()?;
        for cell in ship.footprint() {
            self.occupied.remove(cell);
        }
        Some(ship)
    }

    /// Place every remaining ship at random.
    ///
    /// Ships placed before the call are kept. On failure the plan is left as it was.
    pub fn auto_place<R: Rng>(&mut self, rng: &mut R) -> Result<(), SessionError> {
        let start = self.placed.len();
        for _ in 0..LAYOUT_ATTEMPTS {
            if self.fill_remaining(rng) {
                return Ok(());
            }
            while self.placed.len() > start {
                self.undo();
            }
        }
        Err(SessionError::InvalidPlacement)
    }

    /// The finished fleet.
    pub fn finish(self) -> Result<Vec<PlacedShip>, SessionError> {
        if !self.is_complete() {
            return Err(SessionError::PlacementIncomplete);
        }
        Ok(self.placed)
    }

    fn fill_remaining<R: Rng>(&mut self, rng: &mut R) -> bool {
        loop {
            let size = match self.current() {
                Some((_, size)) => size,
                None => return true,
            };
            match self.random_spot(rng, size) {
                Some((origin, orientation)) => {
                    if self.place(origin, orientation).is_err() {
                        return false;
                    }
                }
                None => return false,
            }
        }
    }

    fn random_spot<R: Rng>(&self, rng: &mut R, size: u32) -> Option<(Position, Orientation)> {
        if size == 0 || size > self.grid_size {
            return None;
        }
        let last = self.grid_size - 1;
        let span = self.grid_size - size;
        for _ in 0..SHIP_ATTEMPTS {
            let orientation = if rng.random() {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let (max_r, max_c) = match orientation {
                Orientation::Horizontal => (last, span),
                Orientation::Vertical => (span, last),
            };
            let origin = Position::new(
                rng.random_range(0..=max_r) as i32,
                rng.random_range(0..=max_c) as i32,
            );
            if is_valid_placement(origin, size, orientation, self.grid_size, &self.occupied) {
                return Some((origin, orientation));
            }
        }
        None
    }
}
