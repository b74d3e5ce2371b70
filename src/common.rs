//! Common types: grid positions, shot outcomes and session errors.

use serde::{Deserialize, Serialize};

/// A cell on the grid, identified by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Returns `true` when the cell lies inside a `grid_size` × `grid_size` board.
    pub fn in_bounds(&self, grid_size: u32) -> bool {
        let n = grid_size as i64;
        (0..n).contains(&(self.row as i64)) && (0..n).contains(&(self.col as i64))
    }

    /// The four orthogonal neighbours.
    pub fn orthogonal(&self) -> [Position; 4] {
        [
            Position::new(self.row - 1, self.col),
            Position::new(self.row + 1, self.col),
            Position::new(self.row, self.col - 1),
            Position::new(self.row, self.col + 1),
        ]
    }

    /// Whether `other` touches this cell, diagonals included. A cell is not adjacent to itself.
    pub fn touches(&self, other: &Position) -> bool {
        *self != *other && (self.row - other.row).abs() <= 1 && (self.col - other.col).abs() <= 1
    }
}

/// Result of a shot as reported on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShotOutcome {
    Miss,
    Hit,
    /// The shot hit the last intact cell of a ship.
    Sunk,
}

/// Local actions rejected by the session. None of these ever reach the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The action is not allowed in the current phase.
    WrongPhase,
    /// Only the host may negotiate settings.
    NotHost,
    NotConnected,
    AlreadyConnected,
    NotYourTurn,
    /// The cell was already fired upon.
    AlreadyTargeted,
    OutOfBounds,
    InvalidSettings(&'static str),
    /// Footprint out of bounds, overlapping or touching another ship.
    InvalidPlacement,
    /// Supplied ships do not match the negotiated catalog.
    FleetMismatch,
    PlacementIncomplete,
    /// The session driver has shut down.
    Closed,
}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SessionError::WrongPhase => write!(f, "Action not allowed in the current phase"),
            SessionError::NotHost => write!(f, "Only the host can send settings"),
            SessionError::NotConnected => write!(f, "No opponent connected"),
            SessionError::AlreadyConnected => write!(f, "Already connected to an opponent"),
            SessionError::NotYourTurn => write!(f, "It is not your turn"),
            SessionError::AlreadyTargeted => write!(f, "That cell was already targeted"),
            SessionError::OutOfBounds => write!(f, "Position is outside the grid"),
            SessionError::InvalidSettings(reason) => write!(f, "Invalid settings: {}", reason),
            SessionError::InvalidPlacement => write!(f, "Invalid ship placement"),
            SessionError::FleetMismatch => write!(f, "Fleet does not match the game settings"),
            SessionError::PlacementIncomplete => write!(f, "Not every ship has been placed"),
            SessionError::Closed => write!(f, "Session has shut down"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SessionError {}
