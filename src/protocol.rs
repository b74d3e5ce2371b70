use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::common::{Position, ShotOutcome};
use crate::ship::GameSettings;

/// Kind of a protocol message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    /// Host proposes the game settings.
    Settings,
    /// Guest adopted the settings.
    SettingsAck,
    /// Sender finished placing its fleet.
    PlacementReady,
    /// Host announces who moves first.
    FirstTurn,
    Shot,
    ShotResult,
}

/// Envelope exchanged between peers. Which optional fields are set depends on `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<GameSettings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shot_outcome: Option<ShotOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_goes_first: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunk_ship_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunk_ship_size: Option<u32>,
}

impl GameMessage {
    fn bare(kind: MessageKind) -> Self {
        Self {
            kind,
            settings: None,
            position: None,
            shot_outcome: None,
            host_goes_first: None,
            sunk_ship_name: None,
            sunk_ship_size: None,
        }
    }

    pub fn settings(settings: GameSettings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::bare(MessageKind::Settings)
        }
    }

    pub fn settings_ack() -> Self {
        Self::bare(MessageKind::SettingsAck)
    }

    pub fn placement_ready() -> Self {
        Self::bare(MessageKind::PlacementReady)
    }

    pub fn first_turn(host_goes_first: bool) -> Self {
        Self {
            host_goes_first: Some(host_goes_first),
            ..Self::bare(MessageKind::FirstTurn)
        }
    }

    pub fn shot(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::bare(MessageKind::Shot)
        }
    }

    /// Result of the shot at `position`; `sunk` carries the ship's name and size.
    pub fn shot_result(position: Position, outcome: ShotOutcome, sunk: Option<(String, u32)>) -> Self {
        let (sunk_ship_name, sunk_ship_size) = match sunk {
            Some((name, size)) => (Some(name), Some(size)),
            None => (None, None),
        };
        Self {
            position: Some(position),
            shot_outcome: Some(outcome),
            sunk_ship_name,
            sunk_ship_size,
            ..Self::bare(MessageKind::ShotResult)
        }
    }
}
