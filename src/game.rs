//! The turn-based session state machine.
//!
//! `Session` owns the phase, turn flag and both fleets. Local actions and inbound
//! messages are applied one at a time; every outbound message produced along the way
//! is queued and handed to the caller through [`Session::take_outbound`].

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use rand::rngs::SmallRng;
use rand::Rng;

use crate::board::is_valid_footprint;
use crate::common::{Position, SessionError, ShotOutcome};
use crate::protocol::{GameMessage, MessageKind};
use crate::ship::{FleetEntry, GameSettings, PlacedShip};
use crate::shot::{resolve_shot, Resolution};

/// Phase of the session. `GameOver` is terminal until a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    Setup,
    Placement,
    WaitingForOpponent,
    Playing,
    GameOver { won: bool },
}

/// Which side of the connection this process is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Accepted the connection; owns the first-turn decision.
    Host,
    /// Dialed out to the host.
    Guest,
}

/// Opponent shot landing on the local board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefenseMark {
    Hit,
    Miss,
}

/// Local shot on the opponent board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackMark {
    Hit,
    Miss,
    Sunk,
}

/// Immutable copy of everything the presentation layer may show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameView {
    pub phase: GamePhase,
    pub my_turn: bool,
    pub role: Option<Role>,
    pub settings: GameSettings,
    pub my_ships: Vec<PlacedShip>,
    pub enemy_shots_on_me: BTreeMap<Position, DefenseMark>,
    pub my_shots: BTreeMap<Position, AttackMark>,
    pub enemy_fleet: Vec<FleetEntry>,
    pub last_message: String,
}

pub struct Session {
    rng: SmallRng,
    role: Option<Role>,
    phase: GamePhase,
    my_turn: bool,
    settings: GameSettings,
    my_ships: Vec<PlacedShip>,
    enemy_shots_on_me: BTreeMap<Position, DefenseMark>,
    my_shots: BTreeMap<Position, AttackMark>,
    enemy_fleet: Vec<FleetEntry>,
    last_message: String,
    /// Our shot still waiting for a SHOT_RESULT.
    pending_shot: Option<Position>,
    /// Host only: the guest confirmed placement before we did.
    peer_ready: bool,
    outbox: Vec<GameMessage>,
}

impl Session {
    /// Create a session in `Setup`. `rng` decides the first turn when hosting.
    pub fn new(rng: SmallRng) -> Self {
        Self {
            rng,
            role: None,
            phase: GamePhase::Setup,
            my_turn: false,
            settings: GameSettings::default(),
            my_ships: Vec::new(),
            enemy_shots_on_me: BTreeMap::new(),
            my_shots: BTreeMap::new(),
            enemy_fleet: Vec::new(),
            last_message: String::new(),
            pending_shot: None,
            peer_ready: false,
            outbox: Vec::new(),
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_my_turn(&self) -> bool {
        self.my_turn
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn my_ships(&self) -> &[PlacedShip] {
        &self.my_ships
    }

    pub fn enemy_fleet(&self) -> &[FleetEntry] {
        &self.enemy_fleet
    }

    pub fn my_shots(&self) -> &BTreeMap<Position, AttackMark> {
        &self.my_shots
    }

    pub fn enemy_shots_on_me(&self) -> &BTreeMap<Position, DefenseMark> {
        &self.enemy_shots_on_me
    }

    pub fn last_message(&self) -> &str {
        &self.last_message
    }

    /// Snapshot of the current state.
    pub fn view(&self) -> GameView {
        GameView {
            phase: self.phase,
            my_turn: self.my_turn,
            role: self.role,
            settings: self.settings.clone(),
            my_ships: self.my_ships.clone(),
            enemy_shots_on_me: self.enemy_shots_on_me.clone(),
            my_shots: self.my_shots.clone(),
            enemy_fleet: self.enemy_fleet.clone(),
            last_message: self.last_message.clone(),
        }
    }

    /// Messages produced since the last call, in order.
    pub fn take_outbound(&mut self) -> Vec<GameMessage> {
        core::mem::take(&mut self.outbox)
    }

    pub fn set_role(&mut self, role: Option<Role>) {
        self.role = role;
    }

    /// Back to `Setup` with default settings and no connection role.
    pub fn reset(&mut self) {
        self.role = None;
        self.phase = GamePhase::Setup;
        self.my_turn = false;
        self.settings = GameSettings::default();
        self.my_ships.clear();
        self.enemy_shots_on_me.clear();
        self.my_shots.clear();
        self.enemy_fleet.clear();
        self.last_message.clear();
        self.pending_shot = None;
        self.peer_ready = false;
        self.outbox.clear();
    }

    pub fn update_settings(&mut self, settings: GameSettings) -> Result<(), SessionError> {
        if self.phase != GamePhase::Setup {
            return Err(SessionError::WrongPhase);
        }
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// Offer the current settings to the guest.
    pub fn send_settings(&mut self) -> Result<(), SessionError> {
        match self.role {
            None => return Err(SessionError::NotConnected),
            Some(Role::Guest) => return Err(SessionError::NotHost),
            Some(Role::Host) => {}
        }
        if self.phase != GamePhase::Setup {
            return Err(SessionError::WrongPhase);
        }
        self.settings.validate()?;
        self.outbox.push(GameMessage::settings(self.settings.clone()));
        self.last_message = "Settings sent".to_string();
        Ok(())
    }

    pub fn start_placement(&mut self) -> Result<(), SessionError> {
        if self.phase != GamePhase::Setup {
            return Err(SessionError::WrongPhase);
        }
        self.settings.validate()?;
        self.enemy_fleet = self.settings.fleet_entries();
        self.phase = GamePhase::Placement;
        self.last_message = "Place your ships".to_string();
        Ok(())
    }

    /// Commit the local fleet and tell the peer we are ready.
    pub fn confirm_placement(&mut self, mut ships: Vec<PlacedShip>) -> Result<(), SessionError> {
        if self.phase != GamePhase::Placement {
            return Err(SessionError::WrongPhase);
        }
        self.check_fleet(&ships)?;
        for ship in &mut ships {
            ship.clear_hits();
        }
        self.my_ships = ships;
        self.outbox.push(GameMessage::placement_ready());
        self.phase = GamePhase::WaitingForOpponent;
        self.last_message = "Waiting for the opponent...".to_string();
        if self.role == Some(Role::Host) && self.peer_ready {
            self.begin_play();
        }
        Ok(())
    }

    /// Fire at `pos` on the opponent board.
    pub fn shoot(&mut self, pos: Position) -> Result<(), SessionError> {
        if self.phase != GamePhase::Playing {
            return Err(SessionError::WrongPhase);
        }
        if !self.my_turn {
            return Err(SessionError::NotYourTurn);
        }
        if !pos.in_bounds(self.settings.grid_size) {
            return Err(SessionError::OutOfBounds);
        }
        if self.my_shots.contains_key(&pos) {
            return Err(SessionError::AlreadyTargeted);
        }
        self.my_turn = false;
        self.pending_shot = Some(pos);
        self.outbox.push(GameMessage::shot(pos));
        Ok(())
    }

    /// Apply one message from the peer.
    pub fn handle_message(&mut self, msg: GameMessage) {
        match msg.kind {
            MessageKind::Settings => match msg.settings {
                Some(settings) => self.receive_settings(settings),
                None => log::warn!("SETTINGS without settings, ignored"),
            },
            MessageKind::SettingsAck => {
                log::debug!("settings acknowledged by peer");
                self.last_message = "Opponent accepted the settings".to_string();
            }
            MessageKind::PlacementReady => self.receive_placement_ready(),
            MessageKind::FirstTurn => match msg.host_goes_first {
                Some(host_first) => self.receive_first_turn(host_first),
                None => log::warn!("FIRST_TURN without hostGoesFirst, ignored"),
            },
            MessageKind::Shot => match msg.position {
                Some(pos) => self.receive_shot(pos),
                None => log::warn!("SHOT without position, ignored"),
            },
            MessageKind::ShotResult => match (msg.position, msg.shot_outcome) {
                (Some(pos), Some(outcome)) => {
                    self.receive_shot_result(pos, outcome, msg.sunk_ship_name, msg.sunk_ship_size)
                }
                _ => log::warn!("SHOT_RESULT missing position or outcome, ignored"),
            },
        }
    }

    fn receive_settings(&mut self, settings: GameSettings) {
        if self.phase != GamePhase::Setup {
            log::warn!("SETTINGS received in {:?}, ignored", self.phase);
            return;
        }
        if let Err(e) = settings.validate() {
            log::warn!("rejecting settings from peer: {}", e);
            self.last_message = format!("Opponent sent unusable settings: {}", e);
            return;
        }
        self.enemy_fleet = settings.fleet_entries();
        self.settings = settings;
        self.outbox.push(GameMessage::settings_ack());
        self.last_message = "Settings received".to_string();
    }

    fn receive_placement_ready(&mut self) {
        if self.role != Some(Role::Host) {
            log::debug!("PLACEMENT_READY ignored: not hosting");
            return;
        }
        match self.phase {
            GamePhase::WaitingForOpponent => self.begin_play(),
            GamePhase::Setup | GamePhase::Placement => {
                self.peer_ready = true;
                self.last_message = "Opponent is ready".to_string();
            }
            _ => log::warn!("PLACEMENT_READY received in {:?}, ignored", self.phase),
        }
    }

    /// Host: flip the coin, tell the guest, start playing.
    fn begin_play(&mut self) {
        let host_first: bool = self.rng.random();
        self.my_turn = host_first;
        self.peer_ready = false;
        self.outbox.push(GameMessage::first_turn(host_first));
        self.phase = GamePhase::Playing;
        self.announce_turn();
    }

    fn receive_first_turn(&mut self, host_first: bool) {
        if self.role != Some(Role::Guest) || self.phase != GamePhase::WaitingForOpponent {
            log::warn!("FIRST_TURN received in {:?} as {:?}, ignored", self.phase, self.role);
            return;
        }
        self.my_turn = !host_first;
        self.phase = GamePhase::Playing;
        self.announce_turn();
    }

    fn announce_turn(&mut self) {
        self.last_message = if self.my_turn {
            "Your turn. Fire!".to_string()
        } else {
            "Waiting for the opponent's move...".to_string()
        };
    }

    fn receive_shot(&mut self, pos: Position) {
        if self.phase != GamePhase::Playing {
            log::warn!("SHOT received in {:?}, ignored", self.phase);
            return;
        }
        let resolution = resolve_shot(pos, &mut self.my_ships);
        match &resolution {
            Resolution::Miss => {
                if pos.in_bounds(self.settings.grid_size) {
                    self.enemy_shots_on_me.insert(pos, DefenseMark::Miss);
                }
                self.last_message = "Opponent missed. Your turn!".to_string();
            }
            Resolution::Hit { .. } => {
                self.enemy_shots_on_me.insert(pos, DefenseMark::Hit);
                self.last_message = "Your ship was hit!".to_string();
            }
            Resolution::Sunk { ship, name, .. } => {
                for cell in self.my_ships[*ship].footprint() {
                    self.enemy_shots_on_me.insert(*cell, DefenseMark::Hit);
                }
                self.last_message = format!("Your {} was sunk!", name);
            }
        }
        let outcome = resolution.outcome();
        let sunk = match resolution {
            Resolution::Sunk { name, size, .. } => Some((name, size)),
            _ => None,
        };
        self.outbox.push(GameMessage::shot_result(pos, outcome, sunk));

        // The shooter keeps firing after a hit, so only a miss hands us the turn.
        self.my_turn = outcome == ShotOutcome::Miss;

        if !self.my_ships.is_empty() && self.my_ships.iter().all(PlacedShip::is_sunk) {
            self.my_turn = false;
            self.phase = GamePhase::GameOver { won: false };
            self.last_message = "Defeat. Your whole fleet was sunk.".to_string();
        }
    }

    fn receive_shot_result(
        &mut self,
        pos: Position,
        outcome: ShotOutcome,
        sunk_name: Option<String>,
        sunk_size: Option<u32>,
    ) {
        if self.phase != GamePhase::Playing {
            log::warn!("SHOT_RESULT received in {:?}, ignored", self.phase);
            return;
        }
        if self.pending_shot != Some(pos) {
            log::warn!("SHOT_RESULT for {:?} does not match our last shot, ignored", pos);
            return;
        }
        self.pending_shot = None;
        match outcome {
            ShotOutcome::Miss => {
                self.my_shots.insert(pos, AttackMark::Miss);
                self.my_turn = false;
                self.last_message = "Miss.".to_string();
            }
            ShotOutcome::Hit => {
                self.my_shots.insert(pos, AttackMark::Hit);
                self.my_turn = true;
                self.last_message = "Hit! Fire again.".to_string();
            }
            ShotOutcome::Sunk => {
                self.my_shots.insert(pos, AttackMark::Sunk);
                self.mark_sunk_run(pos);
                self.record_sunk(sunk_name.as_deref(), sunk_size);
                self.my_turn = true;
                self.last_message = format!("{} sunk!", sunk_name.as_deref().unwrap_or("Ship"));
            }
        }

        if !self.enemy_fleet.is_empty() && self.enemy_fleet.iter().all(FleetEntry::is_sunk) {
            self.my_turn = false;
            self.phase = GamePhase::GameOver { won: true };
            self.last_message = "Victory! Every enemy ship is sunk.".to_string();
        }
    }

    /// Turn the hits orthogonally connected to `from` into sinks. Ships never touch,
    /// so the connected run is exactly the ship that went down.
    fn mark_sunk_run(&mut self, from: Position) {
        let mut stack = Vec::from([from]);
        while let Some(cell) = stack.pop() {
            for next in cell.orthogonal() {
                if self.my_shots.get(&next) == Some(&AttackMark::Hit) {
                    self.my_shots.insert(next, AttackMark::Sunk);
                    stack.push(next);
                }
            }
        }
    }

    fn record_sunk(&mut self, name: Option<&str>, size: Option<u32>) {
        let by_name = name.and_then(|name| {
            self.enemy_fleet.iter().position(|e| {
                !e.is_sunk() && e.name == name && size.map_or(true, |s| e.size == s)
            })
        });
        let index = by_name.or_else(|| {
            size.and_then(|s| self.enemy_fleet.iter().position(|e| !e.is_sunk() && e.size == s))
        });
        match index {
            Some(i) => self.enemy_fleet[i].mark_sunk(),
            None => log::warn!("sunk ship {:?} (size {:?}) not found in opponent fleet", name, size),
        }
    }

    /// Ships must match the catalog and be legal with respect to each other.
    fn check_fleet(&self, ships: &[PlacedShip]) -> Result<(), SessionError> {
        let mut expected = self.settings.ship_instances();
        let mut supplied: Vec<(String, u32)> = ships
            .iter()
            .map(|s| (s.name().to_string(), s.size()))
            .collect();
        expected.sort();
        supplied.sort();
        if expected != supplied {
            return Err(SessionError::FleetMismatch);
        }

        let mut occupied = BTreeSet::new();
        for ship in ships {
            if ship.footprint().len() != ship.size() as usize
                || !is_valid_footprint(ship.footprint(), self.settings.grid_size, &occupied)
            {
                return Err(SessionError::InvalidPlacement);
            }
            occupied.extend(ship.footprint().iter().copied());
        }
        Ok(())
    }
}
