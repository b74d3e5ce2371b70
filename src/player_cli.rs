#![cfg(feature = "std")]

use std::fmt::Write;
use std::net::SocketAddr;
use std::string::String;

use crate::{
    board::PlacementPlan,
    common::Position,
    game::{AttackMark, DefenseMark, GamePhase, GameView, Role},
    ship::Orientation,
};

/// One line of player input at the game prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Help,
    Peers,
    /// Peer by index into the discovered list.
    ConnectIndex(usize),
    ConnectAddr(SocketAddr),
    Grid(u32),
    /// Set a catalog entry; a count of zero removes it.
    Ship { name: String, size: u32, count: u32 },
    Settings,
    Send,
    Start,
    /// Place the next ship; no orientation means the current default.
    Place(Position, Option<Orientation>),
    /// Show where the next ship would go without placing it.
    Preview(Position, Option<Orientation>),
    /// Flip the default orientation.
    Rotate,
    Undo,
    Auto,
    Confirm,
    Board,
    Fire(Position),
    Reset,
    Quit,
}

pub const HELP: &str = "\
Commands:
  peers                      list players found on the network
  connect <n|ip:port>        connect to a listed peer or an address
  grid <6-15>                set the grid size (host, before sending)
  ship <name> <size> <count> set a ship type; count 0 removes it
  settings                   show the current settings
  send                       send settings to the guest (host only)
  start                      start placing ships
  place <A1> [h|v]           place the next ship
  preview <A1> [h|v]         show where the next ship would go
  rotate                     switch the default orientation
  undo                       remove the last placed ship
  auto                       place the remaining ships randomly
  confirm                    lock in the placement
  board                      show both boards
  fire <A1>                  shoot at the opponent
  reset                      leave the game and search again
  quit                       exit";

pub fn coord_to_string(pos: Position) -> String {
    let col = (b'A' + pos.col as u8) as char;
    std::format!("{}{}", col, pos.row + 1)
}

/// `"B7"` → row 6, column 1. Case-insensitive.
pub fn parse_coord(input: &str) -> Option<Position> {
    if input.len() < 2 {
        return None;
    }
    let mut chars = input.chars();
    let col_ch = chars.next()?.to_ascii_uppercase();
    if !col_ch.is_ascii_uppercase() {
        return None;
    }
    let col = (col_ch as u8 - b'A') as i32;
    let row: i32 = chars.as_str().parse().ok()?;
    if row <= 0 {
        return None;
    }
    Some(Position::new(row - 1, col))
}

fn parse_orientation(input: &str) -> Option<Orientation> {
    match input.to_ascii_lowercase().as_str() {
        "h" | "horizontal" => Some(Orientation::Horizontal),
        "v" | "vertical" => Some(Orientation::Vertical),
        _ => None,
    }
}

fn parse_number<T: std::str::FromStr>(arg: Option<&str>, what: &str) -> Result<T, String> {
    arg.ok_or_else(|| std::format!("missing {}", what))?
        .parse()
        .map_err(|_| std::format!("invalid {}", what))
}

pub fn parse_command(line: &str) -> Result<CliCommand, String> {
    let mut parts = line.split_whitespace();
    let Some(word) = parts.next() else {
        return Err("empty command".into());
    };
    let cmd = match word.to_ascii_lowercase().as_str() {
        "help" | "?" => CliCommand::Help,
        "peers" => CliCommand::Peers,
        "connect" => {
            let target = parts.next().ok_or("usage: connect <n|ip:port>")?;
            if let Ok(index) = target.parse::<usize>() {
                CliCommand::ConnectIndex(index)
            } else {
                let addr = target
                    .parse::<SocketAddr>()
                    .map_err(|_| std::format!("not a peer number or address: {}", target))?;
                CliCommand::ConnectAddr(addr)
            }
        }
        "grid" => CliCommand::Grid(parse_number(parts.next(), "grid size")?),
        "ship" => {
            let name = parts.next().ok_or("usage: ship <name> <size> <count>")?.into();
            let size = parse_number(parts.next(), "ship size")?;
            let count = parse_number(parts.next(), "ship count")?;
            CliCommand::Ship { name, size, count }
        }
        "settings" => CliCommand::Settings,
        "send" => CliCommand::Send,
        "start" => CliCommand::Start,
        verb @ ("place" | "preview") => {
            let pos = parts
                .next()
                .and_then(parse_coord)
                .ok_or_else(|| std::format!("usage: {} <A1> [h|v]", verb))?;
            let orientation = match parts.next() {
                Some(o) => Some(parse_orientation(o).ok_or("orientation must be h or v")?),
                None => None,
            };
            if verb == "place" {
                CliCommand::Place(pos, orientation)
            } else {
                CliCommand::Preview(pos, orientation)
            }
        }
        "rotate" | "r" => CliCommand::Rotate,
        "undo" => CliCommand::Undo,
        "auto" => CliCommand::Auto,
        "confirm" => CliCommand::Confirm,
        "board" => CliCommand::Board,
        "fire" | "shoot" => {
            let pos = parts.next().and_then(parse_coord).ok_or("usage: fire <A1>")?;
            CliCommand::Fire(pos)
        }
        "reset" => CliCommand::Reset,
        "quit" | "exit" => CliCommand::Quit,
        other => return Err(std::format!("unknown command: {} (try help)", other)),
    };
    Ok(cmd)
}

fn render_grid(grid_size: u32, cell: impl Fn(Position) -> char) -> String {
    let mut out = String::new();
    out.push_str("   ");
    for c in 0..grid_size {
        let ch = (b'A' + c as u8) as char;
        let _ = write!(out, " {}", ch);
    }
    out.push('\n');
    for r in 0..grid_size as i32 {
        let _ = write!(out, "{:2} ", r + 1);
        for c in 0..grid_size as i32 {
            let _ = write!(out, " {}", cell(Position::new(r, c)));
        }
        out.push('\n');
    }
    out
}

/// Own board: `S` ship, `X` hit, `o` miss.
pub fn render_own_board(view: &GameView) -> String {
    render_grid(view.settings.grid_size, |pos| {
        match view.enemy_shots_on_me.get(&pos) {
            Some(DefenseMark::Hit) => 'X',
            Some(DefenseMark::Miss) => 'o',
            None if view.my_ships.iter().any(|s| s.occupies(pos)) => 'S',
            None => '.',
        }
    })
}

/// Target board: `#` sunk, `X` hit, `o` miss.
pub fn render_target_board(view: &GameView) -> String {
    render_grid(view.settings.grid_size, |pos| match view.my_shots.get(&pos) {
        Some(AttackMark::Sunk) => '#',
        Some(AttackMark::Hit) => 'X',
        Some(AttackMark::Miss) => 'o',
        None => '.',
    })
}

/// Placement in progress, with `preview` cells shown as `+`.
pub fn render_placement(plan: &PlacementPlan, grid_size: u32, preview: &[Position]) -> String {
    render_grid(grid_size, |pos| {
        if plan.occupied().contains(&pos) {
            'S'
        } else if preview.contains(&pos) {
            '+'
        } else {
            '.'
        }
    })
}

pub fn render_fleet_status(view: &GameView) -> String {
    let mut out = String::from("Enemy fleet:\n");
    for entry in &view.enemy_fleet {
        let state = if entry.is_sunk() { "sunk" } else { "afloat" };
        let _ = writeln!(out, "  {:<12} {} {}", entry.name, entry.size, state);
    }
    out
}

/// One-line summary of phase, role and turn.
pub fn status_line(view: &GameView) -> String {
    let role = match view.role {
        Some(Role::Host) => "host",
        Some(Role::Guest) => "guest",
        None => "not connected",
    };
    let phase = match view.phase {
        GamePhase::Setup => "setup",
        GamePhase::Placement => "placing ships",
        GamePhase::WaitingForOpponent => "waiting for opponent",
        GamePhase::Playing if view.my_turn => "your turn",
        GamePhase::Playing => "opponent's turn",
        GamePhase::GameOver { won: true } => "game over, you won",
        GamePhase::GameOver { won: false } => "game over, you lost",
    };
    std::format!("[{}] {}", role, phase)
}
