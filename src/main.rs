#[cfg(not(feature = "std"))]
fn main() {}

#[cfg(feature = "std")]
use std::net::{IpAddr, SocketAddr};
#[cfg(feature = "std")]
use std::sync::Arc;

#[cfg(feature = "std")]
use battleship_lan::{
    coord_to_string, default_instance_name, init_logging, parse_command, render_fleet_status,
    render_own_board, render_placement, render_target_board, status_line, CliCommand, Discovery,
    GamePhase, MdnsDiscovery, NodeConfig, NodeHandle, NodeSnapshot, OfflineDiscovery, Orientation,
    PeerInfo, PlacementPlan, PlayerNode, SessionError, ShipConfig, DEFAULT_PORT, HELP,
};
#[cfg(feature = "std")]
use clap::Parser;
#[cfg(feature = "std")]
use rand::rngs::SmallRng;
#[cfg(feature = "std")]
use rand::SeedableRng;
#[cfg(feature = "std")]
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[cfg(feature = "std")]
struct Cli {
    /// Name advertised to other players on the network [default: Battleship-XXXX].
    #[arg(long)]
    name: Option<String>,
    #[arg(long, default_value = "0.0.0.0")]
    bind: IpAddr,
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, help = "Fix RNG seed for reproducible games (e.g., --seed 12345)")]
    seed: Option<u64>,
    /// Do not advertise or browse; connect by address only.
    #[arg(long)]
    no_discovery: bool,
    /// Dial this address right away instead of waiting.
    #[arg(long)]
    connect: Option<SocketAddr>,
}

#[cfg(feature = "std")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut rng = if let Some(s) = cli.seed {
        println!("Using fixed seed: {} (game will be reproducible)", s);
        SmallRng::seed_from_u64(s)
    } else {
        let mut seed_rng = rand::rng();
        SmallRng::from_rng(&mut seed_rng)
    };
    let node_rng = SmallRng::from_rng(&mut rng);

    let discovery: Box<dyn Discovery> = if cli.no_discovery {
        Box::new(OfflineDiscovery)
    } else {
        match MdnsDiscovery::new() {
            Ok(mdns) => Box::new(mdns),
            Err(e) => {
                eprintln!("Local network discovery unavailable ({}); connect by address.", e);
                Box::new(OfflineDiscovery)
            }
        }
    };

    let instance_name = cli
        .name
        .unwrap_or_else(|| default_instance_name(&mut rng));
    println!("Playing as {}", instance_name);
    let config = NodeConfig {
        instance_name,
        bind_addr: cli.bind,
        port: cli.port,
        ..NodeConfig::default()
    };
    let handle = PlayerNode::spawn(config, discovery, node_rng);
    if let Some(addr) = cli.connect {
        handle
            .connect_to_peer(PeerInfo::new(addr.to_string(), addr))
            .await?;
    }

    println!("{}", HELP);
    let mut updates = handle.subscribe();
    let mut app = App {
        last: updates.borrow_and_update().clone(),
        handle,
        plan: None,
        orientation: Orientation::Horizontal,
        rng,
    };
    app.print_changes(None);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    if !app.execute(&line).await {
                        break;
                    }
                }
                None => break,
            },
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                let previous = std::mem::replace(&mut app.last, snapshot);
                app.print_changes(Some(&*previous));
            }
        }
    }
    app.handle.shutdown().await;
    Ok(())
}

#[cfg(feature = "std")]
struct App {
    handle: NodeHandle,
    /// Local placement in progress; the session only sees the confirmed fleet.
    plan: Option<PlacementPlan>,
    /// Used by `place` and `preview` when no orientation is typed.
    orientation: Orientation,
    rng: SmallRng,
    last: Arc<NodeSnapshot>,
}

#[cfg(feature = "std")]
impl App {
    fn print_changes(&mut self, previous: Option<&NodeSnapshot>) {
        let now = self.last.clone();
        let link_changed = previous.map_or(true, |p| p.link.status != now.link.status);
        if link_changed && !now.link.status.is_empty() {
            println!("{}", now.link.status);
        }
        if previous.map_or(false, |p| p.link.peers != now.link.peers) {
            println!("{} player(s) nearby; type 'peers' to list them.", now.link.peers.len());
        }
        if previous.map_or(false, |p| p.game.last_message != now.game.last_message)
            && !now.game.last_message.is_empty()
        {
            println!("{}", now.game.last_message);
        }
        let phase_changed = previous.map_or(true, |p| p.game.phase != now.game.phase);
        let turn_changed = previous.map_or(true, |p| p.game.my_turn != now.game.my_turn);
        if phase_changed || turn_changed {
            println!("{}", status_line(&now.game));
        }
        if phase_changed {
            match now.game.phase {
                GamePhase::Placement => {
                    let plan = PlacementPlan::new(&now.game.settings);
                    print_plan(&plan, now.game.settings.grid_size);
                    self.plan = Some(plan);
                }
                GamePhase::Setup => self.plan = None,
                GamePhase::GameOver { .. } => {
                    print_boards(&now);
                    println!("Type 'reset' to play again.");
                }
                _ => {}
            }
        }
        if now.game.phase == GamePhase::Playing && now.game.my_turn && (turn_changed || phase_changed) {
            print_boards(&now);
        }
    }

    /// Run one command. Returns `false` when the player quits.
    async fn execute(&mut self, line: &str) -> bool {
        let cmd = match parse_command(line) {
            Ok(cmd) => cmd,
            Err(e) => {
                println!("{}", e);
                return true;
            }
        };
        let snapshot = self.handle.snapshot();
        let result = match cmd {
            CliCommand::Help => {
                println!("{}", HELP);
                Ok(())
            }
            CliCommand::Peers => {
                if snapshot.link.peers.is_empty() {
                    println!("No players found yet.");
                }
                for (i, peer) in snapshot.link.peers.iter().enumerate() {
                    println!("  {}: {} ({})", i, peer.name, peer.addr);
                }
                if let Some(port) = snapshot.link.local_port {
                    println!("Listening on port {}.", port);
                }
                Ok(())
            }
            CliCommand::ConnectIndex(i) => match snapshot.link.peers.get(i) {
                Some(peer) => self.handle.connect_to_peer(peer.clone()).await,
                None => {
                    println!("No peer number {}.", i);
                    Ok(())
                }
            },
            CliCommand::ConnectAddr(addr) => {
                self.handle
                    .connect_to_peer(PeerInfo::new(addr.to_string(), addr))
                    .await
            }
            CliCommand::Grid(size) => {
                let mut settings = snapshot.game.settings.clone();
                settings.grid_size = size;
                self.handle.update_settings(settings).await
            }
            CliCommand::Ship { name, size, count } => {
                let mut settings = snapshot.game.settings.clone();
                settings.ship_configs.retain(|c| c.name != name);
                if count > 0 {
                    settings.ship_configs.push(ShipConfig::new(&name, size, count));
                }
                self.handle.update_settings(settings).await
            }
            CliCommand::Settings => {
                let settings = &snapshot.game.settings;
                println!("Grid {}x{}", settings.grid_size, settings.grid_size);
                for c in &settings.ship_configs {
                    println!("  {:<12} size {} x{}", c.name, c.size, c.count);
                }
                Ok(())
            }
            CliCommand::Send => self.handle.send_settings().await,
            CliCommand::Start => self.handle.start_placement().await,
            CliCommand::Place(pos, orientation) => {
                let orientation = orientation.unwrap_or(self.orientation);
                self.with_plan(|plan, grid| {
                    plan.place(pos, orientation)?;
                    print_plan(plan, grid);
                    Ok(())
                })
            }
            CliCommand::Preview(pos, orientation) => {
                let orientation = orientation.unwrap_or(self.orientation);
                self.with_plan(|plan, grid| {
                    print!("{}", render_placement(plan, grid, &plan.preview(pos, orientation)));
                    if plan.can_place(pos, orientation) {
                        println!(
                            "Fits. 'place {} {}' to put it there.",
                            coord_to_string(pos),
                            orientation_letter(orientation)
                        );
                    } else {
                        println!("Does not fit at {}.", coord_to_string(pos));
                    }
                    Ok(())
                })
            }
            CliCommand::Rotate => {
                self.orientation = self.orientation.toggled();
                println!("Ships now go {:?}.", self.orientation);
                Ok(())
            }
            CliCommand::Undo => self.with_plan(|plan, grid| {
                if plan.undo().is_none() {
                    println!("Nothing to undo.");
                }
                print_plan(plan, grid);
                Ok(())
            }),
            CliCommand::Auto => {
                let rng = &mut self.rng;
                match self.plan.as_mut() {
                    Some(plan) => plan.auto_place(rng).map(|()| {
                        print_plan(plan, snapshot.game.settings.grid_size);
                    }),
                    None => Err(SessionError::WrongPhase),
                }
            }
            CliCommand::Confirm => match self.plan.clone() {
                Some(plan) => match plan.finish() {
                    Ok(ships) => {
                        let result = self.handle.confirm_placement(ships).await;
                        if result.is_ok() {
                            self.plan = None;
                        }
                        result
                    }
                    Err(e) => Err(e),
                },
                None => Err(SessionError::WrongPhase),
            },
            CliCommand::Board => {
                match &self.plan {
                    Some(plan) => print_plan(plan, snapshot.game.settings.grid_size),
                    None => print_boards(&snapshot),
                }
                Ok(())
            }
            CliCommand::Fire(pos) => {
                let result = self.handle.shoot(pos).await;
                if result.is_ok() {
                    println!("Firing at {}...", coord_to_string(pos));
                }
                result
            }
            CliCommand::Reset => {
                self.plan = None;
                self.handle.reset_game().await
            }
            CliCommand::Quit => return false,
        };
        if let Err(e) = result {
            println!("Error: {}", e);
        }
        true
    }

    fn with_plan(
        &mut self,
        f: impl FnOnce(&mut PlacementPlan, u32) -> Result<(), SessionError>,
    ) -> Result<(), SessionError> {
        let grid = self.last.game.settings.grid_size;
        match self.plan.as_mut() {
            Some(plan) => f(plan, grid),
            None => Err(SessionError::WrongPhase),
        }
    }
}

#[cfg(feature = "std")]
fn print_plan(plan: &PlacementPlan, grid_size: u32) {
    print!("{}", render_placement(plan, grid_size, &[]));
    match plan.current() {
        Some((name, size)) => println!(
            "Place {} (length {}), {} ship(s) to go: place <A1> [h|v], preview, rotate, or auto",
            name,
            size,
            plan.remaining().len()
        ),
        None => println!("All ships placed. Type 'confirm' to lock in, or 'undo'."),
    }
}

#[cfg(feature = "std")]
fn orientation_letter(orientation: Orientation) -> char {
    match orientation {
        Orientation::Horizontal => 'h',
        Orientation::Vertical => 'v',
    }
}

#[cfg(feature = "std")]
fn print_boards(snapshot: &NodeSnapshot) {
    println!("Opponent board:");
    print!("{}", render_target_board(&snapshot.game));
    print!("{}", render_fleet_status(&snapshot.game));
    println!("\nYour board:");
    print!("{}", render_own_board(&snapshot.game));
}
