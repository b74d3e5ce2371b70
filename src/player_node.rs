#![cfg(feature = "std")]

//! Session driver: one task owning the game session and the network link.
//!
//! `PlayerNode` listens for an inbound connection, advertises and browses for peers,
//! and dials a peer on request. The first connection to complete becomes the session
//! link and decides the role: accepted means host, dialed means guest. Commands from
//! [`NodeHandle`], connection events, discovery events and inbound messages are all
//! handled in the same `select!` loop, so the session never sees two of them at once.
//! After every step an immutable [`NodeSnapshot`] is published.

use std::future::{pending, Future};
use std::net::SocketAddr;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;

use rand::rngs::SmallRng;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot, watch};

use crate::common::{Position, SessionError};
use crate::config::NodeConfig;
use crate::discovery::{Discovery, DiscoveryEvent, PeerInfo};
use crate::game::{GameView, Role, Session};
use crate::protocol::GameMessage;
use crate::ship::{GameSettings, PlacedShip};
use crate::transport::Channel;

/// State of the network link as shown to the player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkView {
    /// Human-readable connection status.
    pub status: String,
    pub connected: bool,
    /// Peers currently advertising the service.
    pub peers: Vec<PeerInfo>,
    /// Port the node is listening on, if it is.
    pub local_port: Option<u16>,
}

/// Everything the presentation layer observes, published after each change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub game: GameView,
    pub link: LinkView,
}

enum Action {
    UpdateSettings(GameSettings),
    SendSettings,
    ConnectToPeer(PeerInfo),
    StartPlacement,
    ConfirmPlacement(Vec<PlacedShip>),
    Shoot(Position),
    Reset,
    Shutdown,
}

struct Command {
    action: Action,
    reply: oneshot::Sender<Result<(), SessionError>>,
}

type Dial = Pin<Box<dyn Future<Output = (PeerInfo, anyhow::Result<TcpStream>)> + Send>>;

enum Step {
    Command(Command),
    Accepted(std::io::Result<(TcpStream, SocketAddr)>),
    Dialed(PeerInfo, anyhow::Result<TcpStream>),
    Discovery(Option<DiscoveryEvent>),
    Inbound(Option<GameMessage>),
    Stop,
}

/// Cloneable API to a running [`PlayerNode`].
#[derive(Clone)]
pub struct NodeHandle {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Arc<NodeSnapshot>>,
}

impl NodeHandle {
    /// Receiver notified with a fresh snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<NodeSnapshot>> {
        self.snapshots.clone()
    }

    /// The most recent snapshot.
    pub fn snapshot(&self) -> Arc<NodeSnapshot> {
        self.snapshots.borrow().clone()
    }

    pub async fn update_settings(&self, settings: GameSettings) -> Result<(), SessionError> {
        self.request(Action::UpdateSettings(settings)).await
    }

    pub async fn send_settings(&self) -> Result<(), SessionError> {
        self.request(Action::SendSettings).await
    }

    /// Start dialing `peer`. The outcome shows up in the link status.
    pub async fn connect_to_peer(&self, peer: PeerInfo) -> Result<(), SessionError> {
        self.request(Action::ConnectToPeer(peer)).await
    }

    pub async fn start_placement(&self) -> Result<(), SessionError> {
        self.request(Action::StartPlacement).await
    }

    pub async fn confirm_placement(&self, ships: Vec<PlacedShip>) -> Result<(), SessionError> {
        self.request(Action::ConfirmPlacement(ships)).await
    }

    pub async fn shoot(&self, pos: Position) -> Result<(), SessionError> {
        self.request(Action::Shoot(pos)).await
    }

    /// Drop the connection, clear the game and start searching again.
    pub async fn reset_game(&self) -> Result<(), SessionError> {
        self.request(Action::Reset).await
    }

    /// Stop the node, closing the connection and withdrawing the advertisement.
    pub async fn shutdown(&self) {
        let _ = self.request(Action::Shutdown).await;
    }

    async fn request(&self, action: Action) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command { action, reply })
            .map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)?
    }
}

pub struct PlayerNode {
    config: NodeConfig,
    session: Session,
    discovery: Box<dyn Discovery>,
    discovery_events: Option<mpsc::UnboundedReceiver<DiscoveryEvent>>,
    listener: Option<TcpListener>,
    dialing: Option<Dial>,
    channel: Option<Channel>,
    link: LinkView,
    commands: mpsc::UnboundedReceiver<Command>,
    snapshots: watch::Sender<Arc<NodeSnapshot>>,
}

impl PlayerNode {
    /// Spawn the node on the current tokio runtime and return its handle.
    pub fn spawn(config: NodeConfig, discovery: Box<dyn Discovery>, rng: SmallRng) -> NodeHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let session = Session::new(rng);
        let link = LinkView::default();
        let (snap_tx, snap_rx) = watch::channel(Arc::new(NodeSnapshot {
            game: session.view(),
            link: link.clone(),
        }));
        let node = PlayerNode {
            config,
            session,
            discovery,
            discovery_events: None,
            listener: None,
            dialing: None,
            channel: None,
            link,
            commands: cmd_rx,
            snapshots: snap_tx,
        };
        tokio::spawn(node.run());
        NodeHandle {
            commands: cmd_tx,
            snapshots: snap_rx,
        }
    }

    async fn run(mut self) {
        self.start_searching().await;
        self.publish();
        loop {
            let step = tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => Step::Command(cmd),
                    None => Step::Stop,
                },
                accepted = accept_next(&self.listener) => Step::Accepted(accepted),
                (peer, dialed) = next_dial(&mut self.dialing) => Step::Dialed(peer, dialed),
                event = next_discovery(&mut self.discovery_events) => Step::Discovery(event),
                inbound = next_inbound(&mut self.channel) => Step::Inbound(inbound),
            };
            match step {
                Step::Command(Command { action, reply }) => {
                    let (result, flow) = self.apply(action).await;
                    if let Err(e) = &result {
                        log::debug!("action rejected: {}", e);
                    }
                    self.flush_outbound();
                    self.publish();
                    let _ = reply.send(result);
                    if flow.is_break() {
                        break;
                    }
                    continue;
                }
                Step::Accepted(Ok((stream, addr))) => {
                    self.listener = None;
                    self.establish(stream, Role::Host, addr.to_string()).await;
                }
                Step::Accepted(Err(e)) => {
                    log::warn!("accept failed, no longer listening: {}", e);
                    self.listener = None;
                    self.link.local_port = None;
                    self.link.status = format!("Not accepting connections: {}", e);
                }
                Step::Dialed(peer, Ok(stream)) => {
                    self.dialing = None;
                    if self.channel.is_some() {
                        log::info!("already connected, dropping connection to {}", peer.name);
                    } else {
                        self.establish(stream, Role::Guest, peer.name).await;
                    }
                }
                Step::Dialed(peer, Err(e)) => {
                    self.dialing = None;
                    log::warn!("connection to {} failed: {}", peer.name, e);
                    self.link.status = format!("Connection to {} failed: {}", peer.name, e);
                }
                Step::Discovery(Some(event)) => self.apply_discovery(event),
                Step::Discovery(None) => self.discovery_events = None,
                Step::Inbound(Some(msg)) => {
                    log::debug!("received {:?}", msg.kind);
                    self.session.handle_message(msg);
                }
                Step::Inbound(None) => self.connection_lost(),
                Step::Stop => break,
            }
            self.flush_outbound();
            self.publish();
        }
        self.teardown().await;
        log::info!("player node stopped");
    }

    async fn apply(&mut self, action: Action) -> (Result<(), SessionError>, ControlFlow<()>) {
        let result = match action {
            Action::UpdateSettings(settings) => self.session.update_settings(settings),
            Action::SendSettings => self.session.send_settings(),
            Action::ConnectToPeer(peer) => self.connect_to(peer),
            Action::StartPlacement => self.session.start_placement(),
            Action::ConfirmPlacement(ships) => self.session.confirm_placement(ships),
            Action::Shoot(pos) => self.session.shoot(pos),
            Action::Reset => {
                self.reset().await;
                Ok(())
            }
            Action::Shutdown => {
                self.teardown().await;
                return (Ok(()), ControlFlow::Break(()));
            }
        };
        (result, ControlFlow::Continue(()))
    }

    /// Listen for a guest and, if available, advertise and browse.
    async fn start_searching(&mut self) {
        let addr = SocketAddr::new(self.config.bind_addr, self.config.port);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                self.link.local_port = listener.local_addr().ok().map(|a| a.port());
                self.listener = Some(listener);
                log::info!("listening on {}", addr);
            }
            Err(e) => {
                log::warn!("cannot listen on {}: {} (connect-only mode)", addr, e);
                self.link.local_port = None;
            }
        }

        if let Some(port) = self.link.local_port {
            if let Err(e) = self.discovery.advertise(&self.config.instance_name, port).await {
                log::warn!("not advertising: {}", e);
            }
        }
        let (tx, rx) = mpsc::unbounded_channel();
        match self.discovery.browse(tx).await {
            Ok(()) => self.discovery_events = Some(rx),
            Err(e) => log::warn!("not browsing for peers: {}", e),
        }
        self.link.status = "Searching for nearby players...".to_string();
    }

    fn connect_to(&mut self, peer: PeerInfo) -> Result<(), SessionError> {
        if self.channel.is_some() {
            return Err(SessionError::AlreadyConnected);
        }
        log::info!("dialing {} at {}", peer.name, peer.addr);
        self.link.status = format!("Connecting to {}...", peer.name);
        let limit = self.config.connect_timeout;
        self.dialing = Some(Box::pin(async move {
            let result = match tokio::time::timeout(limit, TcpStream::connect(peer.addr)).await {
                Ok(Ok(stream)) => Ok(stream),
                Ok(Err(e)) => Err(anyhow::anyhow!("Connect error: {}", e)),
                Err(_) => Err(anyhow::anyhow!("Connect timeout after {:?}", limit)),
            };
            (peer, result)
        }));
        Ok(())
    }

    /// Adopt `stream` as the session link and stand down everything else.
    async fn establish(&mut self, stream: TcpStream, role: Role, peer: String) {
        self.listener = None;
        self.dialing = None;
        self.stop_discovery().await;
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("set_nodelay failed: {}", e);
        }
        self.channel = Some(Channel::spawn(stream, self.config.write_timeout));
        self.session.set_role(Some(role));
        self.link.connected = true;
        self.link.local_port = None;
        let label = match role {
            Role::Host => "host",
            Role::Guest => "guest",
        };
        log::info!("connected to {} as {}", peer, label);
        self.link.status = format!("Connected to {} as {}", peer, label);
    }

    fn connection_lost(&mut self) {
        log::info!("connection lost");
        self.channel = None;
        self.session.set_role(None);
        self.link.connected = false;
        self.link.status = "Disconnected. Reset to search for players again.".to_string();
    }

    fn apply_discovery(&mut self, event: DiscoveryEvent) {
        match event {
            DiscoveryEvent::Resolved(peer) => {
                if let Some(known) = self.link.peers.iter_mut().find(|p| p.name == peer.name) {
                    *known = peer;
                } else {
                    self.link.peers.push(peer);
                }
            }
            DiscoveryEvent::Lost(name) => self.link.peers.retain(|p| p.name != name),
        }
    }

    async fn stop_discovery(&mut self) {
        self.discovery.stop().await;
        self.discovery_events = None;
        self.link.peers.clear();
    }

    async fn reset(&mut self) {
        log::info!("resetting session");
        self.teardown().await;
        self.session.reset();
        self.link = LinkView::default();
        self.start_searching().await;
    }

    async fn teardown(&mut self) {
        self.channel = None;
        self.listener = None;
        self.dialing = None;
        self.stop_discovery().await;
    }

    fn flush_outbound(&mut self) {
        for msg in self.session.take_outbound() {
            match &self.channel {
                Some(channel) => channel.send(msg),
                None => log::debug!("no connection, dropping {:?}", msg.kind),
            }
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(Arc::new(NodeSnapshot {
            game: self.session.view(),
            link: self.link.clone(),
        }));
    }
}

async fn accept_next(listener: &Option<TcpListener>) -> std::io::Result<(TcpStream, SocketAddr)> {
    match listener {
        Some(listener) => listener.accept().await,
        None => pending().await,
    }
}

async fn next_dial(dialing: &mut Option<Dial>) -> (PeerInfo, anyhow::Result<TcpStream>) {
    match dialing {
        Some(dial) => dial.await,
        None => pending().await,
    }
}

async fn next_discovery(
    events: &mut Option<mpsc::UnboundedReceiver<DiscoveryEvent>>,
) -> Option<DiscoveryEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

async fn next_inbound(channel: &mut Option<Channel>) -> Option<GameMessage> {
    match channel {
        Some(channel) => channel.recv().await,
        None => pending().await,
    }
}
