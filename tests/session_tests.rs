use battleship_lan::{
    random_fleet, AttackMark, DefenseMark, FleetEntry, GameMessage, GamePhase, GameSettings,
    MessageKind, Orientation, PlacedShip, Position, Role, Session, SessionError, ShipConfig,
    ShotOutcome,
};
use rand::{rngs::SmallRng, SeedableRng};

fn session(role: Role, seed: u64) -> Session {
    let mut s = Session::new(SmallRng::seed_from_u64(seed));
    s.set_role(Some(role));
    s
}

fn small_settings() -> GameSettings {
    GameSettings::new(
        6,
        vec![ShipConfig::new("Destroyer", 2, 1), ShipConfig::new("Submarine", 1, 1)],
    )
}

fn small_fleet() -> Vec<PlacedShip> {
    vec![
        PlacedShip::new(0, "Destroyer", 2, Position::new(0, 0), Orientation::Horizontal),
        PlacedShip::new(1, "Submarine", 1, Position::new(4, 4), Orientation::Horizontal),
    ]
}

fn kinds(msgs: &[GameMessage]) -> Vec<MessageKind> {
    msgs.iter().map(|m| m.kind).collect()
}

/// Exchange queued messages until both sides are quiet.
fn settle(a: &mut Session, b: &mut Session) {
    loop {
        let from_a = a.take_outbound();
        let from_b = b.take_outbound();
        if from_a.is_empty() && from_b.is_empty() {
            break;
        }
        for msg in from_a {
            b.handle_message(msg);
        }
        for msg in from_b {
            a.handle_message(msg);
        }
    }
}

/// Host and guest agree on `settings`, place `small_fleet` and start playing.
fn playing_pair(seed: u64) -> (Session, Session) {
    let mut host = session(Role::Host, seed);
    let mut guest = session(Role::Guest, seed + 1000);
    host.update_settings(small_settings()).unwrap();
    host.send_settings().unwrap();
    settle(&mut host, &mut guest);
    host.start_placement().unwrap();
    guest.start_placement().unwrap();
    host.confirm_placement(small_fleet()).unwrap();
    guest.confirm_placement(small_fleet()).unwrap();
    settle(&mut host, &mut guest);
    assert_eq!(host.phase(), GamePhase::Playing);
    assert_eq!(guest.phase(), GamePhase::Playing);
    (host, guest)
}

#[test]
fn guest_adopts_host_settings() {
    let mut host = session(Role::Host, 1);
    let mut guest = session(Role::Guest, 2);
    host.update_settings(GameSettings::new(8, vec![ShipConfig::new("Battleship", 4, 1)]))
        .unwrap();
    host.send_settings().unwrap();
    let sent = host.take_outbound();
    assert_eq!(kinds(&sent), vec![MessageKind::Settings]);

    for msg in sent {
        guest.handle_message(msg);
    }
    assert_eq!(guest.settings().grid_size, 8);
    assert_eq!(guest.enemy_fleet(), &[FleetEntry::new(0, "Battleship".to_string(), 4)]);
    assert_eq!(guest.enemy_fleet()[0].hit_count(), 0);
    assert_eq!(kinds(&guest.take_outbound()), vec![MessageKind::SettingsAck]);
}

#[test]
fn invalid_settings_from_peer_are_ignored() {
    let mut guest = session(Role::Guest, 2);
    let mut bad = GameSettings::default();
    bad.grid_size = 40;
    guest.handle_message(GameMessage::settings(bad));
    assert_eq!(guest.settings(), &GameSettings::default());
    assert!(guest.take_outbound().is_empty());
}

#[test]
fn first_turn_for_host_leaves_guest_waiting() {
    let mut guest = session(Role::Guest, 3);
    guest.start_placement().unwrap();
    let mut rng = SmallRng::seed_from_u64(3);
    let fleet = random_fleet(guest.settings(), &mut rng).unwrap();
    guest.confirm_placement(fleet).unwrap();
    assert_eq!(kinds(&guest.take_outbound()), vec![MessageKind::PlacementReady]);
    assert_eq!(guest.phase(), GamePhase::WaitingForOpponent);

    guest.handle_message(GameMessage::first_turn(true));
    assert_eq!(guest.phase(), GamePhase::Playing);
    assert!(!guest.is_my_turn());
}

#[test]
fn first_turn_for_guest_gives_it_the_turn() {
    let mut guest = session(Role::Guest, 3);
    guest.update_settings(small_settings()).unwrap();
    guest.start_placement().unwrap();
    guest.confirm_placement(small_fleet()).unwrap();
    guest.handle_message(GameMessage::first_turn(false));
    assert!(guest.is_my_turn());
}

#[test]
fn first_turn_outside_waiting_is_ignored() {
    let mut guest = session(Role::Guest, 3);
    guest.handle_message(GameMessage::first_turn(false));
    assert_eq!(guest.phase(), GamePhase::Setup);
    assert!(!guest.is_my_turn());
}

#[test]
fn early_ready_is_remembered_by_host() {
    let mut host = session(Role::Host, 4);
    host.update_settings(small_settings()).unwrap();
    host.start_placement().unwrap();
    host.handle_message(GameMessage::placement_ready());
    assert_eq!(host.phase(), GamePhase::Placement);

    host.confirm_placement(small_fleet()).unwrap();
    assert_eq!(host.phase(), GamePhase::Playing);
    assert_eq!(
        kinds(&host.take_outbound()),
        vec![MessageKind::PlacementReady, MessageKind::FirstTurn]
    );
}

#[test]
fn host_starts_play_when_guest_becomes_ready() {
    let mut host = session(Role::Host, 5);
    host.update_settings(small_settings()).unwrap();
    host.start_placement().unwrap();
    host.confirm_placement(small_fleet()).unwrap();
    host.take_outbound();
    assert_eq!(host.phase(), GamePhase::WaitingForOpponent);

    host.handle_message(GameMessage::placement_ready());
    assert_eq!(host.phase(), GamePhase::Playing);
    let sent = host.take_outbound();
    assert_eq!(kinds(&sent), vec![MessageKind::FirstTurn]);
    assert_eq!(sent[0].host_goes_first, Some(host.is_my_turn()));
}

#[test]
fn coin_flip_can_go_either_way() {
    let mut host_first = 0;
    let mut guest_first = 0;
    for seed in 0..64 {
        let (host, guest) = playing_pair(seed);
        assert_ne!(host.is_my_turn(), guest.is_my_turn());
        if host.is_my_turn() {
            host_first += 1;
        } else {
            guest_first += 1;
        }
    }
    assert!(host_first > 0);
    assert!(guest_first > 0);
}

#[test]
fn hit_keeps_the_turn_and_miss_passes_it() {
    let (mut host, mut guest) = playing_pair(11);
    let (shooter, target) = if host.is_my_turn() {
        (&mut host, &mut guest)
    } else {
        (&mut guest, &mut host)
    };

    shooter.shoot(Position::new(0, 0)).unwrap();
    assert!(!shooter.is_my_turn());
    settle(shooter, target);
    assert_eq!(shooter.my_shots().get(&Position::new(0, 0)), Some(&AttackMark::Hit));
    assert_eq!(target.enemy_shots_on_me().get(&Position::new(0, 0)), Some(&DefenseMark::Hit));
    assert!(shooter.is_my_turn());
    assert!(!target.is_my_turn());

    shooter.shoot(Position::new(3, 3)).unwrap();
    settle(shooter, target);
    assert_eq!(shooter.my_shots().get(&Position::new(3, 3)), Some(&AttackMark::Miss));
    assert!(!shooter.is_my_turn());
    assert!(target.is_my_turn());
}

#[test]
fn sinking_marks_the_whole_ship() {
    let (mut host, mut guest) = playing_pair(12);
    let (shooter, target) = if host.is_my_turn() {
        (&mut host, &mut guest)
    } else {
        (&mut guest, &mut host)
    };
    shooter.shoot(Position::new(0, 1)).unwrap();
    settle(shooter, target);
    shooter.shoot(Position::new(0, 0)).unwrap();
    settle(shooter, target);

    assert_eq!(shooter.my_shots().get(&Position::new(0, 0)), Some(&AttackMark::Sunk));
    assert_eq!(shooter.my_shots().get(&Position::new(0, 1)), Some(&AttackMark::Sunk));
    let destroyer = &shooter.enemy_fleet()[0];
    assert!(destroyer.is_sunk());
    assert_eq!(destroyer.hit_count(), 2);
    assert!(!shooter.enemy_fleet()[1].is_sunk());
    assert!(shooter.is_my_turn());
}

#[test]
fn rejected_actions_send_nothing() {
    let mut host = session(Role::Host, 6);
    assert_eq!(host.shoot(Position::new(0, 0)), Err(SessionError::WrongPhase));
    assert_eq!(host.confirm_placement(small_fleet()), Err(SessionError::WrongPhase));
    assert!(host.take_outbound().is_empty());

    let mut guest = session(Role::Guest, 6);
    assert_eq!(guest.send_settings(), Err(SessionError::NotHost));
    let mut alone = Session::new(SmallRng::seed_from_u64(6));
    assert_eq!(alone.send_settings(), Err(SessionError::NotConnected));

    let mut bad = small_settings();
    bad.ship_configs.clear();
    assert!(matches!(host.update_settings(bad), Err(SessionError::InvalidSettings(_))));
    assert!(guest.take_outbound().is_empty());
    assert!(alone.take_outbound().is_empty());
}

#[test]
fn illegal_shots_are_rejected() {
    let (mut host, mut guest) = playing_pair(13);
    let (shooter, waiting) = if host.is_my_turn() {
        (&mut host, &mut guest)
    } else {
        (&mut guest, &mut host)
    };
    assert_eq!(waiting.shoot(Position::new(2, 2)), Err(SessionError::NotYourTurn));
    assert_eq!(shooter.shoot(Position::new(6, 0)), Err(SessionError::OutOfBounds));
    assert_eq!(shooter.shoot(Position::new(-1, 0)), Err(SessionError::OutOfBounds));
    assert!(shooter.take_outbound().is_empty());
    assert!(waiting.take_outbound().is_empty());

    shooter.shoot(Position::new(0, 0)).unwrap();
    settle(shooter, waiting);
    assert_eq!(shooter.shoot(Position::new(0, 0)), Err(SessionError::AlreadyTargeted));
}

#[test]
fn confirm_checks_the_fleet() {
    let mut host = session(Role::Host, 7);
    host.update_settings(small_settings()).unwrap();
    host.start_placement().unwrap();

    let missing = vec![small_fleet().remove(0)];
    assert_eq!(host.confirm_placement(missing), Err(SessionError::FleetMismatch));

    let touching = vec![
        PlacedShip::new(0, "Destroyer", 2, Position::new(0, 0), Orientation::Horizontal),
        PlacedShip::new(1, "Submarine", 1, Position::new(1, 0), Orientation::Horizontal),
    ];
    assert_eq!(host.confirm_placement(touching), Err(SessionError::InvalidPlacement));
    assert_eq!(host.phase(), GamePhase::Placement);
    assert!(host.take_outbound().is_empty());
}

#[test]
fn unexpected_shot_result_is_ignored() {
    let (mut host, mut guest) = playing_pair(14);
    let shooter = if host.is_my_turn() { &mut host } else { &mut guest };
    shooter.shoot(Position::new(5, 5)).unwrap();
    shooter.take_outbound();
    shooter.handle_message(GameMessage::shot_result(Position::new(1, 1), ShotOutcome::Hit, None));
    assert!(shooter.my_shots().is_empty());
    assert!(!shooter.is_my_turn());
}

#[test]
fn full_game_ends_with_one_winner() {
    let (mut host, mut guest) = playing_pair(21);
    let grid = host.settings().grid_size as i32;
    for _ in 0..200 {
        if matches!(host.phase(), GamePhase::GameOver { .. }) {
            break;
        }
        assert!(host.is_my_turn() != guest.is_my_turn());
        let (shooter, target) = if host.is_my_turn() {
            (&mut host, &mut guest)
        } else {
            (&mut guest, &mut host)
        };
        let next = (0..grid * grid)
            .map(|i| Position::new(i / grid, i % grid))
            .find(|p| !shooter.my_shots().contains_key(p))
            .unwrap();
        shooter.shoot(next).unwrap();
        settle(shooter, target);
    }

    let outcome = (host.phase(), guest.phase());
    assert!(
        outcome == (GamePhase::GameOver { won: true }, GamePhase::GameOver { won: false })
            || outcome == (GamePhase::GameOver { won: false }, GamePhase::GameOver { won: true })
    );
    assert!(!host.is_my_turn());
    assert!(!guest.is_my_turn());
}

#[test]
fn reset_returns_to_setup() {
    let (mut host, _guest) = playing_pair(15);
    host.reset();
    assert_eq!(host.phase(), GamePhase::Setup);
    assert_eq!(host.role(), None);
    assert_eq!(host.settings(), &GameSettings::default());
    assert!(host.my_ships().is_empty());
    assert!(host.enemy_fleet().is_empty());
}

#[test]
fn stale_messages_after_reset_change_nothing() {
    let (mut host, _guest) = playing_pair(16);
    host.reset();
    let before = host.view();

    // Traffic the old opponent still had in flight.
    host.handle_message(GameMessage::shot(Position::new(0, 0)));
    host.handle_message(GameMessage::shot_result(Position::new(0, 0), ShotOutcome::Hit, None));
    host.handle_message(GameMessage::placement_ready());
    host.handle_message(GameMessage::first_turn(true));

    assert_eq!(host.phase(), GamePhase::Setup);
    assert!(host.take_outbound().is_empty());
    assert!(host.enemy_shots_on_me().is_empty());
    assert!(host.my_shots().is_empty());
    assert_eq!(host.view(), before);
}
