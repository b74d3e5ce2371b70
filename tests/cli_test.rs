#[cfg(feature = "std")]
#[cfg(test)]
mod cli_tests {
    use battleship_lan::{
        coord_to_string, default_instance_name, parse_command, parse_coord, render_own_board, render_placement,
        render_target_board, status_line, CliCommand, GameSettings, Orientation, PlacementPlan,
        Position, Role, Session,
    };
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn coordinates_round_trip_through_text() {
        assert_eq!(parse_coord("A1"), Some(Position::new(0, 0)));
        assert_eq!(parse_coord("c10"), Some(Position::new(9, 2)));
        assert_eq!(coord_to_string(Position::new(9, 2)), "C10");
        assert_eq!(parse_coord("A0"), None);
        assert_eq!(parse_coord("1A"), None);
        assert_eq!(parse_coord("B"), None);
    }

    #[test]
    fn commands_parse() {
        assert_eq!(parse_command("fire B7"), Ok(CliCommand::Fire(Position::new(6, 1))));
        assert_eq!(
            parse_command("place a1 v"),
            Ok(CliCommand::Place(Position::new(0, 0), Some(Orientation::Vertical)))
        );
        assert_eq!(parse_command("place a1"), Ok(CliCommand::Place(Position::new(0, 0), None)));
        assert_eq!(
            parse_command("preview C3 h"),
            Ok(CliCommand::Preview(Position::new(2, 2), Some(Orientation::Horizontal)))
        );
        assert_eq!(parse_command("rotate"), Ok(CliCommand::Rotate));
        assert_eq!(parse_command("connect 2"), Ok(CliCommand::ConnectIndex(2)));
        assert_eq!(
            parse_command("connect 10.0.0.5:47832"),
            Ok(CliCommand::ConnectAddr("10.0.0.5:47832".parse().unwrap()))
        );
        assert_eq!(
            parse_command("ship Frigate 3 2"),
            Ok(CliCommand::Ship {
                name: "Frigate".to_string(),
                size: 3,
                count: 2
            })
        );
        assert_eq!(parse_command("GRID 12"), Ok(CliCommand::Grid(12)));
        assert_eq!(parse_command("quit"), Ok(CliCommand::Quit));
    }

    #[test]
    fn bad_commands_explain_themselves() {
        assert!(parse_command("fire").unwrap_err().contains("usage"));
        assert!(parse_command("place A1 x").unwrap_err().contains("orientation"));
        assert!(parse_command("preview").unwrap_err().contains("usage: preview"));
        assert!(parse_command("grid big").unwrap_err().contains("invalid grid size"));
        assert!(parse_command("dance").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn placement_board_shows_ships() {
        let settings = GameSettings::default();
        let mut plan = PlacementPlan::new(&settings);
        plan.place(Position::new(0, 0), Orientation::Horizontal).unwrap();
        let text = render_placement(&plan, settings.grid_size, &[]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0].trim(), "A B C D E F G H I J");
        assert_eq!(lines[1], " 1  S S S S S . . . . .");
    }

    #[test]
    fn preview_marks_the_next_ship() {
        let settings = GameSettings::default();
        let mut plan = PlacementPlan::new(&settings);
        assert_eq!(plan.remaining().len(), 9);
        plan.place(Position::new(0, 0), Orientation::Horizontal).unwrap();
        assert_eq!(plan.remaining().len(), 8);
        assert_eq!(plan.current(), Some(("Battleship", 4)));

        let down = Orientation::Horizontal.toggled();
        assert_eq!(down, Orientation::Vertical);
        let cells = plan.preview(Position::new(2, 9), down);
        assert_eq!(cells.len(), 4);
        assert!(plan.can_place(Position::new(2, 9), down));
        // Touching the carrier diagonally is not allowed.
        assert!(!plan.can_place(Position::new(1, 5), down));
        assert!(!plan.can_place(Position::new(0, 7), Orientation::Horizontal));

        let text = render_placement(&plan, settings.grid_size, &cells);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], " 1  S S S S S . . . . .");
        assert_eq!(lines[3], " 3  . . . . . . . . . +");
        assert_eq!(lines[6], " 6  . . . . . . . . . +");
        assert_eq!(lines[7], " 7  . . . . . . . . . .");
    }

    #[test]
    fn fresh_session_renders_empty_boards() {
        let mut session = Session::new(SmallRng::seed_from_u64(1));
        let view = session.view();
        assert!(render_target_board(&view).lines().skip(1).all(|l| !l.contains('X')));
        assert!(render_own_board(&view).lines().skip(1).all(|l| !l.contains('S')));
        assert_eq!(status_line(&view), "[not connected] setup");

        session.set_role(Some(Role::Host));
        assert_eq!(status_line(&session.view()), "[host] setup");
    }

    #[test]
    fn default_names_carry_a_random_suffix() {
        let a = default_instance_name(&mut SmallRng::seed_from_u64(1));
        let b = default_instance_name(&mut SmallRng::seed_from_u64(2));
        assert!(a.starts_with("Battleship-"));
        assert_eq!(a.len(), "Battleship-".len() + 4);
        assert_ne!(a, b);
    }
}
