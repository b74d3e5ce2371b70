use std::collections::BTreeSet;

use battleship_lan::{
    footprint, is_valid_placement, random_fleet, GameSettings, Orientation, PlacementPlan,
    Position, SessionError, ShipConfig,
};
use proptest::prelude::*;
use rand::{rngs::SmallRng, SeedableRng};

fn small_settings() -> GameSettings {
    GameSettings::new(
        6,
        vec![ShipConfig::new("Destroyer", 2, 1), ShipConfig::new("Submarine", 1, 1)],
    )
}

#[test]
fn footprint_extends_along_orientation() {
    let origin = Position::new(2, 3);
    assert_eq!(
        footprint(origin, 3, Orientation::Horizontal),
        vec![Position::new(2, 3), Position::new(2, 4), Position::new(2, 5)]
    );
    assert_eq!(
        footprint(origin, 2, Orientation::Vertical),
        vec![Position::new(2, 3), Position::new(3, 3)]
    );
}

#[test]
fn adjacent_ship_is_rejected() {
    let mut occupied = BTreeSet::new();
    occupied.extend(footprint(Position::new(0, 0), 2, Orientation::Horizontal));
    assert!(!is_valid_placement(Position::new(1, 0), 1, Orientation::Horizontal, 10, &occupied));
    assert!(!is_valid_placement(Position::new(1, 2), 1, Orientation::Horizontal, 10, &occupied));
    assert!(is_valid_placement(Position::new(2, 0), 1, Orientation::Horizontal, 10, &occupied));
    assert!(is_valid_placement(Position::new(0, 3), 1, Orientation::Horizontal, 10, &occupied));
}

#[test]
fn placement_must_stay_on_the_grid() {
    let empty = BTreeSet::new();
    assert!(!is_valid_placement(Position::new(0, 8), 3, Orientation::Horizontal, 10, &empty));
    assert!(!is_valid_placement(Position::new(-1, 0), 1, Orientation::Vertical, 10, &empty));
    assert!(is_valid_placement(Position::new(7, 9), 3, Orientation::Vertical, 10, &empty));
}

#[test]
fn overlapping_ship_is_rejected() {
    let mut occupied = BTreeSet::new();
    occupied.extend(footprint(Position::new(4, 2), 4, Orientation::Horizontal));
    assert!(!is_valid_placement(Position::new(2, 3), 4, Orientation::Vertical, 10, &occupied));
}

#[test]
fn plan_walks_the_catalog_in_order() {
    let mut plan = PlacementPlan::new(&small_settings());
    assert_eq!(plan.current(), Some(("Destroyer", 2)));
    plan.place(Position::new(0, 0), Orientation::Horizontal).unwrap();
    assert_eq!(plan.current(), Some(("Submarine", 1)));

    // Touches the destroyer diagonally.
    let err = plan.place(Position::new(1, 2), Orientation::Horizontal).unwrap_err();
    assert_eq!(err, SessionError::InvalidPlacement);
    assert_eq!(plan.placed().len(), 1);

    plan.place(Position::new(3, 3), Orientation::Vertical).unwrap();
    assert!(plan.is_complete());
    assert_eq!(plan.current(), None);
    let ships = plan.finish().unwrap();
    assert_eq!(ships.len(), 2);
}

#[test]
fn undo_frees_the_cells() {
    let mut plan = PlacementPlan::new(&small_settings());
    plan.place(Position::new(0, 0), Orientation::Horizontal).unwrap();
    let removed = plan.undo().unwrap();
    assert_eq!(removed.name(), "Destroyer");
    assert!(plan.occupied().is_empty());
    assert_eq!(plan.current(), Some(("Destroyer", 2)));
    assert!(plan.undo().is_none());
}

#[test]
fn unfinished_plan_cannot_finish() {
    let plan = PlacementPlan::new(&small_settings());
    assert_eq!(plan.finish().unwrap_err(), SessionError::PlacementIncomplete);
}

#[test]
fn auto_place_keeps_manual_ships() {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut plan = PlacementPlan::new(&GameSettings::default());
    plan.place(Position::new(9, 0), Orientation::Horizontal).unwrap();
    plan.auto_place(&mut rng).unwrap();
    let ships = plan.finish().unwrap();
    assert_eq!(ships[0].origin(), Position::new(9, 0));
    assert_eq!(ships.len(), GameSettings::default().total_ships());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn random_fleet_is_legal(seed in any::<u64>()) {
        let settings = GameSettings::default();
        let mut rng = SmallRng::seed_from_u64(seed);
        let ships = random_fleet(&settings, &mut rng).unwrap();
        prop_assert_eq!(ships.len(), settings.total_ships());

        let mut occupied = BTreeSet::new();
        for ship in &ships {
            prop_assert_eq!(ship.footprint().len(), ship.size() as usize);
            prop_assert!(is_valid_placement(
                ship.origin(),
                ship.size(),
                ship.orientation(),
                settings.grid_size,
                &occupied
            ));
            occupied.extend(ship.footprint().iter().copied());
        }
    }

    #[test]
    fn accepted_placement_never_touches(
        row in -2i32..12,
        col in -2i32..12,
        size in 1u32..6,
        vertical in any::<bool>(),
    ) {
        let mut occupied = BTreeSet::new();
        occupied.extend(footprint(Position::new(4, 4), 3, Orientation::Horizontal));
        let orientation = if vertical { Orientation::Vertical } else { Orientation::Horizontal };
        let origin = Position::new(row, col);
        if is_valid_placement(origin, size, orientation, 10, &occupied) {
            for cell in footprint(origin, size, orientation) {
                prop_assert!(cell.in_bounds(10));
                prop_assert!(occupied.iter().all(|o| *o != cell && !o.touches(&cell)));
            }
        }
    }
}
