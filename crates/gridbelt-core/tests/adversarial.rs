//! Adversarial tests: malformed input, hostile drawing sequences, and
//! commands issued in the wrong state. The engine must reject or no-op,
//! never panic or corrupt state.

use gridbelt_core::authoring::DraftError;
use gridbelt_core::deletion::DeleteMode;
use gridbelt_core::engine::{Engine, EngineError};
use gridbelt_core::geometry::{GridPoint, Rotation};
use gridbelt_core::test_utils::{TEST_GRID, standard_world};

fn p(x: i32, y: i32) -> GridPoint {
    GridPoint::new(x, y)
}

fn engine_and_ids() -> (Engine, gridbelt_core::test_utils::StandardWorld) {
    let world = standard_world();
    let ids = standard_world();
    (Engine::new(world.registry, TEST_GRID), ids)
}

#[test]
fn wildly_out_of_bounds_points_never_panic() {
    let (mut engine, _ids) = engine_and_ids();

    assert!(matches!(
        engine.start_belt_drag(p(i32::MIN, i32::MAX)),
        Err(EngineError::Draft(DraftError::StartOutsideGrid))
    ));
    assert!(engine.delete_at_cell(p(-1000, 1000), DeleteMode::Cell).is_err());
    assert!(engine.delete_at_cell(p(i32::MAX, 0), DeleteMode::Line).is_err());
    assert_eq!(engine.graph().segment_count(), 0);
}

#[test]
fn zigzag_drag_with_repeated_backtracks_stays_consistent() {
    let (mut engine, _ids) = engine_and_ids();
    engine.start_belt_drag(p(5, 5)).unwrap();

    // Thrash back and forth; undo-by-retrace must keep the overlay coherent.
    for _ in 0..10 {
        engine.extend_belt_drag(p(9, 5));
        engine.extend_belt_drag(p(5, 5));
    }
    engine.extend_belt_drag(p(9, 5));
    let report = engine.finish_belt_drag();
    assert_eq!(report.segments_added, 4);
    assert_eq!(report.cells_added, 5);
    assert_eq!(engine.graph().segment_count(), 4);

    // The committed run is a clean straight line.
    for x in 5..9 {
        assert!(engine.graph().contains_edge(p(x, 5), p(x + 1, 5)));
    }
}

#[test]
fn closed_loop_commits_as_passive_cycle() {
    let (mut engine, _ids) = engine_and_ids();
    engine.start_belt_drag(p(5, 5)).unwrap();
    // A rectangle back to the start: east, south, west, north. Every node
    // stays single-in/single-out, so the loop is legal passive topology.
    engine.extend_belt_drag(p(8, 5));
    engine.extend_belt_drag(p(8, 7));
    engine.extend_belt_drag(p(5, 7));
    let outcome = engine.extend_belt_drag(p(5, 5));
    assert_eq!(outcome.rejected, None);

    // Continuing over the loop's own first segment is a retrace.
    let outcome = engine.extend_belt_drag(p(8, 5));
    assert_eq!(outcome.rejected, Some(DraftError::RetraceExisting));

    let report = engine.finish_belt_drag();
    assert_eq!(report.segments_added, 10);
    // No ports anywhere: a cycle yields no route, and route following
    // terminates on the revisit guard rather than spinning.
    assert!(engine.routes().is_empty());
}

#[test]
fn repeated_start_replaces_previous_draft() {
    let (mut engine, _ids) = engine_and_ids();
    engine.start_belt_drag(p(1, 1)).unwrap();
    engine.extend_belt_drag(p(4, 1));
    // Starting again abandons the first draft entirely.
    engine.start_belt_drag(p(10, 10)).unwrap();
    let report = engine.finish_belt_drag();
    assert_eq!(report.segments_added, 0);
    assert_eq!(engine.graph().segment_count(), 0);
}

#[test]
fn deleting_the_same_cell_twice_reports_nothing_to_delete() {
    let (mut engine, _ids) = engine_and_ids();
    engine.start_belt_drag(p(1, 1)).unwrap();
    engine.extend_belt_drag(p(4, 1));
    engine.finish_belt_drag();

    assert!(engine.delete_at_cell(p(2, 1), DeleteMode::Cell).is_ok());
    let err = engine.delete_at_cell(p(2, 1), DeleteMode::Cell).unwrap_err();
    assert_eq!(err.to_string(), "nothing to delete");
}

#[test]
fn drawing_across_machine_bodies_rejected_from_every_side() {
    let (mut engine, ids) = engine_and_ids();
    // A 2x2 smelter: only its in port (top-left, entered southward) admits
    // a belt.
    engine
        .place_machine(ids.smelter, p(10, 10), Rotation::None)
        .unwrap();

    for (start, target) in [
        (p(8, 11), p(13, 11)),  // west -> east through the body
        (p(11, 13), p(11, 8)),  // south -> north through the body
        (p(13, 10), p(8, 10)),  // east -> west through the in-port row
    ] {
        engine.start_belt_drag(start).unwrap();
        let outcome = engine.extend_belt_drag(target);
        assert_eq!(
            outcome.rejected,
            Some(DraftError::PathEntersBody),
            "from {start:?} toward {target:?}"
        );
        engine.cancel_belt_draw();
    }

    // The one legal entry: from the north, moving south, into the in port.
    engine.start_belt_drag(p(10, 8)).unwrap();
    let outcome = engine.extend_belt_drag(p(10, 10));
    assert_eq!(outcome.rejected, None);
    engine.cancel_belt_draw();
}

#[test]
fn machine_commands_with_garbage_geometry_never_panic() {
    let (mut engine, ids) = engine_and_ids();
    // Off-grid placement is kept, flagged, and harmless.
    let id = engine
        .place_machine(ids.miner, p(-5, -5), Rotation::None)
        .unwrap();
    let snapshot = engine.snapshot_machine(id).unwrap();
    assert_eq!(
        snapshot.placement,
        gridbelt_core::machine::PlacementState::OutOfBounds
    );

    engine.move_machine(id, p(1_000_000, 1_000_000)).unwrap();
    engine.rotate_machine(id, Rotation::Cw270).unwrap();
    engine.start_simulation();
    engine.step_tick().unwrap();
    engine.stop_simulation();
    engine.remove_machine(id).unwrap();
    assert!(engine.machines().is_empty());
}

#[test]
fn simulate_mode_rejects_every_edit_command() {
    let (mut engine, ids) = engine_and_ids();
    let miner = engine
        .place_machine(ids.miner, p(4, 4), Rotation::None)
        .unwrap();
    engine.start_simulation();

    assert!(engine.start_belt_drag(p(1, 1)).is_err());
    assert!(engine.delete_at_cell(p(1, 1), DeleteMode::Cell).is_err());
    assert!(engine.place_machine(ids.depot, p(8, 8), Rotation::None).is_err());
    assert!(engine.move_machine(miner, p(9, 9)).is_err());
    assert!(engine.rotate_machine(miner, Rotation::Cw90).is_err());
    assert!(engine.remove_machine(miner).is_err());

    // The machine set is untouched.
    assert_eq!(engine.machines().len(), 1);
    assert_eq!(
        engine.machines().get(miner).unwrap().origin,
        p(4, 4)
    );
}
