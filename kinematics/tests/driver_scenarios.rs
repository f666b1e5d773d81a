use kinematics::{
    FIXED_DT, FixedStepDriver, FrameInput, RespawnReason, SessionConfig, StairFixture, build_stairs, build_world,
    collision::{
        Aabb, CapsuleGeom, ColliderProps, ColliderSource, FloorSlab, GridLayout, HitTarget, Point3, Vec3,
        WorldState,
        narrow_phase::{Obstacle, capsule_box_penetration},
    },
    constants::{COYOTE_SECONDS, JUMP_BUFFER_SECONDS},
    parse_scene,
};

const GRID_SCENE: &str = "\
GRID 8 8 2.0 -8.0 -8.0 1.0 1.0
FLOOR 0.0 8.0 8.0
KILLZONE -20.0
REPLACE_PRESET 5 4 step_low ledge
REPLACE_PRESET 6 4 pillar wall
";

fn layout() -> GridLayout {
    GridLayout {
        origin_x: -8.0,
        origin_z: -8.0,
        cell_size: 2.0,
        cells_x: 8,
        cells_z: 8,
    }
}

fn grid_driver() -> FixedStepDriver {
    let desc = parse_scene(GRID_SCENE).expect("scene parses");
    FixedStepDriver::new(build_world(&desc), SessionConfig::default())
}

fn idle() -> FrameInput {
    FrameInput::default()
}

fn press_jump() -> FrameInput {
    FrameInput {
        jump_pressed: true,
        ..Default::default()
    }
}

fn forward() -> FrameInput {
    FrameInput {
        move_z: 1.0,
        ..Default::default()
    }
}

/// Run idle fixed-length frames until the pawn has been grounded for a while.
fn settle(driver: &mut FixedStepDriver) {
    for _ in 0..120 {
        driver.run_frame(&idle(), FIXED_DT);
    }
    assert!(driver.pawn().on_ground, "pawn never landed");
}

#[test]
fn same_inputs_replay_bit_for_bit() {
    let script: Vec<(FrameInput, f32)> = (0..400)
        .map(|i| {
            let input = FrameInput {
                move_x: if i % 90 < 30 { 1.0 } else { 0.0 },
                move_z: if i % 50 < 35 { 1.0 } else { -0.5 },
                mouse_dx: (i % 7) as f32 - 3.0,
                jump_pressed: i % 45 == 0,
                sprint_held: i % 120 > 60,
                ..Default::default()
            };
            let dt = [0.004, 0.016, 0.033, 0.0166, 0.051][i % 5];
            (input, dt)
        })
        .collect();

    let run = || {
        let mut driver = grid_driver();
        let mut trace = Vec::new();
        for (input, dt) in &script {
            let report = driver.run_frame(input, *dt);
            let pawn = *driver.pawn();
            trace.push((report, pawn, *driver.simulation().stats()));
        }
        trace
    };

    let a = run();
    let b = run();
    assert_eq!(a.len(), b.len());
    for (i, (x, y)) in a.iter().zip(&b).enumerate() {
        assert_eq!(x, y, "diverged at frame {i}");
    }
}

#[test]
fn jump_fires_once_in_a_multi_step_frame() {
    let mut driver = grid_driver();
    settle(&mut driver);

    let report = driver.run_frame(&press_jump(), 4.5 * FIXED_DT);
    assert_eq!(report.steps, 4);
    assert!(report.jumped);
    let dbg = driver.action_debug();
    assert_eq!(dbg.jumps_fired_this_frame, 1);
    assert_eq!(dbg.steps_this_frame, 4);
    assert_eq!(driver.actions().jump_buffer_remaining(), 0.0);
    assert!(!driver.pawn().on_ground);
    assert!(driver.pawn().velocity.y > 0.0);

    // Holding nothing afterwards never re-fires.
    for _ in 0..10 {
        assert!(!driver.run_frame(&idle(), FIXED_DT).jumped);
    }
}

#[test]
fn press_in_a_zero_step_frame_fires_on_the_next_step() {
    let mut driver = grid_driver();
    settle(&mut driver);
    assert_eq!(driver.clock().accumulator(), 0.0);

    let short = 0.25 * FIXED_DT;
    let report = driver.run_frame(&press_jump(), short);
    assert_eq!(report.steps, 0);
    assert!(!report.jumped);
    assert!(driver.pawn().on_ground);
    assert!((driver.actions().jump_buffer_remaining() - (JUMP_BUFFER_SECONDS - short)).abs() < 1.0e-6);
    assert!((driver.action_debug().zero_step_decay - short).abs() < 1.0e-9);

    let report = driver.run_frame(&idle(), FIXED_DT);
    assert_eq!(report.steps, 1);
    assert!(report.jumped);
    assert!(driver.pawn().velocity.y > 0.0);
}

#[test]
fn timers_decay_once_per_step_or_once_per_empty_frame() {
    let mut driver = grid_driver();
    // Freshly spawned and still falling, so the press stays buffered.
    assert!(!driver.pawn().on_ground);

    assert_eq!(driver.run_frame(&press_jump(), FIXED_DT).steps, 1);
    assert_eq!(driver.run_frame(&idle(), 0.5 * FIXED_DT).steps, 0);
    assert_eq!(driver.run_frame(&idle(), 0.5 * FIXED_DT).steps, 1);
    assert!(!driver.pawn().on_ground);

    let expected = JUMP_BUFFER_SECONDS - 2.5 * FIXED_DT;
    assert!(
        (driver.actions().jump_buffer_remaining() - expected).abs() < 1.0e-6,
        "buffer {} expected {expected}",
        driver.actions().jump_buffer_remaining()
    );

    let mut plain = grid_driver();
    plain.run_frame(&press_jump(), FIXED_DT);
    plain.run_frame(&idle(), FIXED_DT);
    plain.run_frame(&idle(), FIXED_DT);
    let expected = JUMP_BUFFER_SECONDS - 3.0 * FIXED_DT;
    assert!((plain.actions().jump_buffer_remaining() - expected).abs() < 1.0e-6);
}

#[test]
fn a_three_step_frame_decays_the_buffer_three_times() {
    let mut driver = grid_driver();
    assert!(!driver.pawn().on_ground);

    let report = driver.run_frame(&press_jump(), 3.5 * FIXED_DT);
    assert_eq!(report.steps, 3);
    assert!(!report.jumped);
    assert!(!driver.pawn().on_ground);

    let expected = JUMP_BUFFER_SECONDS - 3.0 * FIXED_DT;
    let remaining = driver.actions().jump_buffer_remaining();
    assert!((remaining - expected).abs() < 1.0e-6, "buffer {remaining} expected {expected}");
    assert_eq!(driver.action_debug().steps_this_frame, 3);
}

fn walk_plus_x() -> FrameInput {
    // Right of +Z is -X, so a negative strafe walks toward +X.
    FrameInput {
        move_x: -1.0,
        ..Default::default()
    }
}

/// Walk +X until the pawn center passes `stop_x`, checking that it stays grounded and
/// never loses height on the way. Returns the number of successful step-ups.
fn climb_to(driver: &mut FixedStepDriver, stop_x: f32) -> u32 {
    let mut prev_y = driver.pawn().position.y;
    let mut step_ups = 0;
    for frame in 0..600 {
        driver.run_frame(&walk_plus_x(), FIXED_DT);
        step_ups += u32::from(driver.simulation().stats().step_up_succeeded);

        let pos = driver.pawn().position;
        assert!(
            driver.pawn().on_ground,
            "frame {frame}: airborne at {pos:?}, step-up fail [{}]",
            driver.simulation().stats().step_up_fail_labels()
        );
        assert!(pos.y >= prev_y - 1.0e-4, "frame {frame}: y dropped {prev_y} -> {}", pos.y);
        prev_y = pos.y;
        if pos.x > stop_x {
            return step_ups;
        }
    }
    panic!("never reached x = {stop_x}, stuck at {:?}", driver.pawn().position);
}

#[test]
fn staircase_is_climbed_one_step_up_per_step() {
    let fixture = StairFixture {
        origin: Vec3::new(1.0, 0.0, 0.0),
        ..Default::default()
    };
    let mut world = WorldState::new(
        layout(),
        Some(FloorSlab {
            top_y: 0.0,
            half_x: 8.0,
            half_z: 8.0,
        }),
        -20.0,
        Vec3::new(-1.0, 2.0, 0.0),
    );
    build_stairs(&mut world, &fixture);
    let mut driver = FixedStepDriver::new(world, SessionConfig::default());
    settle(&mut driver);
    let floor_rest = driver.pawn().position.y;

    let top_tread = fixture.origin.x + (fixture.count - 1) as f32 * fixture.run;
    let step_ups = climb_to(&mut driver, top_tread + 0.1);

    assert_eq!(step_ups, fixture.count);
    let expected = floor_rest + fixture.count as f32 * fixture.rise;
    let y = driver.pawn().position.y;
    assert!((y - expected).abs() < 1.0e-4, "y = {y}, expected {expected}");
}

#[test]
fn low_preset_ledge_is_climbed_once() {
    // Odd grid so the spawn sits in the middle of a cell row.
    let desc = parse_scene(
        "GRID 9 9 2.0 -9.0 -9.0 1.0 1.0\nFLOOR 0.0 9.0 9.0\nKILLZONE -20.0\nREPLACE_PRESET 6 4 step_low ledge\n",
    )
    .expect("scene parses");
    let mut driver = FixedStepDriver::new(build_world(&desc), SessionConfig::default());
    settle(&mut driver);
    let cube_rest = driver.pawn().position.y;

    // The ledge cell spans x in [3, 5].
    let step_ups = climb_to(&mut driver, 3.5);
    assert_eq!(step_ups, 1);
    let y = driver.pawn().position.y;
    let expected = cube_rest + kinematics::level::PRESET_LOW_RISE;
    assert!((y - expected).abs() < 1.0e-4, "y = {y}, expected {expected}");
}

/// A 2m platform covering z < 0, with the open floor beyond.
fn platform_driver() -> FixedStepDriver {
    let mut world = WorldState::new(
        layout(),
        Some(FloorSlab {
            top_y: 0.0,
            half_x: 8.0,
            half_z: 8.0,
        }),
        -20.0,
        Vec3::new(0.0, 3.0, -4.0),
    );
    world.add_static(
        Aabb::new(Point3::new(-8.0, 0.0, -8.0), Point3::new(8.0, 2.0, 0.0)),
        ColliderProps::SOLID,
        ColliderSource::Extra {
            tag: "platform".to_owned(),
        },
    );
    FixedStepDriver::new(world, SessionConfig::default())
}

/// Walk forward until the first frame that ends airborne after having been grounded.
fn walk_off_edge(driver: &mut FixedStepDriver) {
    let mut grounded = false;
    for _ in 0..400 {
        driver.run_frame(&forward(), FIXED_DT);
        let on_ground = driver.pawn().on_ground;
        if grounded && !on_ground {
            assert!(driver.pawn().position.z > -0.5, "left the ground before the edge");
            return;
        }
        grounded |= on_ground;
    }
    panic!("pawn never walked off the platform");
}

#[test]
fn coyote_window_allows_a_late_jump() {
    let mut driver = platform_driver();
    walk_off_edge(&mut driver);
    assert!(driver.actions().coyote_remaining() > 0.0);

    let report = driver.run_frame(&press_jump(), FIXED_DT);
    assert!(report.jumped);
    assert!(driver.pawn().velocity.y > 0.0);
}

#[test]
fn coyote_window_expires() {
    let mut driver = platform_driver();
    walk_off_edge(&mut driver);

    let frames = (COYOTE_SECONDS / FIXED_DT).ceil() as usize + 2;
    for _ in 0..frames {
        driver.run_frame(&forward(), FIXED_DT);
    }
    assert!(!driver.pawn().on_ground);
    assert_eq!(driver.actions().coyote_remaining(), 0.0);

    let report = driver.run_frame(&press_jump(), FIXED_DT);
    assert!(!report.jumped);
    assert!(driver.pawn().velocity.y < 0.0);
}

#[test]
fn falling_below_the_kill_plane_respawns() {
    let spawn = Vec3::new(1.0, 3.0, 1.0);
    let world = WorldState::new(layout(), None, -5.0, spawn);
    let mut driver = FixedStepDriver::new(world, SessionConfig::default());

    let mut respawned = None;
    for _ in 0..300 {
        let report = driver.run_frame(&press_jump(), 2.0 * FIXED_DT);
        if report.respawned.is_some() {
            respawned = report.respawned;
            break;
        }
    }
    assert_eq!(respawned, Some(RespawnReason::KillZone));

    let sim = driver.simulation();
    assert_eq!(sim.respawn_count(), 1);
    assert_eq!(sim.last_respawn(), Some(RespawnReason::KillZone));
    assert_eq!(sim.pawn().position, spawn);
    assert_eq!(sim.pawn().velocity, Vec3::zeros());
    assert_eq!(driver.actions().jump_buffer_remaining(), 0.0);
    assert_eq!(driver.clock().accumulator(), 0.0);

    driver.request_respawn();
    assert_eq!(driver.simulation().respawn_count(), 2);
    assert_eq!(driver.simulation().last_respawn(), Some(RespawnReason::Explicit));
}

#[test]
fn spawning_inside_a_wall_is_resolved_on_the_first_step() {
    let mut world = WorldState::new(
        layout(),
        Some(FloorSlab {
            top_y: 0.0,
            half_x: 8.0,
            half_z: 8.0,
        }),
        -20.0,
        Vec3::new(0.2, 1.0, 0.0),
    );
    let wall = Aabb::new(Point3::new(-0.6, 0.0, -0.6), Point3::new(0.6, 2.0, 0.6));
    let id = world.add_static(wall, ColliderProps::SOLID, ColliderSource::GridCell { ix: 4, iz: 4 });
    let mut driver = FixedStepDriver::new(world, SessionConfig::default());

    driver.run_frame(&idle(), FIXED_DT);
    assert!(driver.simulation().stats().depen_applied);

    let geom = CapsuleGeom::new(kinematics::constants::PAWN_RADIUS, kinematics::constants::PAWN_HALF_HEIGHT);
    let ob = Obstacle {
        target: HitTarget::Collider(id),
        aabb: wall,
    };
    let pos = driver.pawn().position;
    assert!(capsule_box_penetration(&geom, pos, &ob).is_none(), "still inside at {pos:?}");

    driver.run_frame(&idle(), FIXED_DT);
    assert!(!driver.simulation().stats().depen_applied);
}

#[test]
fn focus_loss_forgets_buffered_input() {
    let mut driver = grid_driver();
    driver.run_frame(&press_jump(), 0.5 * FIXED_DT);
    assert!(driver.actions().jump_buffer_remaining() > 0.0);
    driver.on_focus_lost();
    assert_eq!(driver.actions().jump_buffer_remaining(), 0.0);
    assert_eq!(driver.clock().accumulator(), 0.0);
}
