use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use clap::Parser;
use kinematics::{
    FixedStepDriver, HudSnapshot, PresentationCamera, SceneDescription, SessionConfig, StairFixture,
    build_stairs, build_world,
    collision::Vec3,
    level::default_cube_top,
    load_scene_file, parse_scene,
};

mod script;

use script::{ScriptEvent, default_track, expand, parse_script};

const DEFAULT_SCENE: &str = include_str!("../scenes/default.scene");

#[derive(Parser, Debug)]
#[command(name = "lab", version, about = "Headless capsule movement lab")]
struct Opts {
    /// Scene file; the built-in scene when omitted
    #[arg(long)]
    scene: Option<PathBuf>,
    /// Input track; without one the pawn walks forward and jumps now and then
    #[arg(long)]
    script: Option<PathBuf>,
    /// Frames to run when no script is given
    #[arg(long, default_value_t = 600)]
    frames: u32,
    /// Display rate used when no script is given
    #[arg(long, default_value_t = 144.0)]
    fps: f32,
    /// Build a staircase next to the spawn point
    #[arg(long)]
    stairs: bool,
    /// Print a HUD snapshot every N frames (0 disables)
    #[arg(long, default_value_t = 60)]
    hud_every: u32,
    /// Third-person camera and mouse sensitivity
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    third_person: bool,
}

fn load_scene(opts: &Opts) -> Result<SceneDescription> {
    match &opts.scene {
        Some(path) => {
            load_scene_file(path).with_context(|| format!("loading scene {}", path.display()))
        }
        None => parse_scene(DEFAULT_SCENE).context("parsing built-in scene"),
    }
}

fn run() -> Result<()> {
    let opts = Opts::parse();
    let desc = load_scene(&opts)?;

    let mut world = build_world(&desc);
    if opts.stairs {
        let spawn = world.spawn_point();
        let fixture = StairFixture {
            origin: Vec3::new(spawn.x + 2.0, default_cube_top(&desc), spawn.z),
            ..Default::default()
        };
        let steps = build_stairs(&mut world, &fixture);
        log::info!("stairs: {steps} steps at x={:.2}", fixture.origin.x);
    }

    let frames = match &opts.script {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading script {}", path.display()))?;
            let segments = parse_script(&text).with_context(|| format!("parsing script {}", path.display()))?;
            expand(&segments)
        }
        None => default_track(opts.frames, opts.fps),
    };

    let mut config = SessionConfig::default();
    config.camera.third_person = opts.third_person;
    let mut camera = PresentationCamera::new(config.camera);
    let mut driver = FixedStepDriver::new(world, config);

    #[cfg(feature = "legacy-compare")]
    driver
        .simulation_mut()
        .set_probe(Box::new(kinematics::collision::legacy::LegacyAxisProbe::default()));

    for (i, frame) in frames.iter().enumerate() {
        match frame.event {
            Some(ScriptEvent::FocusLost) => driver.on_focus_lost(),
            Some(ScriptEvent::Respawn) => driver.request_respawn(),
            None => {}
        }

        let report = driver.run_frame(&frame.input, frame.dt);
        let (yaw, pitch) = driver.view_angles();
        let pawn_pos = driver.pawn().position;
        if report.respawned.is_some() || matches!(frame.event, Some(ScriptEvent::Respawn)) {
            camera.snap_to(pawn_pos, yaw, pitch);
        } else {
            camera.update(pawn_pos, yaw, pitch, frame.dt);
        }

        if opts.hud_every > 0 && (i as u32 + 1) % opts.hud_every == 0 {
            println!("{}", HudSnapshot::capture(&driver, &report));
            let eye = camera.eye();
            println!("  camera ({:.2}, {:.2}, {:.2})", eye.x, eye.y, eye.z);
        }
    }

    let sim = driver.simulation();
    println!(
        "done: {} frames, {} steps, {} respawns, final position ({:.3}, {:.3}, {:.3})",
        frames.len(),
        sim.steps(),
        sim.respawn_count(),
        sim.pawn().position.x,
        sim.pawn().position.y,
        sim.pawn().position.z
    );
    #[cfg(feature = "legacy-compare")]
    println!("legacy divergences: {}", sim.probe_divergences());

    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        log::error!("{e:#}");
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}
