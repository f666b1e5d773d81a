//! Fixed-step simulation driver.
//!
//! Each displayed frame goes through [`FixedStepDriver::run_frame`]: the frame's
//! input is staged into the [`ActionBuffer`], the accumulator runs zero or more
//! fixed steps of [`Simulation::step`], and the frame is finalized. The pawn only
//! changes inside a fixed step; everything else is presentation.

#[cfg(any(test, feature = "legacy-compare"))]
use crate::collision::legacy::EquivalenceProbe;
use crate::{
    action::{ActionBuffer, ActionConfig, ActionDebugState, FrameInput, StepIntent},
    camera::CameraConfig,
    collision::{CollisionStats, SolverSettings, WorldState, solve},
    constants::{FIXED_DT, MAX_ACCUMULATOR_SECONDS},
    pawn::{PawnConfig, PawnState, integrate, wrap_angle},
};

/// Every runtime tunable of a session, defaulted from the constants.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SessionConfig {
    pub solver: SolverSettings,
    pub pawn: PawnConfig,
    pub action: ActionConfig,
    pub camera: CameraConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RespawnReason {
    /// The pawn fell below the kill plane.
    KillZone,
    /// The host asked for a reset.
    Explicit,
}

impl RespawnReason {
    pub fn label(self) -> &'static str {
        match self {
            RespawnReason::KillZone => "kill zone",
            RespawnReason::Explicit => "explicit",
        }
    }
}

/// Accumulates frame time and hands it out in fixed steps.
#[derive(Clone, Copy, Debug)]
pub struct FixedStepClock {
    fixed_dt: f32,
    max_accumulator: f32,
    accumulator: f32,
}

impl Default for FixedStepClock {
    fn default() -> Self {
        Self::new(FIXED_DT, MAX_ACCUMULATOR_SECONDS)
    }
}

impl FixedStepClock {
    pub fn new(fixed_dt: f32, max_accumulator: f32) -> Self {
        debug_assert!(fixed_dt > 0.0, "fixed timestep must be positive");
        Self {
            fixed_dt,
            max_accumulator: max_accumulator.max(fixed_dt),
            accumulator: 0.0,
        }
    }

    #[inline]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    #[inline]
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Bank `frame_dt`. Returns true when the bank had to be clamped.
    pub fn advance(&mut self, frame_dt: f32) -> bool {
        self.accumulator += frame_dt.max(0.0);
        if self.accumulator > self.max_accumulator {
            log::debug!(
                "accumulator clamped from {:.4}s to {:.4}s",
                self.accumulator,
                self.max_accumulator
            );
            self.accumulator = self.max_accumulator;
            return true;
        }
        false
    }

    /// Take one fixed step out of the bank if there is enough banked time.
    pub fn try_consume(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            true
        } else {
            false
        }
    }

    pub fn drain(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Result of one fixed step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepOutcome {
    pub jumped: bool,
    pub respawned: Option<RespawnReason>,
}

/// World plus pawn: the part of a session that only moves in fixed steps.
pub struct Simulation {
    world: WorldState,
    pawn: PawnState,
    pawn_config: PawnConfig,
    solver: SolverSettings,
    stats: CollisionStats,
    steps: u64,
    respawn_count: u32,
    last_respawn: Option<RespawnReason>,
    #[cfg(any(test, feature = "legacy-compare"))]
    probe: Option<Box<dyn EquivalenceProbe>>,
}

impl Simulation {
    pub fn new(world: WorldState, pawn_config: PawnConfig, solver: SolverSettings) -> Self {
        let pawn = PawnState::spawned_at(world.spawn_point());
        Self {
            world,
            pawn,
            pawn_config,
            solver,
            stats: CollisionStats::default(),
            steps: 0,
            respawn_count: 0,
            last_respawn: None,
            #[cfg(any(test, feature = "legacy-compare"))]
            probe: None,
        }
    }

    /// Attach a probe that cross-checks every solved step.
    #[cfg(any(test, feature = "legacy-compare"))]
    pub fn set_probe(&mut self, probe: Box<dyn EquivalenceProbe>) {
        self.probe = Some(probe);
    }

    #[cfg(any(test, feature = "legacy-compare"))]
    pub fn probe_divergences(&self) -> u32 {
        self.probe.as_ref().map_or(0, |p| p.divergences())
    }

    /// Integrate, solve and commit one fixed step, then check the kill plane.
    pub fn step(&mut self, intent: &StepIntent, dt: f32) -> StepOutcome {
        let integrated = integrate(&self.pawn, intent, &self.pawn_config, &self.solver, dt);
        let view = self.world.view();
        let result = solve(&view, &integrated.request, &mut self.stats);

        #[cfg(any(test, feature = "legacy-compare"))]
        if let Some(probe) = self.probe.as_mut() {
            probe.observe(&view, &integrated.request, &self.stats);
        }

        self.pawn.apply(&integrated, &result);
        self.steps += 1;

        let mut outcome = StepOutcome {
            jumped: integrated.jumped,
            respawned: None,
        };
        if self.pawn.position.y < self.world.kill_y() {
            self.respawn(RespawnReason::KillZone);
            outcome.respawned = Some(RespawnReason::KillZone);
        }
        outcome
    }

    /// Put the pawn back at the spawn point at rest.
    pub fn respawn(&mut self, reason: RespawnReason) {
        log::info!(
            "respawn ({}) from ({:.2}, {:.2}, {:.2})",
            reason.label(),
            self.pawn.position.x,
            self.pawn.position.y,
            self.pawn.position.z
        );
        self.pawn = PawnState::spawned_at(self.world.spawn_point());
        self.respawn_count += 1;
        self.last_respawn = Some(reason);
    }

    #[inline]
    pub fn pawn(&self) -> &PawnState {
        &self.pawn
    }

    #[inline]
    pub fn pawn_config(&self) -> &PawnConfig {
        &self.pawn_config
    }

    #[inline]
    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Mutable world access, e.g. to rebuild the extras layer between frames.
    #[inline]
    pub fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    /// Diagnostics of the most recent step.
    #[inline]
    pub fn stats(&self) -> &CollisionStats {
        &self.stats
    }

    #[inline]
    pub fn steps(&self) -> u64 {
        self.steps
    }

    #[inline]
    pub fn respawn_count(&self) -> u32 {
        self.respawn_count
    }

    #[inline]
    pub fn last_respawn(&self) -> Option<RespawnReason> {
        self.last_respawn
    }
}

/// What happened during one displayed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub steps: u32,
    pub accumulator_clamped: bool,
    pub jumped: bool,
    pub respawned: Option<RespawnReason>,
    /// Pending mouse look not yet applied by a step; zero when a step ran.
    pub look_preview: (f32, f32),
}

pub struct FixedStepDriver {
    sim: Simulation,
    actions: ActionBuffer,
    clock: FixedStepClock,
    third_person: bool,
    look_preview: (f32, f32),
    frames: u64,
}

impl FixedStepDriver {
    pub fn new(world: WorldState, config: SessionConfig) -> Self {
        Self {
            sim: Simulation::new(world, config.pawn, config.solver),
            actions: ActionBuffer::new(config.action),
            clock: FixedStepClock::default(),
            third_person: config.camera.third_person,
            look_preview: (0.0, 0.0),
            frames: 0,
        }
    }

    /// Replace the clock, e.g. to run at a different fixed rate.
    pub fn with_clock(mut self, clock: FixedStepClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn set_third_person(&mut self, third_person: bool) {
        self.third_person = third_person;
    }

    /// Run one displayed frame of `frame_dt` seconds.
    pub fn run_frame(&mut self, input: &FrameInput, frame_dt: f32) -> FrameReport {
        self.frames += 1;
        self.actions.stage_frame_intent(input, input.ui_blocked());

        let mut report = FrameReport {
            accumulator_clamped: self.clock.advance(frame_dt),
            ..Default::default()
        };

        let fixed_dt = self.clock.fixed_dt();
        while self.clock.try_consume() {
            let intent = self.actions.build_step_intent(
                self.sim.pawn().on_ground,
                fixed_dt,
                report.steps,
                self.third_person,
            );
            let outcome = self.sim.step(&intent, fixed_dt);
            report.steps += 1;
            report.jumped |= outcome.jumped;
            if outcome.respawned.is_some() {
                // Steps after a respawn in the same frame would replay stale input.
                report.respawned = outcome.respawned;
                self.clock.drain();
                break;
            }
        }

        self.actions.finalize_frame_intent(report.steps, frame_dt);
        if report.respawned.is_some() {
            self.actions.reset_all_state();
        }

        self.look_preview = if report.steps == 0 {
            self.actions.pending_look_preview_rad(self.third_person)
        } else {
            (0.0, 0.0)
        };
        report.look_preview = self.look_preview;
        report
    }

    /// Focus went away: forget buffered input and banked time.
    pub fn on_focus_lost(&mut self) {
        self.actions.reset_all_state();
        self.clock.drain();
        self.look_preview = (0.0, 0.0);
    }

    /// Respawn the pawn now, outside of any fixed step.
    pub fn request_respawn(&mut self) {
        self.sim.respawn(RespawnReason::Explicit);
        self.actions.reset_all_state();
        self.clock.drain();
        self.look_preview = (0.0, 0.0);
    }

    /// Yaw and pitch to render with: the pawn's plus the pending look preview.
    /// Yaw is wrapped like the simulation's.
    pub fn view_angles(&self) -> (f32, f32) {
        let pawn = self.sim.pawn();
        let cfg = self.sim.pawn_config();
        (
            wrap_angle(pawn.yaw + self.look_preview.0),
            (pawn.pitch + self.look_preview.1).clamp(cfg.min_pitch, cfg.max_pitch),
        )
    }

    #[inline]
    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    #[inline]
    pub fn simulation_mut(&mut self) -> &mut Simulation {
        &mut self.sim
    }

    #[inline]
    pub fn pawn(&self) -> &PawnState {
        self.sim.pawn()
    }

    #[inline]
    pub fn actions(&self) -> &ActionBuffer {
        &self.actions
    }

    #[inline]
    pub fn action_debug(&self) -> ActionDebugState {
        self.actions.debug_state()
    }

    #[inline]
    pub fn clock(&self) -> &FixedStepClock {
        &self.clock
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_runs_whole_steps_and_clamps() {
        let mut clock = FixedStepClock::new(0.25, 1.0);
        assert!(!clock.advance(0.6));
        let mut steps = 0;
        while clock.try_consume() {
            steps += 1;
        }
        assert_eq!(steps, 2);
        assert!((clock.accumulator() - 0.1).abs() < 1.0e-6);

        assert!(clock.advance(5.0));
        assert_eq!(clock.accumulator(), 1.0);
        clock.drain();
        assert!(!clock.try_consume());
    }

    #[test]
    fn landing_on_cube_tops_matches_the_legacy_resolve() {
        let desc = crate::scene_file::parse_scene(
            "GRID 4 4 2.0 -4.0 -4.0 1.0 1.0\nFLOOR 0.0 4.0 4.0\nKILLZONE -20.0\n",
        )
        .expect("valid scene");
        let mut driver = FixedStepDriver::new(crate::level::build_world(&desc), SessionConfig::default());
        driver
            .simulation_mut()
            .set_probe(Box::new(crate::collision::legacy::LegacyAxisProbe::default()));

        for _ in 0..90 {
            driver.run_frame(&FrameInput::default(), FIXED_DT);
        }
        assert!(driver.pawn().on_ground);
        assert_eq!(driver.simulation().steps(), 90);
        assert_eq!(driver.simulation().probe_divergences(), 0);
    }

    #[test]
    fn previewed_yaw_stays_wrapped() {
        let desc = crate::scene_file::parse_scene(
            "GRID 4 4 2.0 -4.0 -4.0 1.0 1.0\nFLOOR 0.0 4.0 4.0\nKILLZONE -20.0\n",
        )
        .expect("valid scene");
        let mut driver = FixedStepDriver::new(crate::level::build_world(&desc), SessionConfig::default());
        // Pawn yaw near +PI; a zero-step frame previews a further turn past it.
        driver.sim.pawn.yaw = 3.0;
        driver.look_preview = (0.5, 0.0);
        let (yaw, _) = driver.view_angles();
        assert!(yaw > -std::f32::consts::PI && yaw <= std::f32::consts::PI, "yaw = {yaw}");
        assert!((yaw - (3.5 - 2.0 * std::f32::consts::PI)).abs() < 1.0e-5);
    }

    #[test]
    fn negative_frame_time_banks_nothing() {
        let mut clock = FixedStepClock::default();
        clock.advance(-1.0);
        assert_eq!(clock.accumulator(), 0.0);
    }
}
