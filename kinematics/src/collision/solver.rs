//! Per-tick capsule solver.
//!
//! One call to [`solve`] runs five ordered phases:
//!
//! 1. depenetration out of anything already overlapping,
//! 2. vertical sweep (the only phase that moves Y, apart from step-up and support);
//!    a fall onto a surface too steep to stand on slides off it,
//! 3. horizontal sweep-and-slide followed by one cleanup pass,
//! 4. at most one step-up attempt when the horizontal sweep was blocked,
//! 5. bounded cleanup passes, then exactly one support query.
//!
//! The solver is a pure function of the scene and the request; the only side
//! channel is the [`CollisionStats`] it fills in.

use super::{
    depenetration::depenetrate,
    narrow_phase::QueryScratch,
    settings::SolverSettings,
    stats::CollisionStats,
    step_up::{StepUpInput, try_step_up},
    support::query_support,
    sweep::{cleanup_xz_pass, sweep_xz, sweep_y},
    types::{CapsuleGeom, Vec3},
    world::SceneQuery,
};

/// Everything one tick of movement needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleMoveRequest {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Ground state from the previous tick's support query.
    pub on_ground: bool,
    /// A jump started this tick; suppresses the support snap.
    pub just_jumped: bool,
    /// Reserved for continuous collision against moving obstacles. Must stay `false`.
    pub ccd_enabled: bool,
    pub geom: CapsuleGeom,
    pub settings: SolverSettings,
    pub dt: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleMoveResult {
    pub position: Vec3,
    pub velocity: Vec3,
    pub on_ground: bool,
}

/// Bookkeeping for the once-per-tick rules.
///
/// Violations are programming errors: they trip a debug assertion and are refused
/// in release builds.
#[derive(Default, Debug)]
pub struct TickGuard {
    step_up_attempted: bool,
    support_queried: bool,
}

impl TickGuard {
    /// Claim the tick's single step-up attempt. Returns `false` if it was already used.
    pub fn begin_step_up(&mut self) -> bool {
        debug_assert!(!self.step_up_attempted, "step-up attempted twice in one tick");
        if self.step_up_attempted {
            return false;
        }
        self.step_up_attempted = true;
        true
    }

    /// Record the tick's support query.
    pub fn begin_support(&mut self) {
        debug_assert!(!self.support_queried, "support queried twice in one tick");
        self.support_queried = true;
    }

    /// Y is owned by the vertical sweep while the convergence loop runs.
    #[inline]
    pub fn check_y_untouched(&self, before: f32, after: f32) {
        debug_assert!(before == after, "convergence loop moved Y ({before} -> {after})");
    }

    pub fn finish(&self) {
        debug_assert!(self.support_queried, "tick finished without a support query");
    }
}

/// Advance the capsule by one fixed step against `scene`.
///
/// `stats` is reset first and describes this tick only.
pub fn solve<S: SceneQuery + ?Sized>(
    scene: &S,
    req: &CapsuleMoveRequest,
    stats: &mut CollisionStats,
) -> CapsuleMoveResult {
    *stats = CollisionStats::default();
    debug_assert!(!req.ccd_enabled, "continuous collision is not supported");

    let geom = &req.geom;
    let settings = &req.settings;
    let mut guard = TickGuard::default();
    let mut scratch = QueryScratch::default();
    let mut velocity = req.velocity;

    // A. Depenetration.
    let mut pos = depenetrate(scene, geom, settings, req.position, &mut scratch, stats);
    stats.depen_position = pos;

    // B. Vertical sweep.
    let vertical = sweep_y(scene, geom, settings, pos, velocity.y * req.dt, &mut scratch, stats);
    pos = vertical.pos;
    if vertical.hit.is_some() && !vertical.deflected {
        velocity.y = 0.0;
    }
    stats.sweep_y_position = pos;

    // C. Horizontal sweep-and-slide plus one cleanup pass.
    let wish_xz = Vec3::new(velocity.x, 0.0, velocity.z);
    let horizontal = sweep_xz(
        scene,
        geom,
        settings,
        pos,
        wish_xz * req.dt,
        wish_xz,
        &mut scratch,
        stats,
    );
    pos = horizontal.pos;
    velocity.x = horizontal.velocity_xz.x;
    velocity.z = horizontal.velocity_xz.z;
    cleanup_xz_pass(scene, geom, settings, &mut pos, &mut scratch, stats);

    // D. Step-up, only when something blocked the horizontal motion.
    let mut stepped_onto = None;
    if horizontal.blocker.is_some() {
        let input = StepUpInput {
            sweep: &horizontal,
            on_ground: req.on_ground,
            velocity_xz: wish_xz,
        };
        if let Some(stepped) = try_step_up(scene, geom, settings, input, &mut guard, &mut scratch, stats) {
            pos = stepped.pos;
            velocity.x = stepped.velocity_xz.x;
            velocity.z = stepped.velocity_xz.z;
            stepped_onto = horizontal.blocker.and_then(|h| h.target.collider());
        }
    }

    // E. Convergence, then support.
    let y_before = pos.y;
    let mut converged = false;
    for _ in 0..settings.max_cleanup_iterations {
        stats.convergence_passes += 1;
        if !cleanup_xz_pass(scene, geom, settings, &mut pos, &mut scratch, stats) {
            converged = true;
            break;
        }
    }
    if !converged {
        stats.hit_max_iter = true;
    }
    guard.check_y_untouched(y_before, pos.y);

    let support = query_support(
        scene,
        geom,
        settings,
        pos,
        velocity.y,
        req.just_jumped,
        stepped_onto,
        &mut guard,
        &mut scratch,
        stats,
    );
    pos = support.pos;
    if support.on_ground && velocity.y < 0.0 {
        velocity.y = 0.0;
    }
    guard.finish();

    if let Some(floor) = scene.floor() {
        if !floor.contains_xz(pos.x, pos.z) {
            stats.out_of_floor_bounds = true;
            log::debug!("pawn outside floor bounds at ({:.2}, {:.2})", pos.x, pos.z);
        }
    }

    CapsuleMoveResult {
        position: pos,
        velocity,
        on_ground: support.on_ground,
    }
}
