/*!
Capsule solver settings and tolerances.

These constants centralize the parameters used by depenetration, the vertical
and horizontal sweeps, step-up and the support query. Keeping them together
makes tuning easier and keeps fixed-step replays repeatable.

Notes
- Distances are in meters, time in seconds.
- Favor practical world-space tolerances over machine epsilon for robust behavior.
- Per-session overrides go through [`SolverSettings`]; the constants are its defaults.
*/

/// Separation kept from surfaces when landing, sliding or resolving overlap (meters).
/// Too large creates visible gaps; too small risks jitter on contact.
pub const DEFAULT_SKIN: f32 = 0.01;

/// Height the capsule hovers above a supporting surface (meters).
pub const DEFAULT_HOVER: f32 = 0.01;

/// Maximum depenetration passes per tick.
pub const DEFAULT_MAX_DEPEN_ITERATIONS: u32 = 8;

/// Largest correction a single depenetration pass may apply (meters).
pub const DEFAULT_MAX_DEPEN_PER_ITERATION: f32 = 0.5;

/// Maximum sweep-and-slide iterations in the XZ phase.
pub const DEFAULT_MAX_SLIDE_ITERATIONS: u32 = 4;

/// Maximum cleanup passes in the convergence loop.
pub const DEFAULT_MAX_CLEANUP_ITERATIONS: u32 = 4;

/// Tallest ledge the capsule may climb without jumping (meters).
pub const DEFAULT_MAX_STEP_HEIGHT: f32 = 0.35;

/// Downward support probe length (meters).
pub const DEFAULT_SNAP_DISTANCE: f32 = 0.3;

/// Minimum Y component of a surface normal that counts as ground.
pub const MIN_GROUND_NORMAL_Y: f32 = 0.7;

/// Hits whose normal opposes the motion direction by less than this are grazing and ignored.
pub const GRAZE_EPS: f32 = 0.02;

/// Times of impact closer than this are ties; the lower collider id wins.
pub const TOI_TIE_EPSILON: f32 = 1.0e-4;

/// Slack on the step-up height comparison (meters).
pub const STEP_HEIGHT_EPS: f32 = 1.0e-4;

/// Minimum squared movement threshold to consider a translation meaningful (m^2).
pub const MIN_MOVE_SQ: f32 = 1.0e-10;

/// Penetrations shallower than this are not worth resolving (meters).
pub const MIN_PENETRATION: f32 = 1.0e-5;

/// Practical small distance for comparisons (meters).
pub const DIST_EPS: f32 = 1.0e-6;

/// Runtime copy of the solver tunables, defaulted from the constants above.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverSettings {
    pub skin: f32,
    pub hover: f32,
    pub max_depen_iterations: u32,
    pub max_depen_per_iteration: f32,
    pub max_slide_iterations: u32,
    pub max_cleanup_iterations: u32,
    pub max_step_height: f32,
    pub snap_distance: f32,
    pub toi_tie_epsilon: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            skin: DEFAULT_SKIN,
            hover: DEFAULT_HOVER,
            max_depen_iterations: DEFAULT_MAX_DEPEN_ITERATIONS,
            max_depen_per_iteration: DEFAULT_MAX_DEPEN_PER_ITERATION,
            max_slide_iterations: DEFAULT_MAX_SLIDE_ITERATIONS,
            max_cleanup_iterations: DEFAULT_MAX_CLEANUP_ITERATIONS,
            max_step_height: DEFAULT_MAX_STEP_HEIGHT,
            snap_distance: DEFAULT_SNAP_DISTANCE,
            toi_tie_epsilon: TOI_TIE_EPSILON,
        }
    }
}
