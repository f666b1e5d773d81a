/// Simulation timestep in seconds (60 Hz).
pub const FIXED_DT: f32 = 1.0 / 60.0;

/// Upper bound on banked frame time (seconds).
///
/// After a stall (breakpoint, OS hitch) the driver runs at most
/// `MAX_ACCUMULATOR_SECONDS / FIXED_DT` catch-up steps instead of spiraling.
pub const MAX_ACCUMULATOR_SECONDS: f32 = 0.25;

/// How long a jump press stays buffered before it expires (seconds).
pub const JUMP_BUFFER_SECONDS: f32 = 0.12;

/// Grace window after leaving the ground during which a jump still fires (seconds).
pub const COYOTE_SECONDS: f32 = 0.10;

/// Mouse look sensitivity in radians per count.
pub const MOUSE_SENSITIVITY_FIRST_PERSON: f32 = 0.0022;
pub const MOUSE_SENSITIVITY_THIRD_PERSON: f32 = 0.0030;

/// Keyboard turn rate in radians per second at full axis deflection.
pub const KEYBOARD_YAW_RATE: f32 = 2.5;

/// Pitch limits in radians (looking down is negative).
pub const MIN_PITCH: f32 = -1.45;
pub const MAX_PITCH: f32 = 1.45;

/// Pawn capsule dimensions (meters).
pub const PAWN_RADIUS: f32 = 0.4;
pub const PAWN_HALF_HEIGHT: f32 = 0.5;

/// Walk speed in meters per second.
pub const WALK_SPEED: f32 = 4.5;

/// Speed multiplier while sprint is held.
pub const SPRINT_MULTIPLIER: f32 = 1.8;

/// Air-control rate for planar (XZ) movement while airborne.
///
/// Convention:
/// - large values snap to the wish velocity almost immediately (arcade)
/// - 0.0 = no air control, momentum is kept until landing
pub const AIR_CONTROL: f32 = 4.0;

/// Downward acceleration (m/s^2).
pub const GRAVITY: f32 = 22.0;

/// Maximum falling speed (m/s).
pub const TERMINAL_FALL_SPEED: f32 = 40.0;

/// Upward speed applied on jump (m/s).
pub const JUMP_SPEED: f32 = 7.5;

/// Camera tuning.
pub const CAMERA_DISTANCE: f32 = 6.0;
pub const CAMERA_HEIGHT: f32 = 1.6;
pub const EYE_HEIGHT: f32 = 0.7;
pub const CAMERA_DECAY_RATE: f32 = 18.0;
