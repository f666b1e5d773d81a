use std::f32::consts::PI;

use crate::{
    action::StepIntent,
    collision::{CapsuleGeom, CapsuleMoveRequest, CapsuleMoveResult, SolverSettings, Vec3, settings::DIST_EPS},
    constants::{
        AIR_CONTROL, GRAVITY, JUMP_SPEED, MAX_PITCH, MIN_PITCH, PAWN_HALF_HEIGHT, PAWN_RADIUS, SPRINT_MULTIPLIER,
        TERMINAL_FALL_SPEED, WALK_SPEED,
    },
};

/// Simulated character state. Only the fixed step writes it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PawnState {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Result of the previous step's support query.
    pub on_ground: bool,
    /// Facing in radians; 0 faces +Z, positive turns toward +X.
    pub yaw: f32,
    pub pitch: f32,
}

impl PawnState {
    pub fn spawned_at(position: Vec3) -> Self {
        Self {
            position,
            velocity: Vec3::zeros(),
            on_ground: false,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    #[inline]
    pub fn horizontal_speed(&self) -> f32 {
        (self.velocity.x * self.velocity.x + self.velocity.z * self.velocity.z).sqrt()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PawnConfig {
    pub geom: CapsuleGeom,
    pub walk_speed: f32,
    pub sprint_multiplier: f32,
    pub air_control: f32,
    pub gravity: f32,
    pub terminal_fall_speed: f32,
    pub jump_speed: f32,
    pub min_pitch: f32,
    pub max_pitch: f32,
}

impl Default for PawnConfig {
    fn default() -> Self {
        Self {
            geom: CapsuleGeom::new(PAWN_RADIUS, PAWN_HALF_HEIGHT),
            walk_speed: WALK_SPEED,
            sprint_multiplier: SPRINT_MULTIPLIER,
            air_control: AIR_CONTROL,
            gravity: GRAVITY,
            terminal_fall_speed: TERMINAL_FALL_SPEED,
            jump_speed: JUMP_SPEED,
            min_pitch: MIN_PITCH,
            max_pitch: MAX_PITCH,
        }
    }
}

/// Wrap an angle into (-PI, PI].
#[inline]
pub fn wrap_angle(a: f32) -> f32 {
    let mut w = a.rem_euclid(2.0 * PI);
    if w > PI {
        w -= 2.0 * PI;
    }
    w
}

/// Unit forward vector on the XZ plane for `yaw`.
#[inline]
pub fn planar_forward(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// World-space wish velocity for the intent's movement axes at `yaw`.
pub fn wish_velocity(intent: &StepIntent, yaw: f32, config: &PawnConfig) -> Vec3 {
    let mut axes = (intent.move_x, intent.move_z);
    let len_sq = axes.0 * axes.0 + axes.1 * axes.1;
    if len_sq <= DIST_EPS {
        return Vec3::zeros();
    }
    if len_sq > 1.0 {
        let len = len_sq.sqrt();
        axes = (axes.0 / len, axes.1 / len);
    }

    let forward = planar_forward(yaw);
    // Right-handed, Y up: right of +Z is -X.
    let right = Vec3::new(-forward.z, 0.0, forward.x);

    let mut speed = config.walk_speed;
    if intent.sprint {
        speed *= config.sprint_multiplier;
    }
    (forward * axes.1 + right * axes.0) * speed
}

/// Per-step integration result before collision.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Integrated {
    pub request: CapsuleMoveRequest,
    pub yaw: f32,
    pub pitch: f32,
    pub jumped: bool,
}

/// Apply look, movement, jump and gravity for one step and build the solver request.
pub fn integrate(
    pawn: &PawnState,
    intent: &StepIntent,
    config: &PawnConfig,
    settings: &SolverSettings,
    dt: f32,
) -> Integrated {
    let yaw = wrap_angle(pawn.yaw + intent.yaw_delta);
    let pitch = (pawn.pitch + intent.pitch_delta).clamp(config.min_pitch, config.max_pitch);

    let wish = wish_velocity(intent, yaw, config);
    let mut velocity = pawn.velocity;
    let mut on_ground = pawn.on_ground;

    if on_ground {
        velocity.x = wish.x;
        velocity.z = wish.z;
        velocity.y = 0.0;
    } else {
        // Exponential approach keeps air control frame-rate independent.
        let t = 1.0 - (-config.air_control * dt).exp();
        velocity.x += (wish.x - velocity.x) * t;
        velocity.z += (wish.z - velocity.z) * t;
    }

    let jumped = intent.jump;
    if jumped {
        velocity.y = config.jump_speed;
        on_ground = false;
    }

    if !on_ground {
        velocity.y = (velocity.y - config.gravity * dt).max(-config.terminal_fall_speed);
    }

    Integrated {
        request: CapsuleMoveRequest {
            position: pawn.position,
            velocity,
            on_ground,
            just_jumped: jumped,
            ccd_enabled: false,
            geom: config.geom,
            settings: *settings,
            dt,
        },
        yaw,
        pitch,
        jumped,
    }
}

impl PawnState {
    /// Commit a solver result and the step's look angles.
    pub fn apply(&mut self, integrated: &Integrated, result: &CapsuleMoveResult) {
        self.position = result.position;
        self.velocity = result.velocity;
        self.on_ground = result.on_ground;
        self.yaw = integrated.yaw;
        self.pitch = integrated.pitch;
    }
}
