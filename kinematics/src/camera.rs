use crate::{
    collision::Vec3,
    constants::{CAMERA_DECAY_RATE, CAMERA_DISTANCE, CAMERA_HEIGHT, EYE_HEIGHT},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraConfig {
    /// Boom length behind the pawn in third person (meters).
    pub distance: f32,
    /// Boom pivot height above the pawn center.
    pub height: f32,
    /// Eye height above the pawn center in first person.
    pub eye_height: f32,
    /// Exponential smoothing rate; larger follows tighter.
    pub decay_rate: f32,
    pub third_person: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: CAMERA_DISTANCE,
            height: CAMERA_HEIGHT,
            eye_height: EYE_HEIGHT,
            decay_rate: CAMERA_DECAY_RATE,
            third_person: true,
        }
    }
}

/// Unit view direction for yaw/pitch (yaw 0 looks down +Z, positive pitch looks up).
#[inline]
pub fn view_forward(yaw: f32, pitch: f32) -> Vec3 {
    let (sp, cp) = pitch.sin_cos();
    Vec3::new(yaw.sin() * cp, sp, yaw.cos() * cp)
}

/// Move `from` toward `to` by the frame-rate independent factor `1 - e^(-decay * dt)`.
#[inline]
pub fn smooth_nudge(from: Vec3, to: Vec3, decay_rate: f32, dt: f32) -> Vec3 {
    from + (to - from) * (1.0 - (-decay_rate * dt.max(0.0)).exp())
}

/// Render-side camera. Runs on frame time, never feeds back into the simulation.
#[derive(Debug)]
pub struct PresentationCamera {
    config: CameraConfig,
    eye: Vec3,
    yaw: f32,
    pitch: f32,
    placed: bool,
}

impl Default for PresentationCamera {
    fn default() -> Self {
        Self::new(CameraConfig::default())
    }
}

impl PresentationCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            eye: Vec3::zeros(),
            yaw: 0.0,
            pitch: 0.0,
            placed: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    #[inline]
    pub fn is_third_person(&self) -> bool {
        self.config.third_person
    }

    pub fn set_third_person(&mut self, third_person: bool) {
        if self.config.third_person != third_person {
            self.config.third_person = third_person;
            self.placed = false;
        }
    }

    /// Where the eye wants to be for a pawn at `pawn_pos` looking along yaw/pitch.
    pub fn desired_eye(&self, pawn_pos: Vec3, yaw: f32, pitch: f32) -> Vec3 {
        if self.config.third_person {
            let pivot = pawn_pos + Vec3::new(0.0, self.config.height, 0.0);
            pivot - view_forward(yaw, pitch) * self.config.distance
        } else {
            pawn_pos + Vec3::new(0.0, self.config.eye_height, 0.0)
        }
    }

    /// Jump straight to the desired pose (first use, respawn, view switch).
    pub fn snap_to(&mut self, pawn_pos: Vec3, yaw: f32, pitch: f32) {
        self.eye = self.desired_eye(pawn_pos, yaw, pitch);
        self.yaw = yaw;
        self.pitch = pitch;
        self.placed = true;
    }

    /// Follow the pawn for one displayed frame. `yaw`/`pitch` already include any
    /// pending look preview.
    pub fn update(&mut self, pawn_pos: Vec3, yaw: f32, pitch: f32, frame_dt: f32) {
        if !self.placed {
            self.snap_to(pawn_pos, yaw, pitch);
            return;
        }
        let target = self.desired_eye(pawn_pos, yaw, pitch);
        self.eye = if self.config.third_person {
            smooth_nudge(self.eye, target, self.config.decay_rate, frame_dt)
        } else {
            target
        };
        self.yaw = yaw;
        self.pitch = pitch;
    }

    #[inline]
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        view_forward(self.yaw, self.pitch)
    }

    #[inline]
    pub fn yaw_pitch(&self) -> (f32, f32) {
        (self.yaw, self.pitch)
    }
}
