//! Frame-to-step input buffering.
//!
//! A displayed frame can run zero, one or several fixed steps. [`ActionBuffer`]
//! sits between the raw per-frame sample ([`FrameInput`]) and the per-step packet
//! the simulation consumes ([`StepIntent`]):
//!
//! - `stage_frame_intent` once per frame, before any step,
//! - `build_step_intent` once per fixed step (index 0, 1, 2, ...),
//! - `finalize_frame_intent` once per frame, after the steps.
//!
//! A jump press is buffered for `jump_buffer_seconds` and may only fire on step 0,
//! so one press never fires twice in a multi-step frame. Leaving the ground opens a
//! coyote window of `coyote_seconds`. Timers decay by the fixed timestep on every
//! step, or by the frame time exactly once when no step ran.

use crate::constants::{
    COYOTE_SECONDS, JUMP_BUFFER_SECONDS, KEYBOARD_YAW_RATE, MOUSE_SENSITIVITY_FIRST_PERSON,
    MOUSE_SENSITIVITY_THIRD_PERSON,
};

/// Raw input sample for one displayed frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Strafe axis, -1 (left) .. 1 (right).
    pub move_x: f32,
    /// Forward axis, -1 (back) .. 1 (forward).
    pub move_z: f32,
    /// Keyboard turn axis, -1 (right) .. 1 (left).
    pub yaw_axis: f32,
    /// Mouse motion since the last frame, in counts.
    pub mouse_dx: f32,
    pub mouse_dy: f32,
    /// Jump key went down this frame.
    pub jump_pressed: bool,
    pub sprint_held: bool,
    /// A UI overlay owns the keyboard or mouse this frame.
    pub ui_captures_keyboard: bool,
    pub ui_captures_mouse: bool,
}

impl FrameInput {
    #[inline]
    pub fn ui_blocked(&self) -> bool {
        self.ui_captures_keyboard || self.ui_captures_mouse
    }
}

/// What the simulation should do during one fixed step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepIntent {
    pub step_index: u32,
    pub move_x: f32,
    pub move_z: f32,
    /// Yaw change for this step (radians, counter-clockwise seen from above).
    pub yaw_delta: f32,
    /// Pitch change for this step (radians, positive looks up).
    pub pitch_delta: f32,
    pub jump: bool,
    pub sprint: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActionConfig {
    pub jump_buffer_seconds: f32,
    pub coyote_seconds: f32,
    pub mouse_sensitivity_first_person: f32,
    pub mouse_sensitivity_third_person: f32,
    pub keyboard_yaw_rate: f32,
    pub invert_y: bool,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            jump_buffer_seconds: JUMP_BUFFER_SECONDS,
            coyote_seconds: COYOTE_SECONDS,
            mouse_sensitivity_first_person: MOUSE_SENSITIVITY_FIRST_PERSON,
            mouse_sensitivity_third_person: MOUSE_SENSITIVITY_THIRD_PERSON,
            keyboard_yaw_rate: KEYBOARD_YAW_RATE,
            invert_y: false,
        }
    }
}

impl ActionConfig {
    /// Builder: set the jump buffer duration.
    pub fn with_jump_buffer_seconds(mut self, seconds: f32) -> Self {
        self.jump_buffer_seconds = seconds;
        self
    }

    /// Builder: set the coyote window.
    pub fn with_coyote_seconds(mut self, seconds: f32) -> Self {
        self.coyote_seconds = seconds;
        self
    }

    /// Builder: invert vertical mouse look.
    pub fn with_invert_y(mut self, invert: bool) -> Self {
        self.invert_y = invert;
        self
    }

    #[inline]
    fn mouse_sensitivity(&self, third_person: bool) -> f32 {
        if third_person {
            self.mouse_sensitivity_third_person
        } else {
            self.mouse_sensitivity_first_person
        }
    }
}

/// Read-only snapshot of the buffer, published once per frame for the HUD.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionDebugState {
    pub jump_buffer_remaining: f32,
    pub coyote_remaining: f32,
    pub jump_fired_this_frame: bool,
    /// Number of step intents with `jump == true` this frame (0 or 1).
    pub jumps_fired_this_frame: u32,
    pub steps_this_frame: u32,
    /// Frame time applied to the timers because no step ran.
    pub zero_step_decay: f32,
    pub blocked: bool,
    pub flushed_by_block: bool,
    pub pending_mouse_dx: f32,
    pub pending_mouse_dy: f32,
}

#[derive(Debug, Default)]
pub struct ActionBuffer {
    config: ActionConfig,

    move_x: f32,
    move_z: f32,
    yaw_axis: f32,
    sprint: bool,
    pending_mouse_dx: f32,
    pending_mouse_dy: f32,

    jump_buffer: f32,
    coyote: f32,

    blocked: bool,
    flushed_by_block: bool,
    jumps_fired: u32,
    steps: u32,
    zero_step_decay: f32,

    published: ActionDebugState,
}

impl ActionBuffer {
    pub fn new(config: ActionConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    #[inline]
    pub fn config(&self) -> &ActionConfig {
        &self.config
    }

    /// Latch this frame's axes and look motion; (re)start the jump buffer on a press.
    ///
    /// A blocked frame flushes the jump buffer, the coyote timer and pending look, so
    /// nothing fires the moment the overlay lets go.
    pub fn stage_frame_intent(&mut self, input: &FrameInput, blocked: bool) {
        self.jumps_fired = 0;
        self.steps = 0;
        self.zero_step_decay = 0.0;
        self.flushed_by_block = false;
        self.blocked = blocked;

        if blocked {
            self.move_x = 0.0;
            self.move_z = 0.0;
            self.yaw_axis = 0.0;
            self.sprint = false;
            self.pending_mouse_dx = 0.0;
            self.pending_mouse_dy = 0.0;
            self.jump_buffer = 0.0;
            self.coyote = 0.0;
            self.flushed_by_block = true;
            return;
        }

        self.move_x = input.move_x.clamp(-1.0, 1.0);
        self.move_z = input.move_z.clamp(-1.0, 1.0);
        self.yaw_axis = input.yaw_axis.clamp(-1.0, 1.0);
        self.sprint = input.sprint_held;
        self.pending_mouse_dx += input.mouse_dx;
        self.pending_mouse_dy += input.mouse_dy;

        if input.jump_pressed {
            self.jump_buffer = self.config.jump_buffer_seconds;
        }
    }

    /// Build the intent for fixed step `step_index` of the current frame.
    ///
    /// Order within a step: evaluate the jump, decay both timers by `fixed_dt`, then
    /// refresh the coyote window if grounded. The jump fires only on step 0, with a
    /// buffered press, while grounded or inside the coyote window; firing consumes
    /// both timers. Mouse look is consumed on step 0; keyboard yaw applies every step.
    pub fn build_step_intent(
        &mut self,
        on_ground: bool,
        fixed_dt: f32,
        step_index: u32,
        is_third_person: bool,
    ) -> StepIntent {
        self.steps += 1;

        let mut intent = StepIntent {
            step_index,
            move_x: self.move_x,
            move_z: self.move_z,
            yaw_delta: self.yaw_axis * self.config.keyboard_yaw_rate * fixed_dt,
            pitch_delta: 0.0,
            jump: false,
            sprint: self.sprint,
        };

        if step_index == 0 {
            let sens = self.config.mouse_sensitivity(is_third_person);
            let (yaw, pitch) = self.look_from_mouse(sens);
            intent.yaw_delta += yaw;
            intent.pitch_delta += pitch;
            self.pending_mouse_dx = 0.0;
            self.pending_mouse_dy = 0.0;

            let ground_available = on_ground || self.coyote > 0.0;
            if self.jump_buffer > 0.0 && ground_available {
                intent.jump = true;
                self.jump_buffer = 0.0;
                self.coyote = 0.0;
                self.jumps_fired += 1;
            }
        }

        self.decay(fixed_dt);
        if on_ground && !intent.jump {
            self.coyote = self.config.coyote_seconds;
        }

        intent
    }

    /// Close the frame. When no step ran, the timers decay by the frame time once;
    /// otherwise they were already decayed per step and are left alone.
    pub fn finalize_frame_intent(&mut self, step_count: u32, frame_dt: f32) {
        debug_assert_eq!(step_count, self.steps, "step count disagrees with built intents");
        if step_count == 0 && !self.blocked {
            self.decay(frame_dt);
            self.zero_step_decay = frame_dt.max(0.0);
        }
        self.published = self.snapshot();
    }

    /// Look offset `(yaw, pitch)` that the pending mouse motion would apply, without
    /// consuming it. Zero while input is blocked.
    pub fn pending_look_preview_rad(&self, is_third_person: bool) -> (f32, f32) {
        if self.blocked {
            return (0.0, 0.0);
        }
        self.look_from_mouse(self.config.mouse_sensitivity(is_third_person))
    }

    /// Clear every buffer, timer and diagnostic.
    pub fn reset_all_state(&mut self) {
        *self = Self::new(self.config);
    }

    /// Snapshot published by the last `finalize_frame_intent`.
    #[inline]
    pub fn debug_state(&self) -> ActionDebugState {
        self.published
    }

    #[inline]
    pub fn jump_buffer_remaining(&self) -> f32 {
        self.jump_buffer
    }

    #[inline]
    pub fn coyote_remaining(&self) -> f32 {
        self.coyote
    }

    fn look_from_mouse(&self, sensitivity: f32) -> (f32, f32) {
        let yaw = -self.pending_mouse_dx * sensitivity;
        let mut pitch = -self.pending_mouse_dy * sensitivity;
        if self.config.invert_y {
            pitch = -pitch;
        }
        (yaw, pitch)
    }

    fn decay(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.jump_buffer = (self.jump_buffer - dt).max(0.0);
        self.coyote = (self.coyote - dt).max(0.0);
    }

    fn snapshot(&self) -> ActionDebugState {
        ActionDebugState {
            jump_buffer_remaining: self.jump_buffer,
            coyote_remaining: self.coyote,
            jump_fired_this_frame: self.jumps_fired > 0,
            jumps_fired_this_frame: self.jumps_fired,
            steps_this_frame: self.steps,
            zero_step_decay: self.zero_step_decay,
            blocked: self.blocked,
            flushed_by_block: self.flushed_by_block,
            pending_mouse_dx: self.pending_mouse_dx,
            pending_mouse_dy: self.pending_mouse_dy,
        }
    }
}
