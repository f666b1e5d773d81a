//! Per-tick solver diagnostics.
//!
//! [`CollisionStats`] is reset at the start of every fixed step and only read
//! afterwards (HUD, logs, tests). Nothing in the solver branches on it.

use crate::flags::FlagSet;

use super::types::{HitTarget, Vec3};

crate::define_flags!(StepUpFail, u16, {
    /// Ledge top is above the step limit.
    TooTall,
    /// Blocker's top cannot support the pawn.
    NotWalkable,
    /// Blocker is not flagged as climbable.
    NotStepable,
    /// Pawn was not grounded at the start of the tick.
    Airborne,
    /// Something above the pawn prevents the lift.
    CeilingBlocked,
    /// Still blocked after lifting and retrying.
    StillBlocked,
    /// Step-up already ran this tick.
    AlreadyAttempted,
    /// The horizontal blocker is not a real collider.
    NoBlocker,
});

impl StepUpFail {
    pub fn label(self) -> &'static str {
        match self {
            StepUpFail::TooTall => "too_tall",
            StepUpFail::NotWalkable => "not_walkable",
            StepUpFail::NotStepable => "not_stepable",
            StepUpFail::Airborne => "airborne",
            StepUpFail::CeilingBlocked => "ceiling_blocked",
            StepUpFail::StillBlocked => "still_blocked",
            StepUpFail::AlreadyAttempted => "already_attempted",
            StepUpFail::NoBlocker => "no_blocker",
        }
    }
}

pub type StepUpFailMask = FlagSet<u16>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionStats {
    /// Raw broad-phase candidates inspected across every query this tick.
    pub candidates_checked: u32,

    // Phase A
    pub depen_applied: bool,
    pub depen_magnitude: f32,
    pub depen_iterations: u32,
    pub depen_clamped: bool,
    /// Overlap remained after the last allowed pass.
    pub depen_truncated: bool,
    pub penetrations_resolved: u32,
    /// Pose after depenetration.
    pub depen_position: Vec3,

    // Phase B
    pub sweep_y_hit: HitTarget,
    pub sweep_y_toi: f32,
    pub sweep_y_deflected: bool,
    /// Pose after the vertical sweep.
    pub sweep_y_position: Vec3,

    // Phase C
    pub sweep_xz_hit: HitTarget,
    pub sweep_xz_toi: f32,
    pub slide_iterations: u32,
    /// Motion was still left when the slide iteration cap ran out.
    pub slide_truncated: bool,
    pub cleanup_pushes: u32,

    // Phase D
    pub step_up_attempts: u32,
    pub step_up_succeeded: bool,
    pub step_up_fail: StepUpFailMask,
    pub step_up_rise: f32,

    // Phase E
    pub convergence_passes: u32,
    pub hit_max_iter: bool,
    pub support_queries: u32,
    pub support_suppressed: bool,
    pub support_hit: HitTarget,
    pub support_normal_y: f32,
    pub support_snap: f32,

    pub out_of_floor_bounds: bool,
}

impl Default for CollisionStats {
    fn default() -> Self {
        Self {
            candidates_checked: 0,
            depen_applied: false,
            depen_magnitude: 0.0,
            depen_iterations: 0,
            depen_clamped: false,
            depen_truncated: false,
            penetrations_resolved: 0,
            depen_position: Vec3::zeros(),
            sweep_y_hit: HitTarget::None,
            sweep_y_toi: 1.0,
            sweep_y_deflected: false,
            sweep_y_position: Vec3::zeros(),
            sweep_xz_hit: HitTarget::None,
            sweep_xz_toi: 1.0,
            slide_iterations: 0,
            slide_truncated: false,
            cleanup_pushes: 0,
            step_up_attempts: 0,
            step_up_succeeded: false,
            step_up_fail: StepUpFailMask::default(),
            step_up_rise: 0.0,
            convergence_passes: 0,
            hit_max_iter: false,
            support_queries: 0,
            support_suppressed: false,
            support_hit: HitTarget::None,
            support_normal_y: 0.0,
            support_snap: 0.0,
            out_of_floor_bounds: false,
        }
    }
}

impl CollisionStats {
    /// Comma-separated labels of the step-up fail bits, or `-` when none are set.
    pub fn step_up_fail_labels(&self) -> String {
        let labels: Vec<&str> = self
            .step_up_fail
            .iter_set(StepUpFail::ALL)
            .map(StepUpFail::label)
            .collect();
        if labels.is_empty() {
            "-".to_owned()
        } else {
            labels.join(",")
        }
    }
}
