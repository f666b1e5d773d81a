//! Display-only snapshot of a running session.

use std::fmt;

use crate::{
    action::ActionDebugState,
    collision::{CollisionStats, Vec3},
    driver::{FixedStepDriver, FrameReport, RespawnReason},
};

#[derive(Clone, Debug, PartialEq)]
pub struct HudSnapshot {
    pub frame: u64,
    pub step: u64,
    pub steps_this_frame: u32,
    pub accumulator_clamped: bool,

    pub position: Vec3,
    pub velocity: Vec3,
    pub speed: f32,
    pub on_ground: bool,
    pub yaw_deg: f32,
    pub pitch_deg: f32,

    pub respawn_count: u32,
    pub last_respawn: Option<RespawnReason>,

    pub stats: CollisionStats,
    pub actions: ActionDebugState,
}

impl HudSnapshot {
    /// Capture the driver state right after `report`'s frame.
    pub fn capture(driver: &FixedStepDriver, report: &FrameReport) -> Self {
        let sim = driver.simulation();
        let pawn = sim.pawn();
        let (yaw, pitch) = driver.view_angles();
        Self {
            frame: driver.frames(),
            step: sim.steps(),
            steps_this_frame: report.steps,
            accumulator_clamped: report.accumulator_clamped,
            position: pawn.position,
            velocity: pawn.velocity,
            speed: pawn.horizontal_speed(),
            on_ground: pawn.on_ground,
            yaw_deg: yaw.to_degrees(),
            pitch_deg: pitch.to_degrees(),
            respawn_count: sim.respawn_count(),
            last_respawn: sim.last_respawn(),
            stats: *sim.stats(),
            actions: driver.action_debug(),
        }
    }
}

impl fmt::Display for HudSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        let a = &self.actions;
        writeln!(
            f,
            "frame {} step {} (+{}{})",
            self.frame,
            self.step,
            self.steps_this_frame,
            if self.accumulator_clamped { ", clamped" } else { "" }
        )?;
        writeln!(
            f,
            "  pos ({:.3}, {:.3}, {:.3}) vel ({:.2}, {:.2}, {:.2}) speed {:.2} ground {}",
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
            self.speed,
            self.on_ground
        )?;
        writeln!(
            f,
            "  yaw {:.1} pitch {:.1} respawns {} ({})",
            self.yaw_deg,
            self.pitch_deg,
            self.respawn_count,
            self.last_respawn.map_or("-", RespawnReason::label)
        )?;
        writeln!(
            f,
            "  candidates {} depen {:.4} x{} resolved {}{}{} sweep_y {} @{:.3}{} sweep_xz {} @{:.3} slides {}{} pushes {}",
            s.candidates_checked,
            s.depen_magnitude,
            s.depen_iterations,
            s.penetrations_resolved,
            if s.depen_clamped { " clamped" } else { "" },
            if s.depen_truncated { " truncated" } else { "" },
            s.sweep_y_hit,
            s.sweep_y_toi,
            if s.sweep_y_deflected { " deflected" } else { "" },
            s.sweep_xz_hit,
            s.sweep_xz_toi,
            s.slide_iterations,
            if s.slide_truncated { " truncated" } else { "" },
            s.cleanup_pushes
        )?;
        writeln!(
            f,
            "  step_up {}/{} rise {:.3} fail [{}] passes {}{} support {} n.y {:.2} snap {:.4}{}{}",
            u32::from(s.step_up_succeeded),
            s.step_up_attempts,
            s.step_up_rise,
            s.step_up_fail_labels(),
            s.convergence_passes,
            if s.hit_max_iter { " max_iter" } else { "" },
            s.support_hit,
            s.support_normal_y,
            s.support_snap,
            if s.support_suppressed { " suppressed" } else { "" },
            if s.out_of_floor_bounds { " out_of_bounds" } else { "" }
        )?;
        write!(
            f,
            "  jump_buf {:.3} coyote {:.3} jumps {} zero_step_decay {:.4}{}",
            a.jump_buffer_remaining,
            a.coyote_remaining,
            a.jumps_fired_this_frame,
            a.zero_step_decay,
            if a.flushed_by_block { " flushed" } else { "" }
        )
    }
}
