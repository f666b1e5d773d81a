//! Cross-check of the vertical sweep against the older box-based axis resolve.
//!
//! Before the capsule sweep existed the pawn was an axis-aligned box and vertical
//! motion was resolved by moving the box along Y and clamping it against every
//! overlapping collider. [`LegacyAxisProbe`] replays that resolve after each tick
//! and reports when the two disagree by more than a tolerance. Compiled only for
//! tests and the `legacy-compare` feature.

use super::{
    narrow_phase::{Obstacle, gather_obstacles},
    solver::CapsuleMoveRequest,
    stats::CollisionStats,
    types::{Aabb, ColliderId, Point3, Vec3, aabb_intersects, aabb_union},
    world::SceneQuery,
};

/// Default allowed gap between the swept and the legacy Y (meters).
pub const LEGACY_Y_TOLERANCE: f32 = 0.05;

/// Secondary solver strategy compared against the live one every tick.
pub trait EquivalenceProbe {
    /// Inspect one finished tick. Returns the divergence when it exceeds tolerance.
    fn observe(&mut self, scene: &dyn SceneQuery, req: &CapsuleMoveRequest, stats: &CollisionStats) -> Option<f32>;

    /// Number of ticks that diverged so far.
    fn divergences(&self) -> u32;
}

#[derive(Debug)]
pub struct LegacyAxisProbe {
    pub tolerance: f32,
    divergences: u32,
    candidates: Vec<ColliderId>,
    obstacles: Vec<Obstacle>,
}

impl Default for LegacyAxisProbe {
    fn default() -> Self {
        Self::new(LEGACY_Y_TOLERANCE)
    }
}

impl LegacyAxisProbe {
    pub fn new(tolerance: f32) -> Self {
        Self {
            tolerance,
            divergences: 0,
            candidates: Vec::new(),
            obstacles: Vec::new(),
        }
    }

    fn legacy_box(req: &CapsuleMoveRequest, center: Vec3) -> Aabb {
        let g = &req.geom;
        let half = Vec3::new(g.legacy_half_extent_x, g.legacy_height * 0.5, g.legacy_half_extent_z);
        Aabb::new(Point3::from(center - half), Point3::from(center + half))
    }

    /// Move the legacy box by `dy` and clamp it against every overlapping obstacle.
    pub fn resolve_axis_y(&mut self, scene: &dyn SceneQuery, req: &CapsuleMoveRequest, start: Vec3, dy: f32) -> f32 {
        let half_y = req.geom.legacy_height * 0.5;
        let mut y = start.y + dy;
        let moved = Self::legacy_box(req, Vec3::new(start.x, y, start.z));
        let query = aabb_union(&Self::legacy_box(req, start), &moved);
        gather_obstacles(scene, &query, &mut self.candidates, &mut self.obstacles);

        for ob in &self.obstacles {
            let now = Self::legacy_box(req, Vec3::new(start.x, y, start.z));
            // Touching faces are not overlaps.
            let shrunk = Aabb::new(
                now.mins + Vec3::repeat(1.0e-4),
                now.maxs - Vec3::repeat(1.0e-4),
            );
            if !aabb_intersects(&shrunk, &ob.aabb) {
                continue;
            }
            if dy < 0.0 {
                y = y.max(ob.aabb.maxs.y + half_y);
            } else {
                y = y.min(ob.aabb.mins.y - half_y);
            }
        }
        y
    }
}

impl EquivalenceProbe for LegacyAxisProbe {
    fn observe(&mut self, scene: &dyn SceneQuery, req: &CapsuleMoveRequest, stats: &CollisionStats) -> Option<f32> {
        let dy = req.velocity.y * req.dt;
        // The box resolve has no notion of slipping off an edge.
        if dy == 0.0 || stats.sweep_y_deflected {
            return None;
        }
        let legacy_y = self.resolve_axis_y(scene, req, stats.depen_position, dy);
        let diff = (legacy_y - stats.sweep_y_position.y).abs();
        if diff > self.tolerance {
            self.divergences += 1;
            log::warn!(
                "legacy Y resolve diverged by {diff:.4} (sweep {:.4}, legacy {legacy_y:.4}, hit {})",
                stats.sweep_y_position.y,
                stats.sweep_y_hit
            );
            return Some(diff);
        }
        None
    }

    fn divergences(&self) -> u32 {
        self.divergences
    }
}
