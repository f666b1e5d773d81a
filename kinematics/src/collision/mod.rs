/*!
Collision root module.

This module re-exports the submodules that implement the kinematic capsule
solver, using parry3d (through rapier3d) for narrow-phase queries and a uniform
grid for broad-phase acceleration. The code is split for clarity:

- types:         shared data types (CapsuleGeom, HitTarget, SweepHit, etc.)
- settings:      solver and tolerance constants
- spatial:       uniform-grid broad phase with a clearable extras layer
- world:         collider storage and the read-only SceneQuery surface
- narrow_phase:  thin wrappers over parry3d queries (shape casts, contacts)
- depenetration: phase A, push out of existing overlaps
- sweep:         phases B and C, vertical sweep and horizontal sweep-and-slide
- step_up:       phase D, single step-up attempt
- support:       phase E, downward support probe and snap
- solver:        the per-tick pipeline tying the phases together
- stats:         per-tick diagnostics
- legacy:        box-resolve cross-check (tests and `legacy-compare` only)
*/

pub mod depenetration;
pub mod narrow_phase;
pub mod settings;
pub mod solver;
pub mod spatial;
pub mod stats;
pub mod step_up;
pub mod support;
pub mod sweep;
pub mod types;
pub mod world;

#[cfg(any(test, feature = "legacy-compare"))]
pub mod legacy;

// Re-export commonly used types and functions.
pub use settings::SolverSettings;
pub use solver::{CapsuleMoveRequest, CapsuleMoveResult, solve};
pub use spatial::{GridLayout, SpatialIndex};
pub use stats::{CollisionStats, StepUpFail};
pub use types::{Aabb, CapsuleGeom, ColliderId, ColliderProps, FloorSlab, HitTarget, Point3, Vec3};
pub use world::{ColliderSource, SceneQuery, SceneView, WorldState};

/// Convenience: AABB from a center and half extents.
#[inline]
pub fn aabb_from_center(center: Vec3, half_extents: Vec3) -> Aabb {
    Aabb::new(Point3::from(center - half_extents), Point3::from(center + half_extents))
}
