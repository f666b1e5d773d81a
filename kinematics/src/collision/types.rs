/*!
Core collision types and math aliases shared by the collision submodules.

This module intentionally contains no algorithms. It defines the data types
exchanged between:
- the spatial index and scene query (candidate ids, AABBs, collider props)
- the narrow phase (parry time-of-impact and contact queries)
- the solver phases (depenetration, sweeps, step-up, support)
- diagnostics consumers (HUD snapshot)
*/

use nalgebra as na;
use rapier3d::parry::shape as pshape;

pub use rapier3d::parry::bounding_volume::Aabb;

/// Common math aliases for clarity and consistency.
pub type Vec3 = na::Vector3<f32>;
pub type Point3 = na::Point3<f32>;
pub type Iso = na::Isometry3<f32>;

/// Identifier of a real collider (grid cube or extras fixture).
///
/// Ids are dense: `0..N-1` where `N` is the number of colliders in the world.
/// "No hit" and "floor hit" are not encoded here; see [`HitTarget`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColliderId(pub u32);

impl ColliderId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for ColliderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a sweep, overlap or support probe ended up touching.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HitTarget {
    #[default]
    None,
    /// The world floor slab.
    Floor,
    Collider(ColliderId),
}

impl HitTarget {
    /// Rank used by the time-of-impact tie-break (lower wins).
    ///
    /// Real colliders rank by id; the floor ranks after every real collider and
    /// "no hit" ranks last.
    #[inline]
    pub fn tie_rank(self) -> u64 {
        match self {
            HitTarget::Collider(id) => id.0 as u64,
            HitTarget::Floor => u32::MAX as u64 - 1,
            HitTarget::None => u32::MAX as u64,
        }
    }

    #[inline]
    pub fn is_hit(self) -> bool {
        !matches!(self, HitTarget::None)
    }

    #[inline]
    pub fn collider(self) -> Option<ColliderId> {
        match self {
            HitTarget::Collider(id) => Some(id),
            _ => None,
        }
    }
}

impl std::fmt::Display for HitTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HitTarget::None => f.write_str("none"),
            HitTarget::Floor => f.write_str("floor"),
            HitTarget::Collider(id) => write!(f, "{id}"),
        }
    }
}

/// Per-collider surface properties consulted by the solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColliderProps {
    /// Participates in sweeps and depenetration.
    pub blocking: bool,
    /// Top face can support the pawn.
    pub walkable: bool,
    /// Top face can be climbed by step-up.
    pub stepable: bool,
}

impl ColliderProps {
    pub const SOLID: Self = Self {
        blocking: true,
        walkable: true,
        stepable: true,
    };
}

impl Default for ColliderProps {
    fn default() -> Self {
        Self::SOLID
    }
}

/// The world floor: a horizontal slab whose top is at `top_y`, centered on the
/// world origin in XZ. Everything below the top inside the bounds is solid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloorSlab {
    pub top_y: f32,
    pub half_x: f32,
    pub half_z: f32,
}

impl FloorSlab {
    /// Whether a point's XZ projection lies within the slab bounds.
    #[inline]
    pub fn contains_xz(&self, x: f32, z: f32) -> bool {
        x.abs() <= self.half_x && z.abs() <= self.half_z
    }
}

/// Capsule geometry of the pawn.
///
/// `half_height` is the half-length of the cylinder section (aligned with +Y),
/// so the total capsule height is `2*half_height + 2*radius`. The legacy
/// half-extents describe the box the pawn used to be before it became a
/// capsule; they feed the broad-phase and the legacy comparison path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CapsuleGeom {
    pub radius: f32,
    pub half_height: f32,
    pub legacy_half_extent_x: f32,
    pub legacy_half_extent_z: f32,
    pub legacy_height: f32,
}

impl CapsuleGeom {
    /// Capsule with legacy box extents derived from its own dimensions.
    pub fn new(radius: f32, half_height: f32) -> Self {
        Self {
            radius,
            half_height,
            legacy_half_extent_x: radius,
            legacy_half_extent_z: radius,
            legacy_height: 2.0 * (half_height + radius),
        }
    }

    /// Distance from the capsule center to its lowest point.
    #[inline]
    pub fn feet_offset(&self) -> f32 {
        self.half_height + self.radius
    }

    /// Parry shape for narrow-phase queries (Y-aligned).
    #[inline]
    pub fn shape(&self) -> pshape::Capsule {
        pshape::Capsule::new_y(self.half_height, self.radius)
    }

    /// World-space bounds of the capsule centered at `center`.
    pub fn aabb_at(&self, center: Vec3) -> Aabb {
        // The broad-phase box must cover both the capsule and the legacy box.
        let hx = self.radius.max(self.legacy_half_extent_x);
        let hz = self.radius.max(self.legacy_half_extent_z);
        let hy = self.feet_offset().max(self.legacy_height * 0.5);
        Aabb::new(
            Point3::new(center.x - hx, center.y - hy, center.z - hz),
            Point3::new(center.x + hx, center.y + hy, center.z + hz),
        )
    }
}

/// A single contact result returned by a time-of-impact (TOI) query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepHit {
    /// What was hit.
    pub target: HitTarget,
    /// Fraction (0..1) of the tested translation where the hit occurred.
    pub toi: f32,
    /// World-space unit normal of the obstacle surface, pointing toward the capsule.
    pub normal: Vec3,
}

/// A penetration found by an overlap query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Penetration {
    pub target: HitTarget,
    /// Positive penetration depth (meters).
    pub depth: f32,
    /// Unit direction that moves the capsule out of the obstacle.
    pub push_dir: Vec3,
}

/// Union of two AABBs.
#[inline]
pub fn aabb_union(a: &Aabb, b: &Aabb) -> Aabb {
    Aabb::new(
        Point3::new(
            a.mins.x.min(b.mins.x),
            a.mins.y.min(b.mins.y),
            a.mins.z.min(b.mins.z),
        ),
        Point3::new(
            a.maxs.x.max(b.maxs.x),
            a.maxs.y.max(b.maxs.y),
            a.maxs.z.max(b.maxs.z),
        ),
    )
}

/// Inflate an AABB by `margin` on all sides.
#[inline]
pub fn aabb_inflate(a: &Aabb, margin: f32) -> Aabb {
    if margin <= 0.0 {
        return *a;
    }
    let delta = Vec3::new(margin, margin, margin);
    Aabb::new(a.mins - delta, a.maxs + delta)
}

/// Closed-interval AABB overlap test.
#[inline]
pub fn aabb_intersects(a: &Aabb, b: &Aabb) -> bool {
    !(a.maxs.x < b.mins.x
        || a.mins.x > b.maxs.x
        || a.maxs.y < b.mins.y
        || a.mins.y > b.maxs.y
        || a.maxs.z < b.mins.z
        || a.mins.z > b.maxs.z)
}

/// AABB covering a capsule moving from `start` to `start + translation`, inflated by `margin`.
pub fn swept_capsule_aabb(geom: &CapsuleGeom, start: Vec3, translation: Vec3, margin: f32) -> Aabb {
    let a = geom.aabb_at(start);
    let b = geom.aabb_at(start + translation);
    aabb_inflate(&aabb_union(&a, &b), margin)
}
