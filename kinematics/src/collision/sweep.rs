use super::{
    narrow_phase::{QueryScratch, deepest_penetration_where, earliest_hit},
    settings::{DIST_EPS, MIN_GROUND_NORMAL_Y, MIN_MOVE_SQ, MIN_PENETRATION, SolverSettings},
    stats::CollisionStats,
    types::{CapsuleGeom, SweepHit, Vec3, aabb_inflate, swept_capsule_aabb},
    world::SceneQuery,
};

/// Smallest horizontal share of a contact normal that cleanup will push along.
const MIN_XZ_NORMAL: f32 = 1.0e-3;

/// Outcome of the vertical sweep.
#[derive(Clone, Copy, Debug)]
pub struct VerticalSweep {
    pub pos: Vec3,
    pub hit: Option<SweepHit>,
    /// A fall met a surface too steep to stand on and slid along it.
    pub deflected: bool,
}

/// Sweep the capsule along Y by `dy`.
///
/// The nearest blocking surface (with the time-of-impact tie-break) clamps the
/// displacement to the contact minus `skin`. Without a hit the full `dy` is applied.
///
/// A fall that lands on a steep contact, typically a box edge under one side of the
/// lower hemisphere, spends the rest of `dy` sliding along the contact plane so the
/// capsule slips off instead of hanging there.
pub fn sweep_y<S: SceneQuery + ?Sized>(
    scene: &S,
    geom: &CapsuleGeom,
    settings: &SolverSettings,
    start: Vec3,
    dy: f32,
    scratch: &mut QueryScratch,
    stats: &mut CollisionStats,
) -> VerticalSweep {
    let motion = Vec3::new(0.0, dy, 0.0);
    if dy * dy <= MIN_MOVE_SQ {
        return VerticalSweep {
            pos: start,
            hit: None,
            deflected: false,
        };
    }

    let swept = swept_capsule_aabb(geom, start, motion, settings.skin);
    scratch.gather(scene, &swept, &mut stats.candidates_checked);

    match earliest_hit(geom, start, motion, &scratch.obstacles, settings.toi_tie_epsilon) {
        None => VerticalSweep {
            pos: start + motion,
            hit: None,
            deflected: false,
        },
        Some(hit) => {
            let travel = (dy.abs() * hit.toi - settings.skin).max(0.0);
            stats.sweep_y_hit = hit.target;
            stats.sweep_y_toi = hit.toi;
            let mut pos = start + Vec3::new(0.0, travel.copysign(dy), 0.0);

            let deflected = dy < 0.0 && hit.normal.y < MIN_GROUND_NORMAL_Y;
            if deflected {
                let leftover = Vec3::new(0.0, -(dy.abs() - travel), 0.0);
                let slide = leftover - hit.normal * leftover.dot(&hit.normal);
                pos = deflect(scene, geom, settings, pos, slide, scratch, stats);
                stats.sweep_y_deflected = true;
            }
            VerticalSweep {
                pos,
                hit: Some(hit),
                deflected,
            }
        }
    }
}

/// Single sweep along `slide`, stopping a skin short of whatever it meets.
fn deflect<S: SceneQuery + ?Sized>(
    scene: &S,
    geom: &CapsuleGeom,
    settings: &SolverSettings,
    start: Vec3,
    slide: Vec3,
    scratch: &mut QueryScratch,
    stats: &mut CollisionStats,
) -> Vec3 {
    let len_sq = slide.norm_squared();
    if len_sq <= MIN_MOVE_SQ {
        return start;
    }
    let swept = swept_capsule_aabb(geom, start, slide, settings.skin);
    scratch.gather(scene, &swept, &mut stats.candidates_checked);
    match earliest_hit(geom, start, slide, &scratch.obstacles, settings.toi_tie_epsilon) {
        None => start + slide,
        Some(hit) => {
            let len = len_sq.sqrt();
            let travel = (len * hit.toi - settings.skin).max(0.0);
            start + slide * (travel / len)
        }
    }
}

/// Outcome of the horizontal sweep-and-slide.
#[derive(Clone, Copy, Debug)]
pub struct HorizontalSweep {
    pub pos: Vec3,
    /// Horizontal velocity with every blocking normal projected out.
    pub velocity_xz: Vec3,
    /// First surface that stopped the motion.
    pub blocker: Option<SweepHit>,
    /// Pose at the first contact, before any sliding.
    pub blocked_at: Vec3,
    /// Motion left over at the first contact, in its original direction.
    pub blocked_leftover: Vec3,
}

/// Sweep-and-slide in the XZ plane.
///
/// On each hit the capsule advances to the contact minus `skin` and the leftover
/// motion loses its component along the horizontal part of the contact normal, which
/// lets the capsule slide along walls. Iterates up to `max_slide_iterations` for
/// corners; motion still left after the last iteration sets `slide_truncated`.
/// Y never changes here.
pub fn sweep_xz<S: SceneQuery + ?Sized>(
    scene: &S,
    geom: &CapsuleGeom,
    settings: &SolverSettings,
    start: Vec3,
    motion: Vec3,
    velocity_xz: Vec3,
    scratch: &mut QueryScratch,
    stats: &mut CollisionStats,
) -> HorizontalSweep {
    let mut pos = start;
    let mut remaining = Vec3::new(motion.x, 0.0, motion.z);
    let mut velocity = Vec3::new(velocity_xz.x, 0.0, velocity_xz.z);
    let mut out = HorizontalSweep {
        pos,
        velocity_xz: velocity,
        blocker: None,
        blocked_at: start,
        blocked_leftover: Vec3::zeros(),
    };

    let mut settled = false;
    for _ in 0..settings.max_slide_iterations {
        if remaining.norm_squared() <= MIN_MOVE_SQ {
            settled = true;
            break;
        }
        stats.slide_iterations += 1;

        let len = remaining.norm();
        let dir = remaining / len;

        let swept = swept_capsule_aabb(geom, pos, remaining, settings.skin);
        scratch.gather(scene, &swept, &mut stats.candidates_checked);

        let Some(hit) = earliest_hit(geom, pos, remaining, &scratch.obstacles, settings.toi_tie_epsilon) else {
            pos += remaining;
            settled = true;
            break;
        };

        let travel = (len * hit.toi).max(0.0);
        pos += dir * (travel - settings.skin).max(0.0);
        let leftover = dir * (len - travel);

        if out.blocker.is_none() {
            out.blocker = Some(hit);
            out.blocked_at = pos;
            out.blocked_leftover = leftover;
            stats.sweep_xz_hit = hit.target;
            stats.sweep_xz_toi = hit.toi;
        }

        // Only the horizontal part of the normal takes part in sliding.
        let n = Vec3::new(hit.normal.x, 0.0, hit.normal.z);
        let n_len = n.norm();
        if n_len <= DIST_EPS {
            settled = true;
            break;
        }
        let n = n / n_len;

        remaining = leftover - n * leftover.dot(&n);
        let into = velocity.dot(&n);
        if into < 0.0 {
            velocity -= n * into;
        }
    }

    if !settled && remaining.norm_squared() > MIN_MOVE_SQ {
        stats.slide_truncated = true;
        log::trace!("slide stopped after {} iterations", settings.max_slide_iterations);
    }

    out.pos = pos;
    out.velocity_xz = velocity;
    out
}

/// One cleanup pass: resolve the deepest remaining overlap using only the XZ part of
/// its contact normal. Returns whether a push was applied.
///
/// Overlaps whose normal is (nearly) vertical are left alone; Y belongs to the
/// vertical sweep.
pub fn cleanup_xz_pass<S: SceneQuery + ?Sized>(
    scene: &S,
    geom: &CapsuleGeom,
    settings: &SolverSettings,
    pos: &mut Vec3,
    scratch: &mut QueryScratch,
    stats: &mut CollisionStats,
) -> bool {
    let query = aabb_inflate(&geom.aabb_at(*pos), settings.skin);
    scratch.gather(scene, &query, &mut stats.candidates_checked);

    let Some(pen) = deepest_penetration_where(geom, *pos, &scratch.obstacles, |p| {
        Vec3::new(p.push_dir.x, 0.0, p.push_dir.z).norm() > MIN_XZ_NORMAL
    }) else {
        return false;
    };
    if pen.depth <= MIN_PENETRATION {
        return false;
    }

    let n = Vec3::new(pen.push_dir.x, 0.0, pen.push_dir.z);
    let n_len = n.norm();
    // Moving along the horizontal projection needs a longer push to clear the same depth.
    let push = ((pen.depth + settings.skin) / n_len).min(settings.max_depen_per_iteration);
    pos.x += n.x / n_len * push;
    pos.z += n.z / n_len * push;
    stats.cleanup_pushes += 1;
    true
}
