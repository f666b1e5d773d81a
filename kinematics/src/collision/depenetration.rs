use super::{
    narrow_phase::{QueryScratch, deepest_penetration},
    settings::{MIN_PENETRATION, SolverSettings},
    stats::CollisionStats,
    types::{CapsuleGeom, Penetration, Vec3, aabb_inflate},
    world::SceneQuery,
};

/// Push the capsule out of any blocking geometry it already overlaps.
///
/// Each pass resolves the deepest overlap (real colliders and the floor) by moving
/// along its contact normal by `depth + skin`, capped at `max_depen_per_iteration`.
/// Passes stop once nothing overlaps or after `max_depen_iterations`; an overlap that
/// survives the last pass sets `depen_truncated`. A pose that is already free comes
/// back unchanged, so running this twice is a no-op the second time.
pub fn depenetrate<S: SceneQuery + ?Sized>(
    scene: &S,
    geom: &CapsuleGeom,
    settings: &SolverSettings,
    start: Vec3,
    scratch: &mut QueryScratch,
    stats: &mut CollisionStats,
) -> Vec3 {
    let mut pos = start;
    let mut clear = false;

    for _ in 0..settings.max_depen_iterations {
        let Some(pen) = deepest_overlap(scene, geom, settings, pos, scratch, stats) else {
            clear = true;
            break;
        };

        let mut push = pen.depth + settings.skin;
        if push > settings.max_depen_per_iteration {
            push = settings.max_depen_per_iteration;
            stats.depen_clamped = true;
        }

        pos += pen.push_dir * push;
        stats.depen_iterations += 1;
        stats.penetrations_resolved += 1;
    }

    if !clear && deepest_overlap(scene, geom, settings, pos, scratch, stats).is_some() {
        stats.depen_truncated = true;
        log::debug!(
            "overlap left after {} depenetration passes at ({:.2}, {:.2}, {:.2})",
            settings.max_depen_iterations,
            pos.x,
            pos.y,
            pos.z
        );
    }

    let moved = (pos - start).norm();
    if moved > 0.0 {
        stats.depen_applied = true;
        stats.depen_magnitude += moved;
    }
    pos
}

/// Deepest overlap worth resolving at `pos`.
fn deepest_overlap<S: SceneQuery + ?Sized>(
    scene: &S,
    geom: &CapsuleGeom,
    settings: &SolverSettings,
    pos: Vec3,
    scratch: &mut QueryScratch,
    stats: &mut CollisionStats,
) -> Option<Penetration> {
    let query = aabb_inflate(&geom.aabb_at(pos), settings.skin);
    scratch.gather(scene, &query, &mut stats.candidates_checked);
    deepest_penetration(geom, pos, &scratch.obstacles).filter(|pen| pen.depth > MIN_PENETRATION)
}
