use rapier3d::parry::{
    query::{self, ShapeCastOptions},
    shape as pshape,
};

use super::{
    settings::{DIST_EPS, GRAZE_EPS},
    types::{Aabb, CapsuleGeom, ColliderId, HitTarget, Iso, Penetration, Point3, SweepHit, Vec3, aabb_intersects},
    world::SceneQuery,
};

/// Thickness of the solid region under the floor top (meters).
pub const FLOOR_SLAB_THICKNESS: f32 = 2.0;

/// A blocking box gathered for one query, tagged with what it represents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub target: HitTarget,
    pub aabb: Aabb,
}

/// Collect blocking obstacles near `query_aabb` in tie-break order.
///
/// Real colliders come first, sorted by id (the scene query returns them sorted and
/// deduplicated), followed by the floor slab when it overlaps. Non-blocking
/// colliders and candidates whose exact bounds miss `query_aabb` are dropped.
/// Returns the number of raw candidates inspected, for diagnostics.
pub fn gather_obstacles<S: SceneQuery + ?Sized>(
    scene: &S,
    query_aabb: &Aabb,
    candidates: &mut Vec<ColliderId>,
    out: &mut Vec<Obstacle>,
) -> u32 {
    out.clear();
    scene.query_candidates(query_aabb, candidates);
    debug_assert!(
        candidates.windows(2).all(|w| w[0] < w[1]),
        "scene query must return sorted, unique candidates"
    );

    for &id in candidates.iter() {
        if !scene.collider_props(id).blocking {
            continue;
        }
        let aabb = scene.collider_aabb(id);
        if aabb_intersects(&aabb, query_aabb) {
            out.push(Obstacle {
                target: HitTarget::Collider(id),
                aabb,
            });
        }
    }

    if let Some(floor) = scene.floor() {
        let aabb = Aabb::new(
            Point3::new(-floor.half_x, floor.top_y - FLOOR_SLAB_THICKNESS, -floor.half_z),
            Point3::new(floor.half_x, floor.top_y, floor.half_z),
        );
        if aabb_intersects(&aabb, query_aabb) {
            out.push(Obstacle {
                target: HitTarget::Floor,
                aabb,
            });
        }
    }

    candidates.len() as u32
}

/// Reusable buffers for the broad-phase gathers of one tick.
#[derive(Default)]
pub struct QueryScratch {
    pub candidates: Vec<ColliderId>,
    pub obstacles: Vec<Obstacle>,
}

impl QueryScratch {
    /// Refill `obstacles` for `query_aabb`, counting raw candidates into `checked`.
    pub fn gather<S: SceneQuery + ?Sized>(&mut self, scene: &S, query_aabb: &Aabb, checked: &mut u32) -> &[Obstacle] {
        *checked += gather_obstacles(scene, query_aabb, &mut self.candidates, &mut self.obstacles);
        &self.obstacles
    }

    /// Bounds of a gathered obstacle by target.
    pub fn obstacle_aabb(&self, target: HitTarget) -> Option<Aabb> {
        self.obstacles.iter().find(|o| o.target == target).map(|o| o.aabb)
    }
}

#[inline]
fn translation_iso(p: Vec3) -> Iso {
    Iso::translation(p.x, p.y, p.z)
}

#[inline]
fn box_pose(aabb: &Aabb) -> (pshape::Cuboid, Iso) {
    let c = aabb.center();
    (
        pshape::Cuboid::new(aabb.half_extents()),
        Iso::translation(c.x, c.y, c.z),
    )
}

/// Cast the Y-aligned capsule centered at `pos` along `translation` against one box.
///
/// Returns the fraction of `translation` at the first contact and the obstacle normal
/// (pointing back toward the capsule). Grazing contacts, whose normal barely opposes
/// the motion, are not reported: they cannot stop the capsule and would otherwise
/// pin it to surfaces it is sliding along.
pub fn cast_capsule_against_box(
    geom: &CapsuleGeom,
    pos: Vec3,
    translation: Vec3,
    aabb: &Aabb,
) -> Option<(f32, Vec3)> {
    let len_sq = translation.norm_squared();
    if len_sq <= 0.0 {
        return None;
    }
    let dir = translation / len_sq.sqrt();

    let capsule = geom.shape();
    let (cuboid, box_iso) = box_pose(aabb);

    let mut opts = ShapeCastOptions::with_max_time_of_impact(1.0);
    opts.stop_at_penetration = true;
    let hit = query::cast_shapes(
        &translation_iso(pos),
        &translation,
        &capsule as &dyn pshape::Shape,
        &box_iso,
        &Vec3::zeros(),
        &cuboid as &dyn pshape::Shape,
        opts,
    )
    .ok()??;

    // `normal1` is the capsule's outward normal; both shapes are unrotated so the
    // local frame matches world axes.
    let toward_obstacle = hit.normal1.into_inner();
    if toward_obstacle.dot(&dir) <= GRAZE_EPS {
        return None;
    }
    Some((hit.time_of_impact.clamp(0.0, 1.0), -toward_obstacle))
}

/// Earliest blocking hit of a capsule sweep over `obstacles`, applying the
/// time-of-impact tie-break.
pub fn earliest_hit(
    geom: &CapsuleGeom,
    pos: Vec3,
    translation: Vec3,
    obstacles: &[Obstacle],
    tie_epsilon: f32,
) -> Option<SweepHit> {
    earliest_hit_where(geom, pos, translation, obstacles, tie_epsilon, |_| true)
}

/// Earliest hit among those accepted by `keep`.
pub fn earliest_hit_where(
    geom: &CapsuleGeom,
    pos: Vec3,
    translation: Vec3,
    obstacles: &[Obstacle],
    tie_epsilon: f32,
    keep: impl Fn(&SweepHit) -> bool,
) -> Option<SweepHit> {
    let mut best: Option<SweepHit> = None;
    for ob in obstacles {
        if let Some((toi, normal)) = cast_capsule_against_box(geom, pos, translation, &ob.aabb) {
            let hit = SweepHit {
                target: ob.target,
                toi,
                normal,
            };
            if !keep(&hit) {
                continue;
            }
            best = Some(match best {
                Some(b) => prefer_hit(b, hit, tie_epsilon),
                None => hit,
            });
        }
    }
    best
}

/// Pick the winning hit of two: earlier time of impact, or on a tie (within
/// `tie_epsilon`) the lower-ranked target. The result does not depend on argument order.
#[inline]
pub fn prefer_hit(a: SweepHit, b: SweepHit, tie_epsilon: f32) -> SweepHit {
    if (a.toi - b.toi).abs() <= tie_epsilon {
        if b.target.tie_rank() < a.target.tie_rank() { b } else { a }
    } else if b.toi < a.toi {
        b
    } else {
        a
    }
}

/// Overlap between the capsule centered at `pos` and one box, if any.
pub fn capsule_box_penetration(geom: &CapsuleGeom, pos: Vec3, ob: &Obstacle) -> Option<Penetration> {
    let capsule = geom.shape();
    let (cuboid, box_iso) = box_pose(&ob.aabb);

    let contact = query::contact(
        &translation_iso(pos),
        &capsule as &dyn pshape::Shape,
        &box_iso,
        &cuboid as &dyn pshape::Shape,
        0.0,
    )
    .ok()??;

    if contact.dist >= 0.0 {
        return None;
    }
    // `normal1` points from the capsule toward the box; push the other way.
    Some(Penetration {
        target: ob.target,
        depth: -contact.dist,
        push_dir: -contact.normal1.into_inner(),
    })
}

/// Deepest overlap among `obstacles` (ties resolved by target rank).
pub fn deepest_penetration(geom: &CapsuleGeom, pos: Vec3, obstacles: &[Obstacle]) -> Option<Penetration> {
    deepest_penetration_where(geom, pos, obstacles, |_| true)
}

/// Deepest overlap among `obstacles` accepted by `keep`.
pub fn deepest_penetration_where(
    geom: &CapsuleGeom,
    pos: Vec3,
    obstacles: &[Obstacle],
    keep: impl Fn(&Penetration) -> bool,
) -> Option<Penetration> {
    let mut best: Option<Penetration> = None;
    for ob in obstacles {
        let Some(p) = capsule_box_penetration(geom, pos, ob) else {
            continue;
        };
        if !keep(&p) {
            continue;
        }
        let replace = match best {
            None => true,
            Some(b) => {
                p.depth > b.depth + DIST_EPS
                    || ((p.depth - b.depth).abs() <= DIST_EPS && p.target.tie_rank() < b.target.tie_rank())
            }
        };
        if replace {
            best = Some(p);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geom() -> CapsuleGeom {
        CapsuleGeom::new(0.5, 0.5)
    }

    fn wall(id: u32, min_x: f32) -> Obstacle {
        Obstacle {
            target: HitTarget::Collider(ColliderId(id)),
            aabb: Aabb::new(Point3::new(min_x, 0.0, -1.0), Point3::new(min_x + 1.0, 3.0, 1.0)),
        }
    }

    #[test]
    fn cast_into_wall_reports_toi_and_normal() {
        // Capsule surface starts 1m from the wall and moves 2m toward it.
        let (toi, n) = cast_capsule_against_box(
            &geom(),
            Vec3::new(0.0, 1.5, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            &wall(0, 1.5).aabb,
        )
        .expect("should hit");
        assert!((toi - 0.5).abs() < 1.0e-3, "toi = {toi}");
        assert!(n.x < -0.99, "normal = {n:?}");
    }

    #[test]
    fn moving_parallel_to_a_surface_is_not_a_hit() {
        // Resting just above a box top and moving sideways.
        let top = Obstacle {
            target: HitTarget::Floor,
            aabb: Aabb::new(Point3::new(-5.0, -1.0, -5.0), Point3::new(5.0, 0.0, 5.0)),
        };
        let pos = Vec3::new(0.0, 1.0 + 0.01, 0.0);
        assert!(cast_capsule_against_box(&geom(), pos, Vec3::new(1.0, 0.0, 0.0), &top.aabb).is_none());
    }

    #[test]
    fn tie_break_prefers_lower_id_regardless_of_order() {
        let a = SweepHit {
            target: HitTarget::Collider(ColliderId(9)),
            toi: 0.50000,
            normal: Vec3::x(),
        };
        let b = SweepHit {
            target: HitTarget::Collider(ColliderId(3)),
            toi: 0.50004,
            normal: Vec3::x(),
        };
        assert_eq!(prefer_hit(a, b, 1.0e-4).target, b.target);
        assert_eq!(prefer_hit(b, a, 1.0e-4).target, b.target);

        // Outside the epsilon the earlier hit wins even with a higher id.
        let c = SweepHit { toi: 0.4, ..a };
        assert_eq!(prefer_hit(c, b, 1.0e-4).target, c.target);
        assert_eq!(prefer_hit(b, c, 1.0e-4).target, c.target);
    }

    #[test]
    fn earliest_hit_on_coplanar_walls_picks_lowest_id() {
        let g = geom();
        let pos = Vec3::new(0.0, 1.5, 0.0);
        let motion = Vec3::new(2.0, 0.0, 0.0);
        let mut walls = vec![wall(4, 1.5), wall(1, 1.5)];
        walls.sort_by_key(|o| o.target.tie_rank());
        let forward = earliest_hit(&g, pos, motion, &walls, 1.0e-4).expect("hit");

        walls.reverse();
        let backward = earliest_hit(&g, pos, motion, &walls, 1.0e-4).expect("hit");

        assert_eq!(forward.target, HitTarget::Collider(ColliderId(1)));
        assert_eq!(backward.target, HitTarget::Collider(ColliderId(1)));
    }

    #[test]
    fn filtered_earliest_hit_looks_past_rejected_boxes() {
        let g = geom();
        let pos = Vec3::new(0.0, 1.5, 0.0);
        let motion = Vec3::new(4.0, 0.0, 0.0);
        let walls = vec![wall(1, 3.0), wall(4, 1.5)];

        let near = earliest_hit(&g, pos, motion, &walls, 1.0e-4).expect("hit");
        assert_eq!(near.target, HitTarget::Collider(ColliderId(4)));

        let far = earliest_hit_where(&g, pos, motion, &walls, 1.0e-4, |h| {
            h.target != HitTarget::Collider(ColliderId(4))
        })
        .expect("hit");
        assert_eq!(far.target, HitTarget::Collider(ColliderId(1)));
        assert!((far.toi - 0.625).abs() < 1.0e-3, "toi = {}", far.toi);
    }

    #[test]
    fn penetration_pushes_out_of_box() {
        let ob = wall(0, 0.2);
        let p = capsule_box_penetration(&geom(), Vec3::new(0.0, 1.5, 0.0), &ob).expect("overlap");
        assert!((p.depth - 0.3).abs() < 1.0e-3, "depth = {}", p.depth);
        assert!(p.push_dir.x < -0.99);
    }
}
