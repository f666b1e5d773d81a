use super::{
    narrow_phase::{QueryScratch, earliest_hit, earliest_hit_where},
    settings::{MIN_GROUND_NORMAL_Y, STEP_HEIGHT_EPS, SolverSettings},
    solver::TickGuard,
    stats::CollisionStats,
    types::{CapsuleGeom, ColliderId, HitTarget, SweepHit, Vec3, swept_capsule_aabb},
    world::SceneQuery,
};

/// Result of the end-of-tick support probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Support {
    pub pos: Vec3,
    pub on_ground: bool,
    pub target: HitTarget,
}

/// Probe beneath the capsule for the nearest walkable surface and snap onto it.
///
/// The probe casts `snap_distance + hover` straight down. A hit is ground when the
/// surface is walkable (the floor always is) and either its normal is flat enough to
/// stand on or the box top is not above the capsule bottom. The second case is a
/// capsule resting on a ledge with its center still behind the edge, as it is right
/// after climbing a step. When the first hit is not ground the probe keeps looking
/// further down, but never snaps past that first contact.
///
/// Box supports snap to exactly `top + feet + hover`. A collider the step-up climbed
/// onto this tick is taken as support without probing.
///
/// `just_jumped` or upward velocity suppress the probe entirely, so a jump impulse
/// is not cancelled on the tick it starts.
pub fn query_support<S: SceneQuery + ?Sized>(
    scene: &S,
    geom: &CapsuleGeom,
    settings: &SolverSettings,
    pos: Vec3,
    velocity_y: f32,
    just_jumped: bool,
    stepped_onto: Option<ColliderId>,
    guard: &mut TickGuard,
    scratch: &mut QueryScratch,
    stats: &mut CollisionStats,
) -> Support {
    guard.begin_support();
    stats.support_queries += 1;

    let airborne = Support {
        pos,
        on_ground: false,
        target: HitTarget::None,
    };
    if just_jumped || velocity_y > 0.0 {
        stats.support_suppressed = true;
        return airborne;
    }

    if let Some(id) = stepped_onto {
        // Step-up left the feet exactly `hover` above this collider's top.
        let target = HitTarget::Collider(id);
        stats.support_hit = target;
        stats.support_normal_y = 1.0;
        return Support {
            pos,
            on_ground: true,
            target,
        };
    }

    let probe = settings.snap_distance + settings.hover;
    let motion = Vec3::new(0.0, -probe, 0.0);
    let swept = swept_capsule_aabb(geom, pos, motion, settings.skin);
    scratch.gather(scene, &swept, &mut stats.candidates_checked);

    let Some(first) = earliest_hit(geom, pos, motion, &scratch.obstacles, settings.toi_tie_epsilon) else {
        return airborne;
    };
    stats.support_hit = first.target;
    stats.support_normal_y = first.normal.y;

    let bottom = pos.y - geom.feet_offset();
    let scratch = &*scratch;
    let is_ground = |hit: &SweepHit| {
        let walkable = match hit.target {
            HitTarget::Floor => true,
            HitTarget::Collider(id) => scene.collider_props(id).walkable,
            HitTarget::None => false,
        };
        let on_ledge = scratch
            .obstacle_aabb(hit.target)
            .is_some_and(|aabb| aabb.maxs.y <= bottom + STEP_HEIGHT_EPS);
        walkable && (hit.normal.y >= MIN_GROUND_NORMAL_Y || on_ledge)
    };

    let hit = if is_ground(&first) {
        first
    } else {
        let below = earliest_hit_where(
            geom,
            pos,
            motion,
            &scratch.obstacles,
            settings.toi_tie_epsilon,
            &is_ground,
        );
        match below {
            Some(hit) => hit,
            None => return airborne,
        }
    };
    stats.support_hit = hit.target;
    stats.support_normal_y = hit.normal.y;

    let along_probe = pos.y - probe * hit.toi + settings.hover;
    let snapped_y = match scratch.obstacle_aabb(hit.target) {
        Some(aabb) => {
            let on_top = aabb.maxs.y + geom.feet_offset() + settings.hover;
            if on_top - pos.y <= settings.max_step_height { on_top } else { along_probe }
        }
        None => along_probe,
    };
    // Never below the first contact, whatever it was.
    let snapped_y = snapped_y.max(pos.y - probe * first.toi);
    stats.support_snap = snapped_y - pos.y;

    Support {
        pos: Vec3::new(pos.x, snapped_y, pos.z),
        on_ground: true,
        target: hit.target,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{
        spatial::GridLayout,
        types::{Aabb, ColliderProps, FloorSlab, Point3},
        world::{ColliderSource, WorldState},
    };

    fn geom() -> CapsuleGeom {
        CapsuleGeom::new(0.4, 0.5)
    }

    fn bare_world() -> WorldState {
        WorldState::new(
            GridLayout {
                origin_x: -8.0,
                origin_z: -8.0,
                cell_size: 2.0,
                cells_x: 8,
                cells_z: 8,
            },
            Some(FloorSlab {
                top_y: 0.0,
                half_x: 8.0,
                half_z: 8.0,
            }),
            -50.0,
            Vec3::new(0.0, 3.0, 0.0),
        )
    }

    fn world() -> WorldState {
        let mut w = bare_world();
        // A walkable block and a non-walkable one.
        w.add_static(
            Aabb::new(Point3::new(2.0, 0.0, -1.0), Point3::new(4.0, 1.0, 1.0)),
            ColliderProps::SOLID,
            ColliderSource::GridCell { ix: 5, iz: 4 },
        );
        w.add_static(
            Aabb::new(Point3::new(-4.0, 0.0, -1.0), Point3::new(-2.0, 1.0, 1.0)),
            ColliderProps {
                blocking: true,
                walkable: false,
                stepable: false,
            },
            ColliderSource::GridCell { ix: 2, iz: 4 },
        );
        w
    }

    fn support_with(
        w: &WorldState,
        settings: &SolverSettings,
        pos: Vec3,
        vy: f32,
        just_jumped: bool,
        stepped_onto: Option<ColliderId>,
    ) -> (Support, CollisionStats) {
        let mut stats = CollisionStats::default();
        let mut guard = TickGuard::default();
        let s = query_support(
            &w.view(),
            &geom(),
            settings,
            pos,
            vy,
            just_jumped,
            stepped_onto,
            &mut guard,
            &mut QueryScratch::default(),
            &mut stats,
        );
        (s, stats)
    }

    fn support_at(w: &WorldState, pos: Vec3, vy: f32, just_jumped: bool) -> (Support, CollisionStats) {
        support_with(w, &SolverSettings::default(), pos, vy, just_jumped, None)
    }

    #[test]
    fn snaps_exactly_onto_a_flat_top() {
        let w = world();
        let hover = SolverSettings::default().hover;
        let (s, stats) = support_at(&w, Vec3::new(3.0, 1.0 + 0.9 + 0.12, 0.0), 0.0, false);
        assert!(s.on_ground);
        assert_eq!(s.target, stats.support_hit);
        assert_eq!(s.pos.y, 1.0 + geom().feet_offset() + hover);
        assert_eq!(stats.support_queries, 1);
    }

    #[test]
    fn floor_counts_as_support() {
        let w = world();
        let (s, _) = support_at(&w, Vec3::new(0.0, 0.9 + 0.2, 0.0), -1.0, false);
        assert!(s.on_ground);
        assert_eq!(s.target, HitTarget::Floor);
    }

    #[test]
    fn out_of_reach_or_non_walkable_is_airborne() {
        let w = world();
        let (high, _) = support_at(&w, Vec3::new(0.0, 0.9 + 1.0, 0.0), 0.0, false);
        assert!(!high.on_ground);
        assert_eq!(high.pos.y, 0.9 + 1.0);

        let (slick, stats) = support_at(&w, Vec3::new(-3.0, 1.0 + 0.9 + 0.05, 0.0), 0.0, false);
        assert!(!slick.on_ground);
        assert_eq!(stats.support_hit, HitTarget::Collider(ColliderId(1)));
    }

    #[test]
    fn jump_suppresses_the_snap() {
        let w = world();
        let start = Vec3::new(3.0, 1.0 + 0.9 + 0.05, 0.0);
        let (s, stats) = support_at(&w, start, 5.0, true);
        assert!(!s.on_ground);
        assert_eq!(s.pos, start);
        assert!(stats.support_suppressed);
        assert_eq!(stats.support_queries, 1);
    }

    #[test]
    fn ledge_holds_while_the_center_is_behind_the_edge() {
        let w = world();
        let hover = SolverSettings::default().hover;
        // Bottom level with the block top, center 0.3 short of its edge at x = 2.
        let pos = Vec3::new(1.7, 1.0 + geom().feet_offset() + hover, 0.0);
        let (s, stats) = support_at(&w, pos, 0.0, false);
        assert!(s.on_ground);
        assert_eq!(s.target, HitTarget::Collider(ColliderId(0)));
        assert!(stats.support_normal_y < MIN_GROUND_NORMAL_Y, "ny = {}", stats.support_normal_y);
        assert_eq!(s.pos.y, pos.y);
    }

    #[test]
    fn steep_corner_above_the_tread_does_not_hide_it() {
        let mut w = bare_world();
        let tread = w.add_static(
            Aabb::new(Point3::new(-2.0, 0.0, -2.0), Point3::new(2.0, 1.0, 2.0)),
            ColliderProps::SOLID,
            ColliderSource::GridCell { ix: 3, iz: 3 },
        );
        let riser = w.add_static(
            Aabb::new(Point3::new(2.0, 0.0, -2.0), Point3::new(3.0, 1.3, 2.0)),
            ColliderProps::SOLID,
            ColliderSource::GridCell { ix: 5, iz: 3 },
        );
        let settings = SolverSettings {
            hover: 0.05,
            ..Default::default()
        };
        // Close enough to the riser's top corner that the downward cast meets it before the tread.
        let pos = Vec3::new(2.0 - 0.378, 1.0 + geom().feet_offset() + 0.05, 0.0);
        let (s, stats) = support_with(&w, &settings, pos, -0.1, false, None);

        assert!(s.on_ground, "stats: {stats:?}");
        assert_eq!(s.target, HitTarget::Collider(tread));
        assert_ne!(s.target, HitTarget::Collider(riser));
        assert_eq!(s.pos.y, pos.y);
    }

    #[test]
    fn stepped_onto_collider_is_support() {
        let w = world();
        let pos = Vec3::new(1.65, 1.0 + geom().feet_offset() + 0.01, 0.0);
        let (s, stats) = support_with(&w, &SolverSettings::default(), pos, 0.0, false, Some(ColliderId(0)));
        assert!(s.on_ground);
        assert_eq!(s.pos, pos);
        assert_eq!(stats.support_hit, HitTarget::Collider(ColliderId(0)));
        assert_eq!(stats.support_queries, 1);
    }
}
