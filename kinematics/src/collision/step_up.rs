use super::{
    narrow_phase::{QueryScratch, earliest_hit},
    settings::{DIST_EPS, STEP_HEIGHT_EPS, SolverSettings},
    solver::TickGuard,
    stats::{CollisionStats, StepUpFail, StepUpFailMask},
    sweep::{HorizontalSweep, sweep_xz},
    types::{CapsuleGeom, HitTarget, Vec3, swept_capsule_aabb},
    world::SceneQuery,
};

/// Inputs for the single step-up attempt of a tick.
#[derive(Clone, Copy, Debug)]
pub struct StepUpInput<'a> {
    /// Result of the blocked horizontal sweep.
    pub sweep: &'a HorizontalSweep,
    /// Ground state at the start of the tick.
    pub on_ground: bool,
    /// Unclipped horizontal velocity, reused for the retried sweep.
    pub velocity_xz: Vec3,
}

/// Try to climb the collider that blocked the horizontal sweep.
///
/// The ledge rise is measured from the logical feet (`center - half_height - radius -
/// hover`), so a capsule resting at hover height over a floor and a ledge exactly
/// `max_step_height` above that floor passes. On success the capsule is lifted by the
/// rise, the leftover horizontal motion is retried from there, and the retried sweep
/// is returned. On failure the reasons are added to `stats.step_up_fail` and `None`
/// is returned; the caller keeps its pre-step pose.
pub fn try_step_up<S: SceneQuery + ?Sized>(
    scene: &S,
    geom: &CapsuleGeom,
    settings: &SolverSettings,
    input: StepUpInput<'_>,
    guard: &mut TickGuard,
    scratch: &mut QueryScratch,
    stats: &mut CollisionStats,
) -> Option<HorizontalSweep> {
    if !guard.begin_step_up() {
        stats.step_up_fail.add(StepUpFail::AlreadyAttempted);
        return None;
    }
    stats.step_up_attempts += 1;

    let from = input.sweep.blocked_at;
    let mut fail = StepUpFailMask::default();

    let blocker = match input.sweep.blocker.map(|h| h.target) {
        Some(HitTarget::Collider(id)) if scene.collider_props(id).blocking => id,
        _ => {
            stats.step_up_fail.add(StepUpFail::NoBlocker);
            log::trace!("step-up: no blocker");
            return None;
        }
    };

    let props = scene.collider_props(blocker);
    let top = scene.collider_aabb(blocker).maxs.y;
    let feet = from.y - geom.feet_offset() - settings.hover;
    let rise = top - feet;
    stats.step_up_rise = rise;

    if !input.on_ground {
        fail.add(StepUpFail::Airborne);
    }
    if !props.walkable {
        fail.add(StepUpFail::NotWalkable);
    }
    if !props.stepable {
        fail.add(StepUpFail::NotStepable);
    }
    if rise > settings.max_step_height + STEP_HEIGHT_EPS {
        fail.add(StepUpFail::TooTall);
    }
    if !fail.is_empty() {
        stats.step_up_fail.bits |= fail.bits;
        log::trace!("step-up on {blocker} failed: {}", stats.step_up_fail_labels());
        return None;
    }

    // Headroom: the lift itself must be free.
    let lift = Vec3::new(0.0, rise.max(0.0), 0.0);
    if lift.y > DIST_EPS {
        let swept = swept_capsule_aabb(geom, from, lift, settings.skin);
        scratch.gather(scene, &swept, &mut stats.candidates_checked);
        if earliest_hit(geom, from, lift, &scratch.obstacles, settings.toi_tie_epsilon).is_some() {
            stats.step_up_fail.add(StepUpFail::CeilingBlocked);
            log::trace!("step-up on {blocker} failed: ceiling");
            return None;
        }
    }

    let lifted = from + lift;
    let retry = sweep_xz(
        scene,
        geom,
        settings,
        lifted,
        input.sweep.blocked_leftover,
        input.velocity_xz,
        scratch,
        stats,
    );

    let progress = Vec3::new(retry.pos.x - lifted.x, 0.0, retry.pos.z - lifted.z).norm();
    if progress <= settings.skin {
        stats.step_up_fail.add(StepUpFail::StillBlocked);
        log::trace!("step-up on {blocker} failed: still blocked");
        return None;
    }

    stats.step_up_succeeded = true;
    Some(retry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{
        settings::DEFAULT_MAX_STEP_HEIGHT,
        spatial::GridLayout,
        types::{Aabb, ColliderProps, FloorSlab, Point3},
        world::{ColliderSource, WorldState},
    };

    fn geom() -> CapsuleGeom {
        CapsuleGeom::new(0.4, 0.5)
    }

    fn world_with_ledge(top: f32, props: ColliderProps) -> WorldState {
        let mut w = WorldState::new(
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
        );
        w.add_static(
            Aabb::new(Point3::new(1.0, 0.0, -2.0), Point3::new(3.0, top, 2.0)),
            props,
            ColliderSource::GridCell { ix: 4, iz: 4 },
        );
        w
    }

    /// Walk +X from the floor into the ledge, then try to climb it.
    fn attempt(w: &WorldState, on_ground: bool) -> (Option<HorizontalSweep>, CollisionStats) {
        let g = geom();
        let settings = SolverSettings::default();
        let mut scratch = QueryScratch::default();
        let mut stats = CollisionStats::default();
        let start = Vec3::new(0.0, g.feet_offset() + settings.hover, 0.0);
        let motion = Vec3::new(2.0, 0.0, 0.0);

        let view = w.view();
        let sweep = sweep_xz(&view, &g, &settings, start, motion, motion, &mut scratch, &mut stats);
        assert!(sweep.blocker.is_some(), "ledge should block the walk");

        let mut guard = TickGuard::default();
        let out = try_step_up(
            &view,
            &g,
            &settings,
            StepUpInput {
                sweep: &sweep,
                on_ground,
                velocity_xz: motion,
            },
            &mut guard,
            &mut scratch,
            &mut stats,
        );
        (out, stats)
    }

    #[test]
    fn ledge_exactly_at_max_step_height_is_climbed() {
        let w = world_with_ledge(DEFAULT_MAX_STEP_HEIGHT, ColliderProps::SOLID);
        let (out, stats) = attempt(&w, true);
        let out = out.expect("step-up should succeed");
        assert!(stats.step_up_succeeded);
        assert!(stats.step_up_fail.is_empty());
        assert!(out.pos.x > 1.0, "moved onto the ledge: {:?}", out.pos);
        let bottom = out.pos.y - geom().feet_offset();
        assert!(bottom >= DEFAULT_MAX_STEP_HEIGHT, "bottom = {bottom}");
    }

    #[test]
    fn ledge_just_above_max_step_height_fails_too_tall() {
        let w = world_with_ledge(DEFAULT_MAX_STEP_HEIGHT + 0.01, ColliderProps::SOLID);
        let (out, stats) = attempt(&w, true);
        assert!(out.is_none());
        assert!(stats.step_up_fail.has(StepUpFail::TooTall));
        assert!(!stats.step_up_succeeded);
    }

    #[test]
    fn every_failed_precondition_is_recorded() {
        let props = ColliderProps {
            blocking: true,
            walkable: false,
            stepable: false,
        };
        let w = world_with_ledge(0.2, props);
        let (out, stats) = attempt(&w, false);
        assert!(out.is_none());
        for flag in [StepUpFail::Airborne, StepUpFail::NotWalkable, StepUpFail::NotStepable] {
            assert!(stats.step_up_fail.has(flag), "{flag:?} missing");
        }
        assert!(!stats.step_up_fail.has(StepUpFail::TooTall));
    }

    #[test]
    fn second_attempt_in_a_tick_is_rejected() {
        let mut guard = TickGuard::default();
        assert!(guard.begin_step_up());
        // A repeated attempt is a caller bug; debug builds flag it loudly.
        if cfg!(debug_assertions) {
            let res = std::panic::catch_unwind(move || guard.begin_step_up());
            assert!(res.is_err());
        } else {
            assert!(!guard.begin_step_up());
        }
    }
}
