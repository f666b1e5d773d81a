//! Builds a [`WorldState`] from a parsed scene description.
//!
//! Every enabled grid cell becomes one axis-aligned cube standing on the floor.
//! Overlay ops from the scene file disable cells, move their tops or swap in a
//! preset. Test fixtures such as the staircase go into the extras layer so they
//! can be rebuilt without touching the grid.

use std::collections::HashMap;

use crate::{
    collision::{Aabb, ColliderProps, ColliderSource, FloorSlab, GridLayout, Point3, Vec3, WorldState},
    scene_file::{OverlayOp, SceneDescription},
};

/// Height of the spawn point above the default cube tops (meters).
pub const SPAWN_CLEARANCE: f32 = 3.0;

/// Rise of the `step_low` and `no_step` presets above the default top.
pub const PRESET_LOW_RISE: f32 = 0.25;
/// Rise of the `step_high` preset; deliberately above the default step limit.
pub const PRESET_HIGH_RISE: f32 = 0.6;
/// Rise of the `pillar` preset.
pub const PRESET_PILLAR_RISE: f32 = 4.0;

/// Built-in replacement cubes addressable by name from scene files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CubePreset {
    /// Slightly raised cube the pawn can walk up.
    StepLow,
    /// Raised too far to step onto.
    StepHigh,
    /// Same height as `StepLow` but flagged as not climbable.
    NoStep,
    /// Tall column.
    Pillar,
    /// Present for bookkeeping but never collides.
    Ghost,
}

impl CubePreset {
    pub const ALL: [CubePreset; 5] = [
        CubePreset::StepLow,
        CubePreset::StepHigh,
        CubePreset::NoStep,
        CubePreset::Pillar,
        CubePreset::Ghost,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CubePreset::StepLow => "step_low",
            CubePreset::StepHigh => "step_high",
            CubePreset::NoStep => "no_step",
            CubePreset::Pillar => "pillar",
            CubePreset::Ghost => "ghost",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Top height relative to the default cube top, and the surface flags.
    fn shape(self) -> (f32, ColliderProps) {
        match self {
            CubePreset::StepLow => (PRESET_LOW_RISE, ColliderProps::SOLID),
            CubePreset::StepHigh => (PRESET_HIGH_RISE, ColliderProps::SOLID),
            CubePreset::NoStep => (
                PRESET_LOW_RISE,
                ColliderProps {
                    stepable: false,
                    ..ColliderProps::SOLID
                },
            ),
            CubePreset::Pillar => (PRESET_PILLAR_RISE, ColliderProps::SOLID),
            CubePreset::Ghost => (
                0.0,
                ColliderProps {
                    blocking: false,
                    walkable: false,
                    stepable: false,
                },
            ),
        }
    }
}

/// A straight staircase along +X, built as solid stacked boxes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StairFixture {
    /// Front-bottom-center of the first step.
    pub origin: Vec3,
    /// Depth of each step along +X.
    pub run: f32,
    /// Height gained per step.
    pub rise: f32,
    /// Extent across the staircase (Z).
    pub width: f32,
    pub count: u32,
}

impl Default for StairFixture {
    fn default() -> Self {
        Self {
            origin: Vec3::zeros(),
            run: 0.55,
            rise: 0.3,
            width: 3.0,
            count: 8,
        }
    }
}

pub const STAIR_TAG: &str = "stairs";

/// Replace the extras layer with `fixture`. Returns the number of steps added.
pub fn build_stairs(world: &mut WorldState, fixture: &StairFixture) -> usize {
    world.clear_extras();
    let half_z = fixture.width * 0.5;
    for i in 0..fixture.count {
        let fi = i as f32;
        let x0 = fixture.origin.x + fi * fixture.run;
        let top = fixture.origin.y + (fi + 1.0) * fixture.rise;
        let aabb = Aabb::new(
            Point3::new(x0, fixture.origin.y, fixture.origin.z - half_z),
            Point3::new(x0 + fixture.run, top, fixture.origin.z + half_z),
        );
        world.add_extra(aabb, ColliderProps::SOLID, STAIR_TAG);
    }
    fixture.count as usize
}

/// Default top of every cube: the floor plus the full collision height.
#[inline]
pub fn default_cube_top(desc: &SceneDescription) -> f32 {
    desc.base.floor_y + 2.0 * desc.base.grid.collision_half_extent
}

/// Spawn point above the grid center.
pub fn spawn_point(desc: &SceneDescription) -> Vec3 {
    let g = &desc.base.grid;
    Vec3::new(
        g.origin_x + 0.5 * g.size_x as f32 * g.spacing,
        default_cube_top(desc) + SPAWN_CLEARANCE,
        g.origin_z + 0.5 * g.size_z as f32 * g.spacing,
    )
}

/// Build the collision world for a validated description.
///
/// Cube ids are assigned row-major (z outer, x inner) over enabled cells.
pub fn build_world(desc: &SceneDescription) -> WorldState {
    let base = &desc.base;
    let g = &base.grid;
    let layout = GridLayout {
        origin_x: g.origin_x,
        origin_z: g.origin_z,
        cell_size: g.spacing,
        cells_x: g.size_x,
        cells_z: g.size_z,
    };
    let floor = FloorSlab {
        top_y: base.floor_y,
        half_x: base.floor_half_x,
        half_z: base.floor_half_z,
    };
    let mut world = WorldState::new(layout, Some(floor), base.kill_y, spawn_point(desc));

    let default_top = default_cube_top(desc);
    let half = g.collision_half_extent;
    let overlays: HashMap<(u32, u32), &OverlayOp> = desc
        .overlays_by_cell()
        .into_iter()
        .map(|(cell, o)| (cell, &o.op))
        .collect();
    for iz in 0..g.size_z {
        for ix in 0..g.size_x {
            let mut top = default_top;
            let mut props = ColliderProps::SOLID;
            match overlays.get(&(ix, iz)).copied() {
                Some(OverlayOp::Disable) => continue,
                Some(OverlayOp::ModifyTopY(y)) => top = *y,
                Some(OverlayOp::ReplacePreset(preset)) => {
                    let (rise, preset_props) = preset.shape();
                    top = default_top + rise;
                    props = preset_props;
                }
                None => {}
            }
            let cx = g.origin_x + (ix as f32 + 0.5) * g.spacing;
            let cz = g.origin_z + (iz as f32 + 0.5) * g.spacing;
            let aabb = Aabb::new(
                Point3::new(cx - half, base.floor_y, cz - half),
                Point3::new(cx + half, top, cz + half),
            );
            world.add_static(aabb, props, ColliderSource::GridCell { ix, iz });
        }
    }

    log::info!(
        "built world: {} cubes on a {}x{} grid, {} overlays",
        world.static_count(),
        g.size_x,
        g.size_z,
        desc.overlays.len()
    );
    world
}
