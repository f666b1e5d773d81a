//! Collision world storage and its read-only query surface.
//!
//! [`WorldState`] owns every collider, the spatial index, the floor slab and the
//! kill plane. The solver never sees it directly: it works against the
//! [`SceneQuery`] trait, which the world implements through the borrowed
//! [`SceneView`] handed out by [`WorldState::view`]. None of the query methods
//! can mutate the world, so replays stay deterministic.

use super::{
    spatial::{GridLayout, SpatialIndex},
    types::{Aabb, ColliderId, ColliderProps, FloorSlab, Vec3},
};

/// Read-only scene interface consumed by the capsule solver.
pub trait SceneQuery {
    /// Candidate colliders whose broad-phase cells overlap `aabb`.
    ///
    /// `out` is cleared first; on return it is sorted by id and free of duplicates.
    fn query_candidates(&self, aabb: &Aabb, out: &mut Vec<ColliderId>);

    /// World-space bounds of a real collider.
    ///
    /// Passing an id that does not exist is a programming error: it trips a debug
    /// assertion and yields an inverted (empty) box in release builds.
    fn collider_aabb(&self, id: ColliderId) -> Aabb;

    /// Surface properties of a real collider (same id contract as [`Self::collider_aabb`]).
    fn collider_props(&self, id: ColliderId) -> ColliderProps;

    /// The floor slab, if the scene has one.
    fn floor(&self) -> Option<FloorSlab>;
}

/// Where a collider came from; used for HUD readouts and overlay bookkeeping.
#[derive(Clone, Debug, PartialEq)]
pub enum ColliderSource {
    GridCell { ix: u32, iz: u32 },
    Extra { tag: String },
}

#[derive(Clone, Debug)]
pub struct ColliderEntry {
    pub aabb: Aabb,
    pub props: ColliderProps,
    pub source: ColliderSource,
}

pub struct WorldState {
    colliders: Vec<ColliderEntry>,
    static_count: usize,
    index: SpatialIndex,
    floor: Option<FloorSlab>,
    kill_y: f32,
    spawn_point: Vec3,
}

impl WorldState {
    pub fn new(layout: GridLayout, floor: Option<FloorSlab>, kill_y: f32, spawn_point: Vec3) -> Self {
        Self {
            colliders: Vec::new(),
            static_count: 0,
            index: SpatialIndex::new(layout),
            floor,
            kill_y,
            spawn_point,
        }
    }

    /// Add a static collider. Statics must all be added before the first extra.
    pub fn add_static(&mut self, aabb: Aabb, props: ColliderProps, source: ColliderSource) -> ColliderId {
        debug_assert_eq!(
            self.colliders.len(),
            self.static_count,
            "static colliders must be added before extras"
        );
        let id = ColliderId(self.colliders.len() as u32);
        self.index.insert_static(id, &aabb);
        self.colliders.push(ColliderEntry { aabb, props, source });
        self.static_count += 1;
        id
    }

    /// Add a collider to the extras layer; its id follows every static id.
    pub fn add_extra(&mut self, aabb: Aabb, props: ColliderProps, tag: impl Into<String>) -> ColliderId {
        let id = ColliderId(self.colliders.len() as u32);
        self.index.insert_extra(id, &aabb);
        self.colliders.push(ColliderEntry {
            aabb,
            props,
            source: ColliderSource::Extra { tag: tag.into() },
        });
        id
    }

    /// Remove every extra collider, releasing their ids.
    pub fn clear_extras(&mut self) {
        self.colliders.truncate(self.static_count);
        self.index.clear_extras();
    }

    #[inline]
    pub fn view(&self) -> SceneView<'_> {
        SceneView { world: self }
    }

    #[inline]
    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    #[inline]
    pub fn static_count(&self) -> usize {
        self.static_count
    }

    #[inline]
    pub fn extra_count(&self) -> usize {
        self.colliders.len() - self.static_count
    }

    pub fn entry(&self, id: ColliderId) -> Option<&ColliderEntry> {
        self.colliders.get(id.index())
    }

    #[inline]
    pub fn floor(&self) -> Option<FloorSlab> {
        self.floor
    }

    #[inline]
    pub fn kill_y(&self) -> f32 {
        self.kill_y
    }

    #[inline]
    pub fn spawn_point(&self) -> Vec3 {
        self.spawn_point
    }

    pub fn set_spawn_point(&mut self, spawn_point: Vec3) {
        self.spawn_point = spawn_point;
    }
}

/// Borrowed, read-only view of a [`WorldState`] implementing [`SceneQuery`].
#[derive(Clone, Copy)]
pub struct SceneView<'a> {
    world: &'a WorldState,
}

impl SceneQuery for SceneView<'_> {
    fn query_candidates(&self, aabb: &Aabb, out: &mut Vec<ColliderId>) {
        self.world.index.query(aabb, out);
    }

    fn collider_aabb(&self, id: ColliderId) -> Aabb {
        match self.world.colliders.get(id.index()) {
            Some(entry) => entry.aabb,
            None => {
                debug_assert!(false, "collider_aabb called with unknown id {id}");
                Aabb::new_invalid()
            }
        }
    }

    fn collider_props(&self, id: ColliderId) -> ColliderProps {
        match self.world.colliders.get(id.index()) {
            Some(entry) => entry.props,
            None => {
                debug_assert!(false, "collider_props called with unknown id {id}");
                ColliderProps {
                    blocking: false,
                    walkable: false,
                    stepable: false,
                }
            }
        }
    }

    fn floor(&self) -> Option<FloorSlab> {
        self.world.floor
    }
}
