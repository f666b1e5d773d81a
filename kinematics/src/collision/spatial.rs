//! Uniform-grid broad phase.
//!
//! # Model
//! - The grid covers `cells_x x cells_z` square cells of `cell_size` meters,
//!   starting at `(origin_x, origin_z)`.
//! - World-to-cell mapping: `c = floor((p - origin) / cell_size)`, clamped into
//!   `[0, cells-1]`. Inserts and queries use the same mapping, so anything outside
//!   the grid lands in the border cells and is still found (no false negatives).
//! - Two layers share the cell layout: a static layer filled once at build time and
//!   an extras layer that can be cleared and refilled (test fixtures).
//!
//! Candidates may be a superset of what actually overlaps; the solver re-validates
//! every candidate with exact shape queries.

use super::types::{Aabb, ColliderId};

/// Grid layout parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridLayout {
    pub origin_x: f32,
    pub origin_z: f32,
    pub cell_size: f32,
    pub cells_x: u32,
    pub cells_z: u32,
}

/// Inclusive cell-coordinate rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRange {
    pub x0: u32,
    pub x1: u32,
    pub z0: u32,
    pub z1: u32,
}

pub struct SpatialIndex {
    layout: GridLayout,
    inv_cell_size: f32,
    static_cells: Vec<Vec<ColliderId>>,
    extra_cells: Vec<Vec<ColliderId>>,
    /// Cells touched by the extras layer, so clearing does not scan the whole grid.
    extra_dirty: Vec<usize>,
    extra_count: usize,
}

impl SpatialIndex {
    pub fn new(layout: GridLayout) -> Self {
        let cells_x = layout.cells_x.max(1);
        let cells_z = layout.cells_z.max(1);
        let cell_size = if layout.cell_size > 0.0 {
            layout.cell_size
        } else {
            1.0
        };
        let layout = GridLayout {
            cells_x,
            cells_z,
            cell_size,
            ..layout
        };
        let n = (cells_x as usize) * (cells_z as usize);

        Self {
            layout,
            inv_cell_size: 1.0 / cell_size,
            static_cells: vec![Vec::new(); n],
            extra_cells: vec![Vec::new(); n],
            extra_dirty: Vec::new(),
            extra_count: 0,
        }
    }

    #[inline]
    pub fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Number of colliders currently in the extras layer.
    #[inline]
    pub fn extra_count(&self) -> usize {
        self.extra_count
    }

    #[inline]
    fn axis_cell(&self, coord: f32, origin: f32, cells: u32) -> u32 {
        let c = ((coord - origin) * self.inv_cell_size).floor();
        // NaN maps to cell 0 rather than poisoning the range.
        if c.is_nan() {
            return 0;
        }
        c.clamp(0.0, (cells - 1) as f32) as u32
    }

    /// Clamped cell range covered by `aabb` in XZ.
    pub fn cell_range(&self, aabb: &Aabb) -> CellRange {
        let l = &self.layout;
        CellRange {
            x0: self.axis_cell(aabb.mins.x, l.origin_x, l.cells_x),
            x1: self.axis_cell(aabb.maxs.x, l.origin_x, l.cells_x),
            z0: self.axis_cell(aabb.mins.z, l.origin_z, l.cells_z),
            z1: self.axis_cell(aabb.maxs.z, l.origin_z, l.cells_z),
        }
    }

    #[inline]
    fn slot(&self, x: u32, z: u32) -> usize {
        (x as usize) * (self.layout.cells_z as usize) + z as usize
    }

    /// Register a static collider. Only valid while the world is being built.
    pub fn insert_static(&mut self, id: ColliderId, aabb: &Aabb) {
        let r = self.cell_range(aabb);
        for x in r.x0..=r.x1 {
            for z in r.z0..=r.z1 {
                let slot = self.slot(x, z);
                self.static_cells[slot].push(id);
            }
        }
    }

    /// Register a collider in the extras layer.
    pub fn insert_extra(&mut self, id: ColliderId, aabb: &Aabb) {
        let r = self.cell_range(aabb);
        for x in r.x0..=r.x1 {
            for z in r.z0..=r.z1 {
                let slot = self.slot(x, z);
                if self.extra_cells[slot].is_empty() {
                    self.extra_dirty.push(slot);
                }
                self.extra_cells[slot].push(id);
            }
        }
        self.extra_count += 1;
    }

    /// Drop every collider in the extras layer. The static layer is untouched.
    pub fn clear_extras(&mut self) {
        for slot in self.extra_dirty.drain(..) {
            self.extra_cells[slot].clear();
        }
        self.extra_count = 0;
    }

    /// Collect candidate ids whose cells overlap `aabb` into `out`.
    ///
    /// `out` is cleared first and returned sorted by id without duplicates, which is
    /// what makes downstream tie-breaks independent of insertion order.
    pub fn query(&self, aabb: &Aabb, out: &mut Vec<ColliderId>) {
        out.clear();
        let r = self.cell_range(aabb);
        for x in r.x0..=r.x1 {
            for z in r.z0..=r.z1 {
                let slot = self.slot(x, z);
                out.extend_from_slice(&self.static_cells[slot]);
                out.extend_from_slice(&self.extra_cells[slot]);
            }
        }
        out.sort_unstable();
        out.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::types::Point3;

    fn layout() -> GridLayout {
        GridLayout {
            origin_x: -10.0,
            origin_z: -10.0,
            cell_size: 2.0,
            cells_x: 10,
            cells_z: 10,
        }
    }

    fn cube(cx: f32, cz: f32, h: f32) -> Aabb {
        Aabb::new(Point3::new(cx - h, 0.0, cz - h), Point3::new(cx + h, 2.0 * h, cz + h))
    }

    #[test]
    fn query_returns_sorted_unique_candidates() {
        let mut index = SpatialIndex::new(layout());
        // A wide collider spanning several cells, inserted before a smaller id.
        index.insert_static(ColliderId(7), &cube(0.0, 0.0, 3.0));
        index.insert_static(ColliderId(2), &cube(1.0, 1.0, 0.5));

        let mut out = Vec::new();
        index.query(&cube(0.5, 0.5, 2.0), &mut out);
        assert_eq!(out, vec![ColliderId(2), ColliderId(7)]);
    }

    #[test]
    fn out_of_grid_colliders_are_found_by_out_of_grid_queries() {
        let mut index = SpatialIndex::new(layout());
        index.insert_static(ColliderId(1), &cube(50.0, 50.0, 1.0));

        let mut out = Vec::new();
        index.query(&cube(49.0, 51.0, 1.0), &mut out);
        assert_eq!(out, vec![ColliderId(1)]);

        index.query(&cube(-50.0, -50.0, 1.0), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn clearing_extras_keeps_statics() {
        let mut index = SpatialIndex::new(layout());
        index.insert_static(ColliderId(0), &cube(0.0, 0.0, 0.5));
        index.insert_extra(ColliderId(1), &cube(0.0, 0.0, 0.5));
        index.insert_extra(ColliderId(2), &cube(4.0, 4.0, 0.5));
        assert_eq!(index.extra_count(), 2);

        let mut out = Vec::new();
        index.query(&cube(0.0, 0.0, 0.5), &mut out);
        assert_eq!(out, vec![ColliderId(0), ColliderId(1)]);

        index.clear_extras();
        assert_eq!(index.extra_count(), 0);
        index.query(&cube(0.0, 0.0, 0.5), &mut out);
        assert_eq!(out, vec![ColliderId(0)]);
        index.query(&cube(4.0, 4.0, 0.5), &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn cell_range_clamps_to_grid() {
        let index = SpatialIndex::new(layout());
        let r = index.cell_range(&cube(-1.0e6, 1.0e6, 1.0));
        assert_eq!(r, CellRange { x0: 0, x1: 0, z0: 9, z1: 9 });
    }
}
