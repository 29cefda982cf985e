//! Axis-aligned regular lattice used for bucketing and octree indexing.

use glam::Vec3;

/// Largest supported cell count along one axis.
///
/// Keeps all cell arithmetic comfortably inside `i32`, and the total cell
/// count of any grid inside `u64`.
pub const MAX_DIMENSION: u32 = 1 << 21;

/// A regular lattice: reference point, uniform spacing, and signed inclusive
/// lower / exclusive upper cell extents per axis.
///
/// The extents are expressed in cell units relative to the reference point, so
/// sub-grids of a common enclosing grid share its reference and spacing and
/// differ only in their extents. Vertex `(0, 0, 0)` of a grid is its lower
/// corner; axis `i` has `num_cells(i) + 1` vertex planes.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    reference: Vec3,
    spacing: f32,
    extents: [(i32, i32); 3],
}

impl Grid {
    /// Create a grid.
    ///
    /// # Panics
    /// When the spacing is not positive, an extent is empty or inverted, or an
    /// axis exceeds [`MAX_DIMENSION`] cells.
    pub fn new(reference: Vec3, spacing: f32, extents: [(i32, i32); 3]) -> Self {
        assert!(spacing > 0.0, "grid spacing must be positive");
        for &(lower, upper) in &extents {
            assert!(lower < upper, "grid extents must be non-empty");
            assert!(
                (upper as i64 - lower as i64) <= MAX_DIMENSION as i64,
                "grid axis exceeds {MAX_DIMENSION} cells"
            );
        }
        Self {
            reference,
            spacing,
            extents,
        }
    }

    #[inline]
    pub fn reference(&self) -> Vec3 {
        self.reference
    }

    #[inline]
    pub fn spacing(&self) -> f32 {
        self.spacing
    }

    /// `(lower, upper)` cell extent of `axis` (0..3).
    #[inline]
    pub fn extent(&self, axis: usize) -> (i32, i32) {
        self.extents[axis]
    }

    /// Number of cells along `axis`.
    #[inline]
    pub fn num_cells(&self, axis: usize) -> u32 {
        let (lower, upper) = self.extents[axis];
        (upper - lower) as u32
    }

    /// Number of vertex planes along `axis`.
    #[inline]
    pub fn num_vertices(&self, axis: usize) -> u32 {
        self.num_cells(axis) + 1
    }

    /// Total cell count of the grid.
    pub fn total_cells(&self) -> u64 {
        (0..3).map(|axis| self.num_cells(axis) as u64).product()
    }

    /// Map a world position to continuous vertex coordinates of this grid,
    /// with vertex `(0, 0, 0)` at the grid's lower corner.
    #[inline]
    pub fn world_to_vertex(&self, p: Vec3) -> Vec3 {
        let lower = Vec3::new(
            self.extents[0].0 as f32,
            self.extents[1].0 as f32,
            self.extents[2].0 as f32,
        );
        (p - self.reference) / self.spacing - lower
    }

    /// World position of vertex `(x, y, z)`; the inverse of
    /// [`world_to_vertex`](Self::world_to_vertex) on lattice points.
    #[inline]
    pub fn vertex(&self, x: u32, y: u32, z: u32) -> Vec3 {
        let v = Vec3::new(
            (self.extents[0].0 + x as i32) as f32,
            (self.extents[1].0 + y as i32) as f32,
            (self.extents[2].0 + z as i32) as f32,
        );
        self.reference + v * self.spacing
    }

    /// Sub-grid with the given absolute cell extents, sharing this grid's
    /// reference point and spacing.
    ///
    /// # Panics
    /// When `[lo, hi)` is empty or not contained in this grid.
    pub fn sub_grid(&self, lo: [i32; 3], hi: [i32; 3]) -> Grid {
        for axis in 0..3 {
            let (lower, upper) = self.extents[axis];
            assert!(
                lower <= lo[axis] && hi[axis] <= upper,
                "sub-grid extents outside parent grid"
            );
        }
        Grid::new(
            self.reference,
            self.spacing,
            [(lo[0], hi[0]), (lo[1], hi[1]), (lo[2], hi[2])],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Grid {
        Grid::new(Vec3::new(-10.0, 0.0, 10.0), 2.5, [(4, 20), (0, 20), (-4, 4)])
    }

    #[test]
    fn extents_and_counts() {
        let grid = fixture();
        assert_eq!(grid.extent(0), (4, 20));
        assert_eq!(grid.extent(2), (-4, 4));
        assert_eq!(grid.num_cells(0), 16);
        assert_eq!(grid.num_cells(1), 20);
        assert_eq!(grid.num_cells(2), 8);
        assert_eq!(grid.num_vertices(2), 9);
        assert_eq!(grid.total_cells(), 16 * 20 * 8);
    }

    #[test]
    fn vertex_round_trip() {
        let grid = fixture();
        // Lower corner: reference + spacing * extent lower.
        assert_eq!(grid.vertex(0, 0, 0), Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(grid.vertex(16, 20, 8), Vec3::new(40.0, 50.0, 20.0));

        let p = Vec3::new(10.0, 20.0, 10.0);
        let v = grid.world_to_vertex(p);
        assert_eq!(v, Vec3::new(4.0, 8.0, 4.0));
        let back = grid.vertex(4, 8, 4);
        assert!((back - p).length() < 1e-5);
    }

    #[test]
    fn sub_grid_shares_frame() {
        let grid = fixture();
        let sub = grid.sub_grid([4, 8, 0], [12, 16, 4]);
        assert_eq!(sub.reference(), grid.reference());
        assert_eq!(sub.spacing(), grid.spacing());
        assert_eq!(sub.num_cells(0), 8);
        // A point maps consistently between parent and sub coordinates.
        let p = Vec3::new(5.0, 25.0, 12.5);
        let dv = grid.world_to_vertex(p) - sub.world_to_vertex(p);
        assert_eq!(dv, Vec3::new(0.0, 8.0, 4.0));
    }

    #[test]
    #[should_panic(expected = "non-empty")]
    fn rejects_inverted_extent() {
        Grid::new(Vec3::ZERO, 1.0, [(0, 4), (3, 3), (0, 4)]);
    }

    #[test]
    #[should_panic(expected = "spacing")]
    fn rejects_zero_spacing() {
        Grid::new(Vec3::ZERO, 0.0, [(0, 4), (0, 4), (0, 4)]);
    }
}
