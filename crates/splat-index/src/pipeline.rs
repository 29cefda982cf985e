//! Drives the partitioner and hands indexed blocks to a downstream evaluator.

use glam::Vec3;

use crate::bucket::{bucket, BucketParams, Recursion};
use crate::error::Error;
use crate::grid::{Grid, MAX_DIMENSION};
use crate::source::{for_each_splat, full_ranges, SplatSource};
use crate::splat::Splat;
use crate::tree::SplatTree;

/// Grid enclosing the sample positions of all input splats.
///
/// The bounding box of the positions (influence radii excluded) is swept in
/// one pass; its minimum becomes the grid reference point and the extents run
/// from zero to the covering cell count, so the lower grid corner sits at the
/// bounding-box minimum.
///
/// Fails with [`Error::EmptyInput`] when the source holds no splats, and with
/// [`Error::OutOfRange`] when an axis would exceed [`MAX_DIMENSION`] cells.
pub fn make_grid<S>(splats: &S, spacing: f32) -> Result<Grid, Error>
where
    S: SplatSource + ?Sized,
{
    assert!(spacing > 0.0, "grid spacing must be positive");

    let ranges = full_ranges(splats)?;
    let mut lo = Vec3::splat(f32::INFINITY);
    let mut hi = Vec3::splat(f32::NEG_INFINITY);
    let mut any = false;
    for_each_splat(splats, &ranges, |_, _, splat| {
        lo = lo.min(splat.position);
        hi = hi.max(splat.position);
        any = true;
    });
    if !any {
        return Err(Error::EmptyInput);
    }

    let mut extents = [(0i32, 0i32); 3];
    for axis in 0..3 {
        let cells = ((hi[axis] - lo[axis]) / spacing).ceil().max(1.0);
        if cells > MAX_DIMENSION as f32 {
            return Err(Error::OutOfRange("bounding box too large for the grid spacing"));
        }
        extents[axis] = (0, cells as i32);
    }
    Ok(Grid::new(lo, spacing, extents))
}

/// A bucket prepared for the downstream evaluator: resident splats, their
/// octree index, the bucket grid and recursion progress. Dropped after the
/// evaluator returns.
pub struct Block {
    pub splats: Vec<Splat>,
    pub tree: SplatTree,
    pub grid: Grid,
    pub recursion: Recursion,
}

/// Walk the partition of `grid`, build a [`SplatTree`] per bucket, and hand
/// each [`Block`] to `consume`. Density and empty-input errors propagate
/// unchanged, as do errors raised by `consume`.
pub fn drive<S, F, E>(splats: &S, grid: &Grid, params: BucketParams, mut consume: F) -> Result<(), E>
where
    S: SplatSource + ?Sized,
    F: FnMut(Block) -> Result<(), E>,
    E: From<Error>,
{
    bucket(splats, grid, params, |b| {
        let mut loaded = Vec::with_capacity(b.num_splats as usize);
        for_each_splat(splats, b.ranges, |_, _, splat| loaded.push(*splat));
        let tree = SplatTree::new(&loaded, &b.grid).map_err(E::from)?;
        consume(Block {
            splats: loaded,
            tree,
            grid: b.grid,
            recursion: b.recursion,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::VecSource;

    #[test]
    fn make_grid_anchors_at_position_minimum() {
        let splats = VecSource::from_scans(vec![vec![
            Splat::new(Vec3::new(1.0, 2.0, 3.0), 10.0, Vec3::Z),
            Splat::new(Vec3::new(6.0, 2.5, 3.0), 0.1, Vec3::Z),
        ]]);
        let grid = make_grid(&splats, 1.0).unwrap();
        // Radii do not grow the box; degenerate axes still get one cell.
        assert_eq!(grid.reference(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(grid.extent(0), (0, 5));
        assert_eq!(grid.extent(1), (0, 1));
        assert_eq!(grid.extent(2), (0, 1));
    }

    #[test]
    fn make_grid_rejects_empty_input() {
        let empty = VecSource::from_scans(vec![vec![], vec![]]);
        assert_eq!(make_grid(&empty, 1.0), Err(Error::EmptyInput));
    }

    #[test]
    fn make_grid_rejects_oversized_box() {
        let splats = VecSource::from_scans(vec![vec![
            Splat::new(Vec3::ZERO, 1.0, Vec3::Z),
            Splat::new(Vec3::new(1.0e9, 0.0, 0.0), 1.0, Vec3::Z),
        ]]);
        assert!(matches!(
            make_grid(&splats, 0.01),
            Err(Error::OutOfRange(_))
        ));
    }
}
