//! Per-bucket sparse octree over splat bounding cubes.
//!
//! The tree is a flat, prefix-summed structure: `level_start` addresses the
//! cells of each level, `start` holds per-cell offsets into `ids`, and `ids`
//! concatenates the splat lists of all cells in Morton order. Downstream
//! evaluators consume the three arrays directly.

use crate::error::Error;
use crate::grid::Grid;
use crate::splat::Splat;

/// Maximum octree depth. Three 10-bit coordinates fill a `u32` Morton code,
/// and the cell arrays of deeper trees would be unreasonable anyway.
pub const MAX_LEVELS: u32 = 10;

/// Spread the low 10 bits of `x`, leaving two zero bits between each.
#[inline]
fn spread_bits(x: u32) -> u32 {
    debug_assert!(x < 1024);
    let mut x = x;
    x = (x | (x << 16)) & 0x0300_00FF;
    x = (x | (x << 8)) & 0x0300_F00F;
    x = (x | (x << 4)) & 0x030C_30C3;
    x = (x | (x << 2)) & 0x0924_9249;
    x
}

/// Interleave three cell coordinates least-significant-first: bit `3k` of the
/// code is bit `k` of `x`, with `y` and `z` one and two bits up.
#[inline]
pub(crate) fn morton3(x: u32, y: u32, z: u32) -> u32 {
    spread_bits(x) | (spread_bits(y) << 1) | (spread_bits(z) << 2)
}

/// Sparse octree index for one bucket's splats.
///
/// For every splat the tree stores an entry in each cell (at most eight) of
/// the smallest level whose cells fully contain the splat's bounding cube.
/// After construction, `ids[start[c]..start[c + 1]]` lists the splats of the
/// cell addressed by `c = level_start[level] + morton3(x, y, z)`, in original
/// splat order.
pub struct SplatTree {
    max_level: u32,
    level_start: Vec<u32>,
    start: Vec<u32>,
    ids: Vec<u32>,
}

impl SplatTree {
    /// Build the index for `splats` clipped to `grid`.
    ///
    /// Every splat's bounding cube is expected to overlap the grid; cubes
    /// overhanging the boundary are clamped to the boundary vertices, so
    /// splats straddling neighbouring buckets index the cells they share with
    /// this one.
    pub fn new(splats: &[Splat], grid: &Grid) -> Result<Self, Error> {
        if splats.len() > u32::MAX as usize {
            return Err(Error::OutOfRange("too many splats for one tree"));
        }
        let size = (0..3).map(|axis| grid.num_vertices(axis)).max().unwrap();
        let mut max_level = 0u32;
        while (1u32 << max_level) < size {
            max_level += 1;
        }
        if max_level > MAX_LEVELS {
            return Err(Error::OutOfRange("grid too large for one tree"));
        }

        let mut level_start = Vec::with_capacity(max_level as usize + 2);
        level_start.push(0u32);
        for level in 0..=max_level {
            let cells = 1u32 << (3 * level);
            level_start.push(level_start[level as usize] + cells);
        }
        let num_cells = *level_start.last().unwrap() as usize;

        // Step 1: count entries per cell.
        let mut start = vec![0u32; num_cells + 1];
        let mut total = 0usize;
        for splat in splats {
            Self::each_cell(splat, grid, &level_start, max_level, |pos| {
                start[pos] += 1;
                total += 1;
            });
        }
        if total > u32::MAX as usize {
            return Err(Error::OutOfRange("too many tree entries"));
        }

        // Step 2: exclusive prefix sum, turning counts into cell offsets.
        let mut sum = 0u32;
        for entry in start.iter_mut() {
            let next = sum + *entry;
            *entry = sum;
            sum = next;
        }

        // Step 3: scatter splat ids; input order keeps each cell's list
        // sorted by splat id.
        let mut ids = vec![0u32; total];
        let mut cursors = start[..num_cells].to_vec();
        for (id, splat) in splats.iter().enumerate() {
            Self::each_cell(splat, grid, &level_start, max_level, |pos| {
                ids[cursors[pos] as usize] = id as u32;
                cursors[pos] += 1;
            });
        }

        Ok(Self {
            max_level,
            level_start,
            start,
            ids,
        })
    }

    /// Invoke `emit` with the flat cell position of every cell the splat
    /// occupies at its placement level.
    fn each_cell<F>(splat: &Splat, grid: &Grid, level_start: &[u32], max_level: u32, mut emit: F)
    where
        F: FnMut(usize),
    {
        let vlo = grid.world_to_vertex(splat.cube_min()).to_array();
        let vhi = grid.world_to_vertex(splat.cube_max()).to_array();

        // Clamp to the boundary vertex planes: splats straddling neighbouring
        // buckets overhang this grid, and only the vertices inside the cube
        // matter. A cube holding no vertex of this grid yields no entry.
        let mut ilo = [0i32; 3];
        let mut ihi = [0i32; 3];
        for axis in 0..3 {
            let verts = grid.num_vertices(axis) as i32;
            ilo[axis] = (vlo[axis].ceil() as i32).max(0);
            ihi[axis] = (vhi[axis].floor() as i32).min(verts - 1);
        }

        // Smallest shift putting the cube within a 2x2x2 vertex neighbourhood.
        let mut shift = 0u32;
        for axis in 0..3 {
            while (ihi[axis] >> shift) - (ilo[axis] >> shift) > 1 {
                shift += 1;
            }
        }
        debug_assert!(shift <= max_level);
        let level = max_level - shift;
        let base = level_start[level as usize];

        for z in (ilo[2] >> shift)..=(ihi[2] >> shift) {
            for y in (ilo[1] >> shift)..=(ihi[1] >> shift) {
                for x in (ilo[0] >> shift)..=(ihi[0] >> shift) {
                    let code = morton3(x as u32, y as u32, z as u32);
                    emit((base + code) as usize);
                }
            }
        }
    }

    /// Deepest level of the tree; level cells halve in size per level.
    #[inline]
    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    #[inline]
    pub fn num_levels(&self) -> u32 {
        self.max_level + 1
    }

    /// Prefix sum addressing the cells of each level:
    /// `level_start[i + 1] - level_start[i] == 8^i`.
    #[inline]
    pub fn level_start(&self) -> &[u32] {
        &self.level_start
    }

    /// Per-cell offsets into [`ids`](Self::ids); non-decreasing, with the
    /// last entry equal to `ids().len()`.
    #[inline]
    pub fn start(&self) -> &[u32] {
        &self.start
    }

    /// Concatenated per-cell splat-id lists, in Morton order of cells.
    #[inline]
    pub fn ids(&self) -> &[u32] {
        &self.ids
    }

    /// Splat ids assigned to the cell at `level` with Morton code `code`.
    pub fn cell_splats(&self, level: u32, code: u32) -> &[u32] {
        let pos = (self.level_start[level as usize] + code) as usize;
        &self.ids[self.start[pos] as usize..self.start[pos + 1] as usize]
    }
}
