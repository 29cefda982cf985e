//! Recursive partitioning of a splat stream into bounded buckets.
//!
//! Given an enclosing grid, [`bucket`] emits a sequence of disjoint sub-grids
//! ("buckets"), each holding at most `max_splats` splats and spanning at most
//! `max_cells` cells per axis, together with run-length ranges referencing
//! exactly the splats whose bounding cubes intersect the sub-grid. Splats
//! straddling a boundary appear in every bucket they touch.
//!
//! Refinement works on a micro-cell lattice: the region is tiled by
//! micro-cells, an octree histogram over them is built in one forward sweep of
//! the splats, and a pruned octree walk picks at most `max_split` sub-regions
//! to recurse into. A micro-cell shrinks to a single grid cell once the
//! region's extent fits the cell budget; a single cell covered by more splats
//! than the budget cannot be split further and aborts the partition.

use smallvec::SmallVec;

use crate::error::Error;
use crate::grid::Grid;
use crate::node::{ceil_log2, for_each_node, Node};
use crate::range::{Range, RangeCollector, RangeCounter};
use crate::source::{for_each_splat, full_ranges, SplatSource};
use crate::splat::Splat;

/// Limits every emitted bucket must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct BucketParams {
    /// Maximum splats referenced by one bucket.
    pub max_splats: u64,
    /// Maximum cells per bucket along each axis.
    pub max_cells: u32,
    /// Maximum sub-regions one refinement step may produce; at least 8.
    pub max_split: usize,
}

/// Progress through the partition, as seen by the sink.
#[derive(Debug, Clone, Copy)]
pub struct Recursion {
    /// Refinement depth at which the bucket was emitted.
    pub depth: u32,
    /// Cells of the enclosing grid fully processed before this bucket;
    /// monotonically non-decreasing over the emission sequence.
    pub cells_done: u64,
    /// Total cells of the enclosing grid; fixed for the whole run.
    pub cells_total: u64,
}

/// One emitted bucket: a sub-grid of the enclosing grid, ranges referencing
/// every splat whose bounding cube intersects it, and progress state.
///
/// The range slice is borrowed from the partitioner and is only valid for the
/// duration of the sink call.
pub struct Bucket<'a, S: SplatSource + ?Sized> {
    pub splats: &'a S,
    pub num_splats: u64,
    pub ranges: &'a [Range],
    pub grid: Grid,
    pub recursion: Recursion,
}

/// Partition the splats intersecting `bbox` into buckets and feed them to
/// `sink` in a deterministic depth-first order.
///
/// Splats whose bounding cubes miss `bbox` entirely are dropped up front;
/// cubes clipping the boundary count only for the part inside. With zero
/// surviving splats no bucket is emitted. Errors from the sink abort the
/// partition and propagate unchanged; [`Error::Density`] is raised when some
/// single cell is covered by more than `max_splats` splats.
pub fn bucket<S, F, E>(splats: &S, bbox: &Grid, params: BucketParams, mut sink: F) -> Result<(), E>
where
    S: SplatSource + ?Sized,
    F: FnMut(Bucket<'_, S>) -> Result<(), E>,
    E: From<Error>,
{
    if params.max_splats == 0 || params.max_cells == 0 {
        return Err(Error::InvalidArgument("bucket limits must be positive").into());
    }
    if params.max_split < 8 {
        return Err(Error::InvalidArgument("max_split must be at least 8").into());
    }

    // Clip pass: drop splats missing the enclosing grid and coalesce the
    // survivors. Counting first sizes the range list exactly.
    let all = full_ranges(splats).map_err(E::from)?;
    let mut counter = RangeCounter::new();
    for_each_splat(splats, &all, |scan, index, splat| {
        if clipped_cells(splat, bbox).is_some() {
            counter.append(scan, index);
        }
    });
    let num_splats = counter.num_splats();
    let mut root = Vec::with_capacity(counter.num_ranges() as usize);
    {
        let mut collector = RangeCollector::new(&mut root);
        for_each_splat(splats, &all, |scan, index, splat| {
            if clipped_cells(splat, bbox).is_some() {
                collector.append(scan, index);
            }
        });
    }

    let mut walk = Walk {
        cells_done: 0,
        cells_total: bbox.total_cells(),
    };
    recurse(splats, bbox, root, num_splats, &params, 0, &mut walk, &mut sink)?;
    debug_assert_eq!(walk.cells_done, walk.cells_total);
    Ok(())
}

/// Mutable progress threaded through the recursion.
struct Walk {
    cells_done: u64,
    cells_total: u64,
}

#[allow(clippy::too_many_arguments)]
fn recurse<S, F, E>(
    splats: &S,
    grid: &Grid,
    ranges: Vec<Range>,
    num_splats: u64,
    params: &BucketParams,
    depth: u32,
    walk: &mut Walk,
    sink: &mut F,
) -> Result<(), E>
where
    S: SplatSource + ?Sized,
    F: FnMut(Bucket<'_, S>) -> Result<(), E>,
    E: From<Error>,
{
    let cells = [grid.num_cells(0), grid.num_cells(1), grid.num_cells(2)];
    let region_cells = grid.total_cells();
    if num_splats == 0 {
        walk.cells_done += region_cells;
        return Ok(());
    }

    let max_dim = cells.into_iter().max().unwrap();
    if num_splats <= params.max_splats && max_dim <= params.max_cells {
        sink(Bucket {
            splats,
            num_splats,
            ranges: &ranges,
            grid: grid.clone(),
            recursion: Recursion {
                depth,
                cells_done: walk.cells_done,
                cells_total: walk.cells_total,
            },
        })?;
        walk.cells_done += region_cells;
        return Ok(());
    }

    // Pick the micro-cell size: whole cell-budget blocks while the region is
    // larger than a block, single cells once it fits. Doubled until the
    // micro lattice is no finer than the fan-out limit, which also bounds the
    // histogram.
    let mut micro_size = if max_dim > params.max_cells {
        params.max_cells
    } else {
        1
    };
    let mut micro;
    loop {
        micro = cells.map(|c| c.div_ceil(micro_size));
        let lattice = micro.iter().map(|&m| m as u64).product::<u64>();
        if lattice <= params.max_split as u64 {
            break;
        }
        micro_size *= 2;
    }

    if micro == [1, 1, 1] {
        // A single micro-cell that violates the budget is only reachable for
        // a single over-full grid cell, which no split can fix.
        debug_assert_eq!(micro_size, 1);
        return Err(Error::Density {
            cell_splats: num_splats,
        }
        .into());
    }

    let root_level = ceil_log2(micro.into_iter().max().unwrap());
    let hist = Histogram::build(splats, grid, &ranges, micro, micro_size, root_level);
    if micro_size == 1 {
        if let Some(cell_splats) = hist.worst_cell_over(params.max_splats) {
            return Err(Error::Density { cell_splats }.into());
        }
    }

    // Pick pass: descend while a node violates the budget and still carries
    // enough splats for the split to pay off; every refused node becomes a
    // sub-region. The root always descends, so sub-regions strictly shrink.
    let threshold = (num_splats / params.max_split as u64).max(1);
    let mut picked: Vec<Node> = Vec::new();
    for_each_node(micro, root_level, |node| {
        if node.level() == root_level {
            return true;
        }
        let count = hist.count(node);
        let extent = clipped_extent(node, micro, micro_size, cells);
        let violates = count > params.max_splats || extent > params.max_cells;
        if violates && count >= threshold && node.level() > 0 {
            return true;
        }
        picked.push(*node);
        false
    })
    .map_err(E::from)?;

    // Ownership map over micro-cells; the picked nodes tile the region.
    let micro_dims = [micro[0] as usize, micro[1] as usize, micro[2] as usize];
    let mut owner = vec![u32::MAX; micro_dims[0] * micro_dims[1] * micro_dims[2]];
    for (index, node) in picked.iter().enumerate() {
        let (lo, hi) = node.micro_box_clamped(micro);
        for z in lo[2]..hi[2] {
            for y in lo[1]..hi[1] {
                for x in lo[0]..hi[0] {
                    let cell = (z as usize * micro_dims[1] + y as usize) * micro_dims[0]
                        + x as usize;
                    owner[cell] = index as u32;
                }
            }
        }
    }
    debug_assert!(owner.iter().all(|&o| o != u32::MAX));

    // Filter pass: hand every splat to each sub-region its cube touches.
    let mut lists: Vec<Vec<Range>> = vec![Vec::new(); picked.len()];
    let mut counts = vec![0u64; picked.len()];
    {
        let mut collectors: Vec<RangeCollector<&mut Vec<Range>>> =
            lists.iter_mut().map(RangeCollector::new).collect();
        for_each_splat(splats, &ranges, |scan, index, splat| {
            let Some((lo, hi)) = clipped_cells(splat, grid) else {
                return;
            };
            let mut seen: SmallVec<[u32; 8]> = SmallVec::new();
            for z in (lo[2] as u32 / micro_size)..=(hi[2] as u32 / micro_size) {
                for y in (lo[1] as u32 / micro_size)..=(hi[1] as u32 / micro_size) {
                    for x in (lo[0] as u32 / micro_size)..=(hi[0] as u32 / micro_size) {
                        let cell = (z as usize * micro_dims[1] + y as usize) * micro_dims[0]
                            + x as usize;
                        let region = owner[cell];
                        if !seen.contains(&region) {
                            seen.push(region);
                            collectors[region as usize].append(scan, index);
                            counts[region as usize] += 1;
                        }
                    }
                }
            }
        });
        // Collectors flush their buffered tail range on drop.
    }
    drop(ranges);
    drop(owner);

    for (index, node) in picked.iter().enumerate() {
        let (lo, hi) = node.micro_box_clamped(micro);
        let mut sub_lo = [0i32; 3];
        let mut sub_hi = [0i32; 3];
        for axis in 0..3 {
            let (lower, _) = grid.extent(axis);
            sub_lo[axis] = lower + (lo[axis] * micro_size) as i32;
            sub_hi[axis] = lower + (hi[axis] * micro_size).min(cells[axis]) as i32;
        }
        let sub = grid.sub_grid(sub_lo, sub_hi);
        let sub_ranges = std::mem::take(&mut lists[index]);
        recurse(
            splats,
            &sub,
            sub_ranges,
            counts[index],
            params,
            depth + 1,
            walk,
            sink,
        )?;
    }
    Ok(())
}

/// Cells of `grid` covered by the splat's bounding cube, clipped to the grid;
/// `None` when the cube misses the grid. Coordinates are local to the grid.
///
/// The cube is floored in the reference frame of the grid's reference point,
/// not its extent corner, so every sub-grid of one enclosing grid assigns a
/// splat to exactly the same world cells.
fn clipped_cells(splat: &Splat, grid: &Grid) -> Option<([i32; 3], [i32; 3])> {
    let vlo = ((splat.cube_min() - grid.reference()) / grid.spacing()).to_array();
    let vhi = ((splat.cube_max() - grid.reference()) / grid.spacing()).to_array();
    let mut lo = [0i32; 3];
    let mut hi = [0i32; 3];
    for axis in 0..3 {
        let (lower, upper) = grid.extent(axis);
        lo[axis] = (vlo[axis].floor() as i32).max(lower) - lower;
        hi[axis] = (vhi[axis].floor() as i32).min(upper - 1) - lower;
        if lo[axis] > hi[axis] {
            return None;
        }
    }
    Some((lo, hi))
}

/// Largest clipped cell extent of a node, over the three axes.
fn clipped_extent(node: &Node, micro: [u32; 3], micro_size: u32, cells: [u32; 3]) -> u32 {
    let (lo, hi) = node.micro_box_clamped(micro);
    (0..3)
        .map(|axis| (hi[axis] * micro_size).min(cells[axis]) - lo[axis] * micro_size)
        .max()
        .unwrap()
}

/// Distinct-splat counts for every octree node over the micro lattice,
/// gathered in one forward sweep: each splat increments the covered node box
/// once per level, so straddling splats are never double counted.
struct Histogram {
    micro: [u32; 3],
    /// One flat count array per level; index 0 is micro-cell resolution.
    levels: Vec<Vec<u64>>,
}

impl Histogram {
    fn dims(micro: [u32; 3], level: u32) -> [u32; 3] {
        micro.map(|m| m.div_ceil(1 << level))
    }

    fn build<S>(
        splats: &S,
        grid: &Grid,
        ranges: &[Range],
        micro: [u32; 3],
        micro_size: u32,
        root_level: u32,
    ) -> Self
    where
        S: SplatSource + ?Sized,
    {
        let mut levels: Vec<Vec<u64>> = (0..=root_level)
            .map(|level| {
                let d = Self::dims(micro, level);
                vec![0u64; d[0] as usize * d[1] as usize * d[2] as usize]
            })
            .collect();

        for_each_splat(splats, ranges, |_, _, splat| {
            let Some((lo, hi)) = clipped_cells(splat, grid) else {
                return;
            };
            let mlo = lo.map(|c| c as u32 / micro_size);
            let mhi = hi.map(|c| c as u32 / micro_size);
            for (level, counts) in levels.iter_mut().enumerate() {
                let d = Self::dims(micro, level as u32);
                for z in (mlo[2] >> level)..=(mhi[2] >> level) {
                    for y in (mlo[1] >> level)..=(mhi[1] >> level) {
                        for x in (mlo[0] >> level)..=(mhi[0] >> level) {
                            let cell =
                                (z as usize * d[1] as usize + y as usize) * d[0] as usize
                                    + x as usize;
                            counts[cell] += 1;
                        }
                    }
                }
            }
        });

        Self { micro, levels }
    }

    fn count(&self, node: &Node) -> u64 {
        let d = Self::dims(self.micro, node.level());
        let c = node.coords();
        self.levels[node.level() as usize]
            [(c[2] as usize * d[1] as usize + c[1] as usize) * d[0] as usize + c[0] as usize]
    }

    /// Worst micro-cell count above `limit`, if any.
    fn worst_cell_over(&self, limit: u64) -> Option<u64> {
        self.levels[0].iter().copied().filter(|&c| c > limit).max()
    }
}
