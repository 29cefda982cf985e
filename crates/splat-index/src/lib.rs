//! Spatial partitioning and octree indexing for oriented splat clouds.
//!
//! This crate takes an unstructured stream of radius-bearing surface samples
//! ("splats") and prepares it for block-wise implicit-surface evaluation:
//!
//! - [`make_grid`] encloses the cloud in a regular lattice;
//! - [`bucket`] recursively partitions the lattice into disjoint sub-grids,
//!   each within a splat-count and cell-extent budget, referencing its splats
//!   through run-length [`Range`]s;
//! - [`SplatTree`] builds a flat, prefix-summed sparse octree over one
//!   bucket's splats for cell lookups during evaluation;
//! - [`drive`] wires the three together and feeds [`Block`]s to a downstream
//!   consumer.
//!
//! The crate is single-threaded and performs no I/O of its own: splats come
//! from a caller-supplied random-access [`SplatSource`], and results leave
//! through caller-supplied sinks.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use splat_index::{drive, make_grid, BucketParams, Splat, VecSource};
//!
//! let scan: Vec<Splat> = (0..64)
//!     .map(|i| Splat::new(Vec3::new(i as f32 * 0.1, 0.0, 0.0), 0.2, Vec3::Z))
//!     .collect();
//! let splats = VecSource::from_scans(vec![scan]);
//!
//! let grid = make_grid(&splats, 0.1).unwrap();
//! let params = BucketParams {
//!     max_splats: 16,
//!     max_cells: 32,
//!     max_split: 1024,
//! };
//! let mut blocks = 0;
//! drive(&splats, &grid, params, |block| {
//!     assert!(block.splats.len() <= 16);
//!     assert_eq!(*block.tree.start().last().unwrap() as usize, block.tree.ids().len());
//!     blocks += 1;
//!     Ok::<(), splat_index::Error>(())
//! })
//! .unwrap();
//! assert!(blocks > 0);
//! ```

mod bucket;
mod error;
mod grid;
mod node;
mod pipeline;
mod range;
mod source;
mod splat;
mod tree;

pub use bucket::{bucket, Bucket, BucketParams, Recursion};
pub use error::Error;
pub use grid::{Grid, MAX_DIMENSION};
pub use pipeline::{drive, make_grid, Block};
pub use range::{Range, RangeCollector, RangeCounter, RangeSink};
pub use source::{for_each_splat, SplatSource, VecSource};
pub use splat::Splat;
pub use tree::{SplatTree, MAX_LEVELS};
