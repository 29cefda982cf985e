//! Benchmark the partitioning and indexing pipeline at various scales.
//!
//! Run with: cargo run --release --bin bench_bucket
//!
//! Usage:
//!   bench_bucket                 Run default size (100k)
//!   bench_bucket 100k 1m 10m     Run multiple sizes
//!   bench_bucket --box           Use a volume-filling cloud instead of a sphere
//!   bench_bucket --scans 8       Split the cloud across several scans
//!
//! Set RUST_LOG=debug for per-phase timings.

use clap::Parser;
use glam::Vec3;
use mlsplat::cloud;
use mlsplat::util::Phase;
use splat_index::{bucket, drive, make_grid, BucketParams, VecSource};
use std::time::Instant;

fn parse_count(s: &str) -> Result<usize, String> {
    let s = s.to_lowercase();
    let (num_str, multiplier) = if s.ends_with('m') {
        (&s[..s.len() - 1], 1_000_000)
    } else if s.ends_with('k') {
        (&s[..s.len() - 1], 1_000)
    } else {
        (s.as_str(), 1)
    };

    num_str
        .parse::<f64>()
        .map(|n| (n * multiplier as f64) as usize)
        .map_err(|e| format!("Invalid number '{}': {}", s, e))
}

#[derive(Parser)]
#[command(name = "bench_bucket")]
#[command(about = "Benchmark splat bucketing and octree indexing")]
struct Args {
    /// Splat counts to benchmark (e.g., 100k, 1m, 10M)
    #[arg(value_parser = parse_count)]
    sizes: Vec<usize>,

    /// Random seed
    #[arg(short, long, default_value_t = 12345)]
    seed: u64,

    /// Number of input scans to split the cloud across
    #[arg(long, default_value_t = 4)]
    scans: usize,

    /// Use a volume-filling box cloud instead of a sphere surface
    #[arg(long = "box")]
    box_cloud: bool,

    /// Maximum splats per bucket
    #[arg(long, default_value_t = 100_000)]
    max_splats: u64,

    /// Maximum cells per bucket along each axis
    #[arg(long, default_value_t = 63)]
    max_cells: u32,

    /// Maximum fan-out per refinement step
    #[arg(long, default_value_t = 1 << 20)]
    max_split: usize,
}

fn generate(args: &Args, n: usize) -> (VecSource, f32) {
    if args.box_cloud {
        let side = (n as f32).cbrt().max(1.0);
        let splats = cloud::uniform_box_splats(
            n,
            Vec3::ZERO,
            Vec3::splat(side),
            (0.4, 1.2),
            args.seed,
        );
        (VecSource::from_scans(cloud::into_scans(splats, args.scans)), 1.0)
    } else {
        let spacing = cloud::mean_spacing(n, 1.0);
        let splats = cloud::fibonacci_sphere_splats(n, 1.0, 2.0, 0.3, args.seed);
        (VecSource::from_scans(cloud::into_scans(splats, args.scans)), spacing)
    }
}

fn run(args: &Args, n: usize) {
    let gen_phase = Phase::new("generate");
    let (source, spacing) = generate(args, n);
    gen_phase.finish_with_rate(n as u64);

    let params = BucketParams {
        max_splats: args.max_splats,
        max_cells: args.max_cells,
        max_split: args.max_split,
    };

    let grid_phase = Phase::new("bbox");
    let grid = make_grid(&source, spacing).expect("bounding grid");
    grid_phase.finish_with_rate(n as u64);
    log::info!(
        "grid: {} x {} x {} cells at spacing {:.5}",
        grid.num_cells(0),
        grid.num_cells(1),
        grid.num_cells(2),
        grid.spacing()
    );

    // Partition only: measures the bucketer without tree construction.
    let bucket_phase = Phase::new("bucket");
    let mut buckets = 0u64;
    let mut instances = 0u64;
    let mut max_depth = 0u32;
    bucket(&source, &grid, params, |b| {
        buckets += 1;
        instances += b.num_splats;
        max_depth = max_depth.max(b.recursion.depth);
        Ok::<(), splat_index::Error>(())
    })
    .expect("bucketing");
    bucket_phase.finish_with_rate(n as u64);

    // Full pipeline: partition, load, and build a tree per bucket.
    let start = Instant::now();
    let mut tree_entries = 0u64;
    drive(&source, &grid, params, |block| {
        tree_entries += block.tree.ids().len() as u64;
        Ok::<(), splat_index::Error>(())
    })
    .expect("pipeline");
    let pipeline_secs = start.elapsed().as_secs_f64();

    println!(
        "{:>10} splats: {:>6} buckets (depth {}, {:.2}x duplication), \
         {:>8} tree entries, pipeline {:.3}s ({:.2}M splats/s)",
        n,
        buckets,
        max_depth,
        instances as f64 / n as f64,
        tree_entries,
        pipeline_secs,
        n as f64 / pipeline_secs / 1.0e6
    );
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let sizes = if args.sizes.is_empty() {
        vec![100_000]
    } else {
        args.sizes.clone()
    };

    for &n in &sizes {
        run(&args, n);
    }
}
