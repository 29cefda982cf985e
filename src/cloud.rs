//! Synthetic splat clouds for benchmarks and end-to-end tests.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use splat_index::Splat;

/// Mean spacing between `n` samples spread over a sphere of radius `r`.
pub fn mean_spacing(n: usize, r: f32) -> f32 {
    if n == 0 {
        return 0.0;
    }
    (4.0 * std::f32::consts::PI * r * r / n as f32).sqrt()
}

/// Splats sampling the surface of a sphere along a Fibonacci spiral, with
/// outward normals and influence radii tied to the mean sample spacing.
///
/// `radius_scale` controls splat overlap: 1.0 gives radii equal to the mean
/// spacing, 2.0 the usual healthy overlap for moving-least-squares fits.
/// `jitter` perturbs positions by a fraction of the spacing to break the
/// spiral's regularity.
pub fn fibonacci_sphere_splats(
    n: usize,
    sphere_radius: f32,
    radius_scale: f32,
    jitter: f32,
    seed: u64,
) -> Vec<Splat> {
    use std::f32::consts::PI;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let golden_angle = PI * (3.0 - 5.0f32.sqrt());
    let spacing = mean_spacing(n, sphere_radius);
    let splat_radius = radius_scale * spacing;

    (0..n)
        .map(|i| {
            let y = 1.0 - (2.0 * i as f32 + 1.0) / n as f32;
            let ring = (1.0 - y * y).sqrt();
            let theta = golden_angle * i as f32;

            let mut p = Vec3::new(ring * theta.cos(), y, ring * theta.sin());
            if jitter > 0.0 {
                let amount = jitter * spacing / sphere_radius;
                p += Vec3::new(
                    rng.gen_range(-amount..amount),
                    rng.gen_range(-amount..amount),
                    rng.gen_range(-amount..amount),
                );
            }
            let normal = p.normalize();
            Splat::new(normal * sphere_radius, splat_radius, normal)
        })
        .collect()
}

/// Splats uniformly filling an axis-aligned box, with random orientations.
/// Useful for stressing the partitioner with volume-filling input.
pub fn uniform_box_splats(
    n: usize,
    min: Vec3,
    max: Vec3,
    radius_range: (f32, f32),
    seed: u64,
) -> Vec<Splat> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let p = Vec3::new(
                rng.gen_range(min.x..max.x),
                rng.gen_range(min.y..max.y),
                rng.gen_range(min.z..max.z),
            );
            let normal = loop {
                let v = Vec3::new(
                    rng.gen_range(-1.0..1.0f32),
                    rng.gen_range(-1.0..1.0f32),
                    rng.gen_range(-1.0..1.0f32),
                );
                let len = v.length();
                if len > 1e-3 && len <= 1.0 {
                    break v / len;
                }
            };
            Splat::new(p, rng.gen_range(radius_range.0..radius_range.1), normal)
        })
        .collect()
}

/// Split a cloud into `scans` roughly equal pieces, mimicking multi-file
/// capture sessions.
pub fn into_scans(cloud: Vec<Splat>, scans: usize) -> Vec<Vec<Splat>> {
    let scans = scans.max(1);
    let per_scan = cloud.len().div_ceil(scans);
    let mut out: Vec<Vec<Splat>> = Vec::with_capacity(scans);
    let mut rest = cloud;
    while rest.len() > per_scan {
        let tail = rest.split_off(per_scan);
        out.push(rest);
        rest = tail;
    }
    out.push(rest);
    out
}
