//! Splat sources: random-access scan collections feeding the partitioner.

use crate::error::Error;
use crate::range::Range;
use crate::splat::Splat;

/// Splats read per chunk when sweeping ranges.
const READ_CHUNK: usize = 8192;

/// Random-access collection of splat scans.
///
/// Implementations may be memory-resident vectors, memory-mapped files or any
/// other random-access storage. Reads may block, but must not fail once the
/// source is open; I/O errors surface when the source is constructed.
pub trait SplatSource {
    /// Number of scans.
    fn num_scans(&self) -> usize;

    /// Number of splats in `scan`.
    fn scan_size(&self, scan: u32) -> u64;

    /// Copy splats `[first, last)` of `scan` into `out`.
    ///
    /// # Panics
    /// When the range is out of bounds or `out` is shorter than the range.
    fn read(&self, scan: u32, first: u64, last: u64, out: &mut [Splat]);
}

/// In-memory splat source; one inner vector per scan.
#[derive(Debug, Default, Clone)]
pub struct VecSource {
    scans: Vec<Vec<Splat>>,
}

impl VecSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_scans(scans: Vec<Vec<Splat>>) -> Self {
        Self { scans }
    }

    pub fn push_scan(&mut self, splats: Vec<Splat>) {
        self.scans.push(splats);
    }

    pub fn total_splats(&self) -> u64 {
        self.scans.iter().map(|s| s.len() as u64).sum()
    }
}

impl SplatSource for VecSource {
    fn num_scans(&self) -> usize {
        self.scans.len()
    }

    fn scan_size(&self, scan: u32) -> u64 {
        self.scans[scan as usize].len() as u64
    }

    fn read(&self, scan: u32, first: u64, last: u64, out: &mut [Splat]) {
        let scan = &self.scans[scan as usize];
        assert!(first <= last && last <= scan.len() as u64, "read out of bounds");
        let n = (last - first) as usize;
        out[..n].copy_from_slice(&scan[first as usize..last as usize]);
    }
}

/// Visit every splat referenced by `ranges` in order, reading from the source
/// in fixed-size chunks. The visitor receives `(scan, index, splat)`.
pub fn for_each_splat<S, F>(splats: &S, ranges: &[Range], mut visit: F)
where
    S: SplatSource + ?Sized,
    F: FnMut(u32, u64, &Splat),
{
    let mut buf = vec![Splat::default(); READ_CHUNK];
    for range in ranges {
        let mut first = range.start;
        let last = range.end();
        while first < last {
            let n = ((last - first) as usize).min(READ_CHUNK);
            splats.read(range.scan, first, first + n as u64, &mut buf[..n]);
            for (i, splat) in buf[..n].iter().enumerate() {
                visit(range.scan, first + i as u64, splat);
            }
            first += n as u64;
        }
    }
}

/// Ranges covering every splat of every scan, split so each range size fits
/// its 32-bit counter. Fails when the source has more scans than a 32-bit
/// index can name.
pub(crate) fn full_ranges<S>(splats: &S) -> Result<Vec<Range>, Error>
where
    S: SplatSource + ?Sized,
{
    if splats.num_scans() > u32::MAX as usize {
        return Err(Error::OutOfRange("too many input scans"));
    }
    let mut ranges = Vec::new();
    for scan in 0..splats.num_scans() as u32 {
        let size = splats.scan_size(scan);
        let mut start = 0u64;
        while start < size {
            let chunk = (size - start).min(u32::MAX as u64) as u32;
            ranges.push(Range::new(scan, start, chunk)?);
            start += chunk as u64;
        }
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    /// Splats that encode their own identity: position.x = scan, .y = index.
    fn tagged_source(num_scans: usize, scan_size: usize) -> VecSource {
        let scans = (0..num_scans)
            .map(|scan| {
                (0..scan_size)
                    .map(|i| {
                        Splat::new(Vec3::new(scan as f32, i as f32, 0.0), 1.0, Vec3::X)
                    })
                    .collect()
            })
            .collect();
        VecSource::from_scans(scans)
    }

    #[test]
    fn sweep_visits_ranges_in_order() {
        let source = tagged_source(3, 50_000);
        let ranges = vec![
            Range::new(0, 0, 1).unwrap(),
            Range::new(0, 2, 3).unwrap(),
            Range::new(1, 2, 3).unwrap(),
            // Larger than one read chunk, to exercise buffering.
            Range::new(2, 100, 40_000).unwrap(),
        ];

        let mut expected = Vec::new();
        for range in &ranges {
            for i in 0..range.size as u64 {
                expected.push((range.scan, range.start + i));
            }
        }

        let mut actual = Vec::new();
        for_each_splat(&source, &ranges, |scan, index, splat| {
            // The identity encoded in the splat matches what the sweep reports.
            assert_eq!(splat.position.x as u32, scan);
            assert_eq!(splat.position.y as u64, index);
            actual.push((scan, index));
        });
        assert_eq!(actual, expected);
    }

    #[test]
    fn sweep_of_no_ranges_is_empty() {
        let source = tagged_source(2, 10);
        let mut count = 0;
        for_each_splat(&source, &[], |_, _, _| count += 1);
        assert_eq!(count, 0);
    }

    #[test]
    fn full_ranges_cover_all_scans() {
        let source = tagged_source(3, 7);
        let ranges = full_ranges(&source).unwrap();
        assert_eq!(
            ranges,
            vec![
                Range::new(0, 0, 7).unwrap(),
                Range::new(1, 0, 7).unwrap(),
                Range::new(2, 0, 7).unwrap(),
            ]
        );
    }
}
