//! Run-length references to consecutive splats within one scan.

use crate::error::Error;

/// A contiguous block of splat indices within one input scan.
///
/// An empty range has `size == 0`; collectors never emit one. The invariant
/// `start + size - 1 <= u64::MAX` is maintained by [`Range::new`] and
/// [`Range::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    /// Index of the originating scan.
    pub scan: u32,
    /// Number of splats referenced.
    pub size: u32,
    /// Index of the first splat within the scan.
    pub start: u64,
}

impl Range {
    /// An empty range (sentinel; never emitted by collectors).
    pub const fn empty() -> Self {
        Self {
            scan: 0,
            size: 0,
            start: 0,
        }
    }

    /// A range holding the single splat `(scan, splat)`.
    pub const fn single(scan: u32, splat: u64) -> Self {
        Self {
            scan,
            size: 1,
            start: splat,
        }
    }

    /// A range holding `size` splats starting at `(scan, start)`.
    ///
    /// Fails when the last referenced index would not fit in 64 bits.
    pub fn new(scan: u32, start: u64, size: u32) -> Result<Self, Error> {
        if size > 0 && start.checked_add(size as u64 - 1).is_none() {
            return Err(Error::OutOfRange("splat range end exceeds a 64-bit index"));
        }
        Ok(Self { scan, size, start })
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// One past the last referenced splat index, or `start` when empty.
    #[inline]
    pub fn end(&self) -> u64 {
        self.start + self.size as u64
    }

    /// Attempt to extend this range with one splat.
    ///
    /// Succeeds iff the range is empty (initializing it), or `(scan, splat)`
    /// is the immediate successor of the last element and the size counter
    /// has room. On failure the range is unchanged.
    pub fn append(&mut self, scan: u32, splat: u64) -> bool {
        if self.size == 0 {
            *self = Range::single(scan, splat);
            return true;
        }
        let successor = scan == self.scan
            && splat.checked_sub(self.start) == Some(self.size as u64)
            && self.size < u32::MAX;
        if successor {
            self.size += 1;
        }
        successor
    }
}

/// Receives completed ranges from a [`RangeCollector`].
pub trait RangeSink {
    fn accept(&mut self, range: Range);
}

impl RangeSink for Vec<Range> {
    fn accept(&mut self, range: Range) {
        self.push(range);
    }
}

impl<S: RangeSink + ?Sized> RangeSink for &mut S {
    fn accept(&mut self, range: Range) {
        (**self).accept(range);
    }
}

/// Coalesces a monotone stream of `(scan, splat)` identifiers into a minimal
/// run-length sequence of ranges.
///
/// The caller must present runs of consecutive indices within one scan
/// contiguously; the collector does not sort. Buffered state is flushed on
/// drop, so scoped use emits every range; [`flush`](Self::flush) exists for
/// re-use of one collector across phases.
pub struct RangeCollector<S: RangeSink> {
    current: Range,
    sink: S,
}

impl<S: RangeSink> RangeCollector<S> {
    pub fn new(sink: S) -> Self {
        Self {
            current: Range::empty(),
            sink,
        }
    }

    /// Add one splat to the stream.
    pub fn append(&mut self, scan: u32, splat: u64) {
        if !self.current.append(scan, splat) {
            self.sink.accept(self.current);
            self.current = Range::single(scan, splat);
        }
    }

    /// Emit the buffered range, if any.
    pub fn flush(&mut self) {
        if !self.current.is_empty() {
            self.sink.accept(self.current);
            self.current = Range::empty();
        }
    }
}

impl<S: RangeSink> Drop for RangeCollector<S> {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Counts the ranges and splats a [`RangeCollector`] would produce for the
/// same input, without storing them. Used to pre-size range storage.
#[derive(Debug, Clone, Copy)]
pub struct RangeCounter {
    ranges: u64,
    splats: u64,
    current: Range,
}

impl RangeCounter {
    pub fn new() -> Self {
        Self {
            ranges: 0,
            splats: 0,
            current: Range::empty(),
        }
    }

    /// Add one splat to the virtual stream.
    pub fn append(&mut self, scan: u32, splat: u64) {
        if !self.current.append(scan, splat) {
            self.ranges += 1;
            self.current = Range::single(scan, splat);
        }
        self.splats += 1;
    }

    /// Ranges required to encode the splats seen so far.
    pub fn num_ranges(&self) -> u64 {
        self.ranges + !self.current.is_empty() as u64
    }

    /// Splats seen so far.
    pub fn num_splats(&self) -> u64 {
        self.splats
    }
}

impl Default for RangeCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn construct() {
        let empty = Range::empty();
        assert_eq!(empty.size, 0);

        let single = Range::single(3, 6);
        assert_eq!((single.scan, single.start, single.size), (3, 6, 1));

        let range = Range::new(2, 0xFFFF_FFFF_FFFF_FFF0, 0x10).unwrap();
        assert_eq!((range.scan, range.start, range.size), (2, 0xFFFF_FFFF_FFFF_FFF0, 0x10));

        // One splat past the representable end.
        assert_eq!(
            Range::new(2, 0xFFFF_FFFF_FFFF_FFF0, 0x11),
            Err(Error::OutOfRange("splat range end exceeds a 64-bit index"))
        );
    }

    #[test]
    fn append_empty_initializes() {
        let mut range = Range::empty();
        assert!(range.append(3, 6));
        assert_eq!((range.scan, range.start, range.size), (3, 6, 1));
    }

    #[test]
    fn append_refuses_size_overflow() {
        let mut range = Range {
            scan: 3,
            start: 0x9000_0000,
            size: u32::MAX,
        };
        assert!(!range.append(3, range.end()));
        assert_eq!(range.size, u32::MAX);
        assert_eq!(range.start, 0x9000_0000);
    }

    #[test]
    fn append_refuses_interior_index() {
        let mut range = Range {
            scan: 4,
            start: 0x1234_5678_1234,
            size: 0x10000,
        };
        assert!(!range.append(4, 0x1234_5678_FFFF));
        assert_eq!(range.size, 0x10000);
    }

    #[test]
    fn append_extends_at_end() {
        let mut range = Range {
            scan: 4,
            start: 0x1234_5678_1234,
            size: 0x10000,
        };
        assert!(range.append(4, range.end()));
        assert_eq!(range.size, 0x10001);
        assert_eq!(range.start, 0x1234_5678_1234);
    }

    #[test]
    fn append_refuses_gap_and_new_scan() {
        let mut range = Range {
            scan: 4,
            start: 0x1234_5678_1234,
            size: 0x10000,
        };
        assert!(!range.append(4, range.end() + 1));
        assert!(!range.append(5, range.end()));
        assert_eq!(range.size, 0x10000);
    }

    #[test]
    fn collector_coalesces() {
        let mut out: Vec<Range> = Vec::new();
        {
            let mut c = RangeCollector::new(&mut out);
            c.append(3, 5);
            c.append(3, 6);
            c.append(3, 6);
            c.append(4, 0x1234_5678_1234);
            c.append(5, 2);
            c.append(5, 4);
            c.append(5, 5);
            // Dropping the collector flushes the tail range.
        }
        assert_eq!(
            out,
            vec![
                Range::new(3, 5, 2).unwrap(),
                Range::new(4, 0x1234_5678_1234, 1).unwrap(),
                Range::new(5, 2, 1).unwrap(),
                Range::new(5, 4, 2).unwrap(),
            ]
        );
    }

    #[test]
    fn collector_flush_and_continue() {
        let mut out: Vec<Range> = Vec::new();
        let mut c = RangeCollector::new(&mut out);
        c.append(3, 5);
        c.append(3, 6);
        c.flush();
        c.append(3, 7);
        c.append(4, 0);
        c.flush();
        drop(c);
        assert_eq!(
            out,
            vec![
                Range::new(3, 5, 2).unwrap(),
                Range::new(3, 7, 1).unwrap(),
                Range::new(4, 0, 1).unwrap(),
            ]
        );
    }

    #[test]
    fn collector_flush_empty_is_noop() {
        let mut out: Vec<Range> = Vec::new();
        let mut c = RangeCollector::new(&mut out);
        c.flush();
        drop(c);
        assert!(out.is_empty());
    }

    #[test]
    fn counter_matches_collector() {
        // Random monotone streams: the counter must predict exactly what the
        // collector emits.
        let mut rng = ChaCha8Rng::seed_from_u64(833120);
        for _ in 0..50 {
            let mut stream: Vec<(u32, u64)> = Vec::new();
            for scan in 0..rng.gen_range(1..5u32) {
                let mut index: u64 = rng.gen_range(0..1000);
                for _ in 0..rng.gen_range(0..40) {
                    index += if rng.gen_bool(0.7) { 1 } else { rng.gen_range(2..10) };
                    stream.push((scan, index));
                }
            }

            let mut counter = RangeCounter::new();
            let mut out: Vec<Range> = Vec::new();
            {
                let mut c = RangeCollector::new(&mut out);
                for &(scan, splat) in &stream {
                    counter.append(scan, splat);
                    c.append(scan, splat);
                }
            }
            assert_eq!(counter.num_ranges(), out.len() as u64);
            assert_eq!(counter.num_splats(), stream.len() as u64);
            assert_eq!(
                out.iter().map(|r| r.size as u64).sum::<u64>(),
                stream.len() as u64
            );
        }
    }

    /// Pushes more than 2^32 consecutive elements through a collector, so the
    /// size counter must split the run. Slow; run explicitly with
    /// `cargo test --release -- --ignored`.
    #[test]
    #[ignore]
    fn collector_splits_big_run() {
        let mut out: Vec<Range> = Vec::new();
        {
            let mut c = RangeCollector::new(&mut out);
            for i in 0..0x1_2345_6789u64 {
                c.append(0, i);
            }
        }
        assert_eq!(
            out,
            vec![
                Range::new(0, 0, 0xFFFF_FFFF).unwrap(),
                Range::new(0, 0xFFFF_FFFF, 0x2345_678A).unwrap(),
            ]
        );
    }
}
