//! Timing helpers for pipeline phases.

use std::time::Instant;

/// RAII phase timer that logs elapsed time on drop.
///
/// # Example
/// ```ignore
/// let _t = Phase::new("bucket");
/// // ... partition the cloud ...
/// // logs "bucket: 1.234s" when _t is dropped
/// ```
pub struct Phase {
    name: &'static str,
    start: Instant,
}

impl Phase {
    pub fn new(name: &'static str) -> Self {
        log::debug!("{}...", name);
        Self {
            name,
            start: Instant::now(),
        }
    }

    /// Seconds since the phase started.
    pub fn seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Finish explicitly, logging a throughput figure alongside the time.
    pub fn finish_with_rate(self, splats: u64) {
        let secs = self.seconds();
        let rate = if secs > 0.0 {
            splats as f64 / secs / 1.0e6
        } else {
            0.0
        };
        log::info!("{}: {:.3}s ({:.2}M splats/s)", self.name, secs, rate);
        std::mem::forget(self);
    }
}

impl Drop for Phase {
    fn drop(&mut self) {
        log::info!("{}: {:.3}s", self.name, self.seconds());
    }
}
