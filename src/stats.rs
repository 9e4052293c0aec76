//! Driver counters.
//!
//! Lock-free so the sampler can bump them while holding the registry
//! and a diagnostics task can read them at any time.

use core::sync::atomic::{AtomicU32, Ordering};

/// Thread-safe driver counters. Never reset.
///
/// # Usage
///
/// ```ignore
/// // In the sampler:
/// if registry_busy {
///     STATS.cycle_skipped();
/// }
///
/// // In a diagnostics task:
/// let s = STATS.snapshot();
/// log::info!("skipped {}/{} cycles", s.skipped_cycles, s.cycles);
/// ```
pub struct DriverStats {
    /// Sampler cycles that walked the registry.
    cycles: AtomicU32,

    /// Sampler cycles skipped because the registry was busy.
    skipped_cycles: AtomicU32,

    registrations: AtomicU32,
    deregistrations: AtomicU32,

    /// Requests answered with a failure event.
    failed_requests: AtomicU32,

    /// Requests that timed out on the registry lock (subset of failed).
    dropped_requests: AtomicU32,

    /// Events the transport refused.
    dropped_events: AtomicU32,
}

impl DriverStats {
    pub const fn new() -> Self {
        Self {
            cycles: AtomicU32::new(0),
            skipped_cycles: AtomicU32::new(0),
            registrations: AtomicU32::new(0),
            deregistrations: AtomicU32::new(0),
            failed_requests: AtomicU32::new(0),
            dropped_requests: AtomicU32::new(0),
            dropped_events: AtomicU32::new(0),
        }
    }

    #[inline]
    pub fn cycle_completed(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn cycle_skipped(&self) {
        self.skipped_cycles.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn registered(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn deregistered(&self) {
        self.deregistrations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn request_failed(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Lock timeout: counted as failed and as dropped.
    #[inline]
    pub fn request_dropped(&self) {
        self.request_failed();
        self.dropped_requests.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn event_dropped(&self) {
        self.dropped_events.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles: self.cycles.load(Ordering::Relaxed),
            skipped_cycles: self.skipped_cycles.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            deregistrations: self.deregistrations.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            dropped_requests: self.dropped_requests.load(Ordering::Relaxed),
            dropped_events: self.dropped_events.load(Ordering::Relaxed),
        }
    }
}

impl Default for DriverStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters at a point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub cycles: u32,
    pub skipped_cycles: u32,
    pub registrations: u32,
    pub deregistrations: u32,
    pub failed_requests: u32,
    pub dropped_requests: u32,
    pub dropped_events: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_basic() {
        let stats = DriverStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());

        stats.cycle_completed();
        stats.cycle_completed();
        stats.cycle_skipped();
        stats.registered();

        let s = stats.snapshot();
        assert_eq!(s.cycles, 2);
        assert_eq!(s.skipped_cycles, 1);
        assert_eq!(s.registrations, 1);
    }

    #[test]
    fn test_dropped_request_is_also_failed() {
        let stats = DriverStats::new();

        stats.request_failed();
        stats.request_dropped();

        let s = stats.snapshot();
        assert_eq!(s.failed_requests, 2);
        assert_eq!(s.dropped_requests, 1);
    }
}
