/*!
 * Cache Access Counters
 *
 * Cheap relaxed atomics bumped once per lookup; read as a consistent-enough
 * snapshot for diagnostics, never for control flow.
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Per-tier access counters for a [`LazyCache`](super::LazyCache)
#[derive(Debug, Default)]
pub struct CacheStats {
    optimistic_hits: AtomicU64,
    read_hits: AtomicU64,
    write_hits: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
}

impl CacheStats {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_optimistic_hit(&self) {
        self.optimistic_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_read_hit(&self) {
        self.read_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_write_hit(&self) {
        self.write_hits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values out
    pub fn snapshot(&self) -> CacheSnapshot {
        CacheSnapshot {
            optimistic_hits: self.optimistic_hits.load(Ordering::Relaxed),
            read_hits: self.read_hits.load(Ordering::Relaxed),
            write_hits: self.write_hits.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`CacheStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Lookups answered without any gate acquisition
    pub optimistic_hits: u64,
    /// Lookups answered under the shared read tier
    pub read_hits: u64,
    /// Lookups answered under the exclusive write tier (double-check hits
    /// and fresh populations)
    pub write_hits: u64,
    /// Backing-source invocations
    pub loads: u64,
    /// Backing-source invocations that returned an error
    pub load_failures: u64,
}

impl CacheSnapshot {
    /// Total lookups that completed with a value
    pub fn total_hits(&self) -> u64 {
        self.optimistic_hits + self.read_hits + self.write_hits
    }
}
