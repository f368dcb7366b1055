/*!
 * Lazily Populated Tiered-Locking Cache
 *
 * A generic keyed cache that serializes population from a slow backing
 * source behind a [`TieredGate`] while keeping already-cached reads free of
 * gate acquisition.
 *
 * # Design
 *
 * Every lookup walks the double-checked escalation ladder, paying for
 * exactly as much locking as the moment requires:
 *
 * 1. Capture an optimistic stamp. If it is valid and the entry is present
 *    and the stamp still validates, return — no gate acquisition at all.
 * 2. If the stamp was valid but a writer raced past during the read, fall
 *    back to the shared read tier and re-check the entry.
 * 3. If the stamp was invalid on arrival (a writer was active), start at
 *    the read tier directly.
 * 4. A missing entry escalates to the exclusive write tier, which
 *    double-checks before invoking the backing source, so a population
 *    racing in while this caller waited is returned as-is and never
 *    overwritten.
 *
 * Each lookup reports which tier answered it as an [`AccessTier`], keeping
 * the tiers individually observable and testable.
 *
 * The backing map must tolerate gate-free reads racing the populating
 * writer, which is why the entries live in a concurrent map rather than a
 * plain `HashMap`; the gate serializes population, not visibility.
 */

mod stats;

pub use stats::{CacheSnapshot, CacheStats};

use crate::config::SyncConfig;
use crate::gate::{Gate, TieredGate};
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

/// Which tier of the gate answered a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    /// Entry returned under a validated optimistic stamp, no gate traffic
    Optimistic,
    /// Entry returned under the shared read tier
    Read,
    /// Entry returned under the exclusive write tier, populated by this
    /// caller or by a writer that won the race
    Write,
}

/// Lazily populated cache with tiered locking
///
/// Values are cloned out so a caller never holds a reference a racing
/// writer could observeably mutate; keep `V` a cheap clone (or wrap it in
/// an `Arc`).
///
/// # Population contract
///
/// A value, once stored for a key, is never replaced: racing populators are
/// serialized by the write tier and the double check returns the winner's
/// value to everyone else. The backing source itself may still run
/// redundantly under race (two callers can both miss before either
/// populates); it must tolerate that.
///
/// # Example
///
/// ```
/// use tierlock::LazyCache;
///
/// let cache: LazyCache<&str, String> = LazyCache::new();
/// let value = cache
///     .get_or_load(&"config", |key| Ok::<_, std::convert::Infallible>(key.to_uppercase()))
///     .unwrap();
/// assert_eq!(value, "CONFIG");
/// ```
pub struct LazyCache<K, V, G = TieredGate>
where
    K: Eq + Hash + Clone,
    V: Clone,
    G: Gate,
{
    gate: G,
    entries: DashMap<K, V, RandomState>,
    stats: CacheStats,
}

impl<K, V> LazyCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create with the default gate configuration
    pub fn new() -> Self {
        Self::with_gate(TieredGate::new())
    }

    /// Create with an explicit wait configuration for the gate
    pub fn with_config(config: SyncConfig) -> Self {
        Self::with_gate(TieredGate::with_config(config))
    }
}

impl<K, V> Default for LazyCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, G> LazyCache<K, V, G>
where
    K: Eq + Hash + Clone,
    V: Clone,
    G: Gate,
{
    /// Create over a caller-supplied gate implementation
    pub fn with_gate(gate: G) -> Self {
        Self {
            gate,
            entries: DashMap::with_hasher(RandomState::new()),
            stats: CacheStats::new(),
        }
    }

    /// Return the cached value for `key`, populating it from `load` on miss
    ///
    /// A `load` failure propagates to the caller; the gate is released on
    /// every exit path, so a failed population never wedges the cache for
    /// subsequent callers, and nothing is stored for the key.
    pub fn get_or_load<E>(&self, key: &K, load: impl FnOnce(&K) -> Result<V, E>) -> Result<V, E> {
        self.get_with_tier(key, load).map(|(value, _)| value)
    }

    /// [`get_or_load`](Self::get_or_load), also reporting which tier
    /// answered
    pub fn get_with_tier<E>(
        &self,
        key: &K,
        load: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<(V, AccessTier), E> {
        let result = self.lookup(key, load);
        match &result {
            Ok((_, AccessTier::Optimistic)) => self.stats.record_optimistic_hit(),
            Ok((_, AccessTier::Read)) => self.stats.record_read_hit(),
            Ok((_, AccessTier::Write)) => self.stats.record_write_hit(),
            Err(_) => {}
        }
        result
    }

    /// Probe for an already-cached value without ever invoking a loader
    ///
    /// Optimistic only: returns `None` on a miss *or* when a writer made
    /// the snapshot unvalidatable.
    pub fn peek(&self, key: &K) -> Option<V> {
        let stamp = self.gate.try_optimistic_read();
        if !stamp.is_valid() {
            return None;
        }
        let value = self.entries.get(key).map(|entry| entry.value().clone())?;
        self.gate.validate(stamp).then_some(value)
    }

    /// Whether `key` is currently populated
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of populated entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been populated yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Access counters
    pub fn stats(&self) -> CacheSnapshot {
        self.stats.snapshot()
    }

    /// The escalation ladder; see the module docs for the tier-by-tier walk
    fn lookup<E>(
        &self,
        key: &K,
        load: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<(V, AccessTier), E> {
        let stamp = self.gate.try_optimistic_read();
        if stamp.is_valid() {
            let cached = self.entries.get(key).map(|entry| entry.value().clone());
            match cached {
                Some(value) => {
                    if self.gate.validate(stamp) {
                        return Ok((value, AccessTier::Optimistic));
                    }
                    // A writer raced past the optimistic read; the snapshot
                    // cannot be trusted. Retry under the read tier.
                    log::trace!("optimistic read invalidated, escalating to read tier");
                }
                // Present nowhere under a clean stamp: only population can
                // help, and that is the write tier's job.
                None => return self.populate(key, load),
            }
        } else {
            log::trace!("writer in flight at lookup start, taking read tier");
        }

        self.read_locked(key, load)
    }

    /// Pessimistic-read tier: re-check under shared access, escalate on miss
    fn read_locked<E>(
        &self,
        key: &K,
        load: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<(V, AccessTier), E> {
        {
            let _read = self.gate.acquire_read();
            if let Some(entry) = self.entries.get(key) {
                return Ok((entry.value().clone(), AccessTier::Read));
            }
            // Read tier released here; holding it across the write
            // acquisition would deadlock against the drain.
        }
        self.populate(key, load)
    }

    /// Exclusive-write tier: double-check, then invoke the backing source
    fn populate<E>(
        &self,
        key: &K,
        load: impl FnOnce(&K) -> Result<V, E>,
    ) -> Result<(V, AccessTier), E> {
        let _write = self.gate.acquire_write();

        // Another writer may have populated the key while this caller
        // waited for the write tier.
        if let Some(entry) = self.entries.get(key) {
            return Ok((entry.value().clone(), AccessTier::Write));
        }

        self.stats.record_load();
        let value = match load(key) {
            Ok(value) => value,
            Err(err) => {
                self.stats.record_load_failure();
                // `_write` drops here: the gate opens again and the key
                // stays unpopulated.
                return Err(err);
            }
        };

        self.entries.insert(key.clone(), value.clone());
        log::debug!("populated cache entry (entries now {})", self.entries.len());
        Ok((value, AccessTier::Write))
    }
}

impl<K, V, G> std::fmt::Debug for LazyCache<K, V, G>
where
    K: Eq + Hash + Clone,
    V: Clone,
    G: Gate,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyCache")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}
