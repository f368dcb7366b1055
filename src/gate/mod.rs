/*!
 * Tiered Reader/Writer Gate
 *
 * A coordination primitive exposing three access levels, cheapest first:
 *
 * 1. **Optimistic read** — no acquisition at all. Capture a [`Stamp`], read
 *    the protected state, then [`validate`](TieredGate::validate); a failed
 *    validation means a writer was active and the read must be discarded.
 * 2. **Pessimistic read** — shared access that waits out writers; any
 *    number of readers may hold it concurrently.
 * 3. **Exclusive write** — waits until no readers or writer remain, and
 *    advances the stamp on release.
 *
 * # Design
 *
 * Gate state is a sequence word plus a reader count. The sequence carries
 * the stamp protocol: an even value means the gate is idle at that version,
 * an odd value means a writer is in flight. Each write cycle adds two, so
 * the stamp observed by readers strictly increases over writer epochs.
 *
 * A writer flips the sequence odd *before* waiting for readers to drain,
 * which blocks new pessimistic readers and invalidates new optimistic
 * stamps immediately: writers are preferred over incoming readers, so a
 * steady stream of readers cannot starve a committed writer.
 *
 * Shared and exclusive access are RAII guards; dropping the guard releases
 * the gate, so a release on an error path can never be missed and an
 * unauthorized release is unrepresentable.
 */

use crate::config::{SyncConfig, WaitMode};
use crate::wait::{Parker, SpinWait};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{fence, AtomicU32, AtomicU64, Ordering};

/// Version stamp captured by an optimistic read
///
/// A stamp taken while a writer held the gate is invalid from the start;
/// [`Stamp::is_valid`] reports that without any further gate traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamp(u64);

impl Stamp {
    /// A stamp that never validates. Useful for driving escalation paths in
    /// tests and fakes.
    pub const INVALID: Stamp = Stamp(1);

    /// Whether this stamp was captured while the gate was idle
    ///
    /// An invalid stamp means a writer was in flight at capture time; the
    /// caller must fall back to pessimistic access instead of validating.
    #[inline(always)]
    pub fn is_valid(&self) -> bool {
        self.0 & 1 == 0
    }

    /// Raw sequence value, for diagnostics
    #[inline]
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// The gate operations a tiered-access consumer needs
///
/// [`TieredGate`] is the production implementation; tests inject fakes that
/// force invalid stamps to exercise escalation deterministically.
pub trait Gate: Send + Sync {
    /// Capture the current stamp without acquiring anything
    fn try_optimistic_read(&self) -> Stamp;

    /// Whether no writer has held the gate since `stamp` was captured
    fn validate(&self, stamp: Stamp) -> bool;

    /// Shared access; waits out any in-flight writer
    fn acquire_read(&self) -> ReadGuard<'_>;

    /// Exclusive access; waits until no readers or writer remain
    fn acquire_write(&self) -> WriteGuard<'_>;
}

/// Three-tier reader/writer gate backed by a monotonic version stamp
///
/// # Example
///
/// ```
/// use tierlock::TieredGate;
///
/// let gate = TieredGate::new();
///
/// // Optimistic tier: read shared state here, then check the stamp held.
/// let stamp = gate.try_optimistic_read();
/// if stamp.is_valid() && gate.validate(stamp) {
///     // snapshot was consistent
/// }
///
/// // Write tier: stamp advances when the guard drops.
/// let before = gate.stamp();
/// drop(gate.acquire_write());
/// assert!(gate.stamp() > before);
/// ```
pub struct TieredGate {
    /// Even = idle at that version, odd = writer in flight
    seq: AtomicU64,
    /// Pessimistic readers currently inside the gate
    readers: AtomicU32,
    config: SyncConfig,
    parker: Parker,
}

impl TieredGate {
    /// Create with the default wait configuration
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Create with an explicit wait configuration
    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            seq: AtomicU64::new(0),
            readers: AtomicU32::new(0),
            config,
            parker: Parker::new(),
        }
    }

    /// Capture the current stamp without acquiring anything
    ///
    /// Never waits. The returned stamp is invalid when a writer holds the
    /// gate; callers must check [`Stamp::is_valid`] before relying on any
    /// state read under it.
    #[inline]
    pub fn try_optimistic_read(&self) -> Stamp {
        Stamp(self.seq.load(Ordering::Acquire))
    }

    /// Whether no writer has held the gate since `stamp` was captured
    ///
    /// Never waits. Returns false for stamps that were invalid on arrival.
    #[inline]
    pub fn validate(&self, stamp: Stamp) -> bool {
        // Load-load barrier: the caller's optimistic reads must complete
        // before the sequence re-check, or a racing writer could slip
        // between them unnoticed.
        fence(Ordering::Acquire);
        stamp.is_valid() && self.seq.load(Ordering::Relaxed) == stamp.0
    }

    /// Shared access; waits while a writer holds the gate
    pub fn acquire_read(&self) -> ReadGuard<'_> {
        let mut wait = SpinWait::new(self.config);
        loop {
            if let Some(guard) = self.try_acquire_read() {
                return guard;
            }
            wait.snooze_with(Some(&self.parker));
        }
    }

    /// Attempt shared access without waiting
    pub fn try_acquire_read(&self) -> Option<ReadGuard<'_>> {
        let seq = self.seq.load(Ordering::Acquire);
        if seq & 1 == 1 {
            return None;
        }

        self.readers.fetch_add(1, Ordering::Acquire);
        if self.seq.load(Ordering::Acquire) == seq {
            return Some(ReadGuard { gate: self });
        }

        // A writer committed between the check and the increment; back out
        // so it can drain.
        self.readers.fetch_sub(1, Ordering::Release);
        self.wake_waiters();
        None
    }

    /// Exclusive access; waits until no readers or writer hold the gate
    pub fn acquire_write(&self) -> WriteGuard<'_> {
        let mut wait = SpinWait::new(self.config);

        // Phase one: claim the writer slot by flipping the sequence odd.
        loop {
            let seq = self.seq.load(Ordering::Relaxed);
            if seq & 1 == 0
                && self
                    .seq
                    .compare_exchange_weak(seq, seq + 1, Ordering::Acquire, Ordering::Relaxed)
                    .is_ok()
            {
                break;
            }
            wait.snooze_with(Some(&self.parker));
        }

        // Phase two: the odd sequence blocks new readers; wait for the ones
        // already inside to drain.
        wait.reset();
        while self.readers.load(Ordering::Acquire) != 0 {
            wait.snooze_with(Some(&self.parker));
        }

        WriteGuard { gate: self }
    }

    /// Attempt exclusive access without waiting
    pub fn try_acquire_write(&self) -> Option<WriteGuard<'_>> {
        let seq = self.seq.load(Ordering::Relaxed);
        if seq & 1 == 1
            || self
                .seq
                .compare_exchange(seq, seq + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
        {
            return None;
        }

        if self.readers.load(Ordering::Acquire) == 0 {
            return Some(WriteGuard { gate: self });
        }

        // Readers still inside: surrender the writer slot. No protected
        // state was touched, so restoring the even sequence leaves earlier
        // optimistic stamps correctly valid.
        self.seq.store(seq, Ordering::Release);
        self.wake_waiters();
        None
    }

    /// Current raw sequence value, for diagnostics
    #[inline]
    pub fn stamp(&self) -> u64 {
        self.seq.load(Ordering::Relaxed)
    }

    /// Pessimistic readers currently inside the gate, for diagnostics
    #[inline]
    pub fn reader_count(&self) -> usize {
        self.readers.load(Ordering::Relaxed) as usize
    }

    #[inline]
    fn wake_waiters(&self) {
        if self.config.select_mode() == WaitMode::Block {
            self.parker.unpark_all();
        }
    }
}

impl Default for TieredGate {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TieredGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TieredGate")
            .field("stamp", &self.stamp())
            .field("readers", &self.reader_count())
            .finish_non_exhaustive()
    }
}

impl Gate for TieredGate {
    #[inline]
    fn try_optimistic_read(&self) -> Stamp {
        TieredGate::try_optimistic_read(self)
    }

    #[inline]
    fn validate(&self, stamp: Stamp) -> bool {
        TieredGate::validate(self, stamp)
    }

    #[inline]
    fn acquire_read(&self) -> ReadGuard<'_> {
        TieredGate::acquire_read(self)
    }

    #[inline]
    fn acquire_write(&self) -> WriteGuard<'_> {
        TieredGate::acquire_write(self)
    }
}

/// Shared access to a [`TieredGate`]; releases on drop
#[must_use = "the read tier is released as soon as the guard is dropped"]
pub struct ReadGuard<'a> {
    gate: &'a TieredGate,
}

impl Drop for ReadGuard<'_> {
    fn drop(&mut self) {
        self.gate.readers.fetch_sub(1, Ordering::Release);
        self.gate.wake_waiters();
    }
}

/// Exclusive access to a [`TieredGate`]; advances the stamp and releases on
/// drop
#[must_use = "the write tier is released as soon as the guard is dropped"]
pub struct WriteGuard<'a> {
    gate: &'a TieredGate,
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        // Odd back to even: the write cycle adds two to the stamp overall.
        self.gate.seq.fetch_add(1, Ordering::Release);
        self.gate.wake_waiters();
    }
}
