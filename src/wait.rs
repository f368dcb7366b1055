/*!
 * Adaptive Waiting
 *
 * Shared backoff machinery for the CAS loops in this crate. A `SpinWait`
 * escalates through three tiers as attempts fail:
 *
 * 1. Processor spin hints, doubling per attempt (cheapest, keeps the core)
 * 2. Cooperative `thread::yield_now`
 * 3. Parking on a condvar until a release wakes waiters (Block mode only)
 *
 * The escalation points come from the active [`SyncConfig`]; Spin and Yield
 * modes simply never advance past their tier.
 */

use crate::config::{SyncConfig, WaitMode};
use parking_lot::{Condvar, Mutex};
use std::hint;
use std::thread;
use std::time::Duration;

/// Parking timeout guards against a wakeup racing past a waiter that has
/// checked its condition but not yet parked.
const PARK_TIMEOUT: Duration = Duration::from_micros(500);

/// Wakeup channel for parked waiters
///
/// The mutex protects nothing; it exists only to satisfy the condvar
/// protocol. Lock identity always lives in the primitive's own atomic.
#[derive(Default)]
pub(crate) struct Parker {
    mutex: Mutex<()>,
    condvar: Condvar,
}

impl Parker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Park until woken or the safety timeout elapses
    pub(crate) fn park(&self) {
        let mut guard = self.mutex.lock();
        self.condvar.wait_for(&mut guard, PARK_TIMEOUT);
    }

    /// Wake every parked waiter
    ///
    /// Waiters re-run their CAS loop on wakeup, so waking more threads than
    /// can win is correct, just not free.
    pub(crate) fn unpark_all(&self) {
        let _guard = self.mutex.lock();
        self.condvar.notify_all();
    }
}

/// Per-acquisition backoff state
///
/// Create one per acquire call and invoke [`SpinWait::snooze`] after each
/// failed attempt. Not shared between threads; the struct is deliberately
/// cheap to construct.
pub struct SpinWait {
    config: SyncConfig,
    counter: u32,
}

impl SpinWait {
    pub fn new(config: SyncConfig) -> Self {
        Self { config, counter: 0 }
    }

    /// Reset to the cheapest tier (call after a successful acquisition if
    /// the state is reused)
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    /// Back off after a failed attempt, without a parking channel
    pub fn snooze(&mut self) {
        self.snooze_with(None);
    }

    /// Back off after a failed attempt; parks on `parker` once the spin and
    /// yield tiers are exhausted in Block mode
    pub(crate) fn snooze_with(&mut self, parker: Option<&Parker>) {
        let mode = self.config.select_mode();
        let spinning = self.counter < self.config.spin_limit;
        let yielding = self.counter < self.config.spin_limit.saturating_add(self.config.yield_limit);

        match mode {
            WaitMode::Spin => self.spin_hint(),
            WaitMode::Yield => {
                if spinning {
                    self.spin_hint();
                } else {
                    thread::yield_now();
                }
            }
            WaitMode::Block => {
                if spinning {
                    self.spin_hint();
                } else if yielding || parker.is_none() {
                    thread::yield_now();
                } else if let Some(parker) = parker {
                    parker.park();
                }
            }
            // select_mode never returns Auto
            WaitMode::Auto => thread::yield_now(),
        }

        self.counter = self.counter.saturating_add(1);
    }

    /// Issue 2^counter spin-loop hints, capped by the configured limit
    fn spin_hint(&self) {
        let exp = self.counter.min(self.config.spin_limit).min(16);
        for _ in 0..(1u32 << exp) {
            hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_snooze_advances_counter() {
        let mut wait = SpinWait::new(SyncConfig::default());
        for _ in 0..100 {
            wait.snooze();
        }
        assert_eq!(wait.counter, 100);

        wait.reset();
        assert_eq!(wait.counter, 0);
    }

    #[test]
    fn test_spin_mode_never_parks() {
        // A pure-spin snooze must return promptly even with a parker wired in.
        let parker = Parker::new();
        let mut wait = SpinWait::new(SyncConfig::low_latency());

        let start = Instant::now();
        for _ in 0..1000 {
            wait.snooze_with(Some(&parker));
        }
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_parked_waiter_wakes() {
        let parker = Arc::new(Parker::new());
        let released = Arc::new(AtomicBool::new(false));

        let parker_clone = parker.clone();
        let released_clone = released.clone();
        let handle = thread::spawn(move || {
            let mut wait = SpinWait::new(SyncConfig::long_hold());
            while !released_clone.load(Ordering::Acquire) {
                wait.snooze_with(Some(&parker_clone));
            }
        });

        thread::sleep(Duration::from_millis(20));
        released.store(true, Ordering::Release);
        parker.unpark_all();

        handle.join().unwrap();
    }

    #[test]
    fn test_park_timeout_prevents_lost_wakeup_hang() {
        // Unpark before the waiter parks; the safety timeout must still let
        // the waiter observe the condition.
        let parker = Arc::new(Parker::new());
        parker.unpark_all();

        let start = Instant::now();
        parker.park();
        assert!(start.elapsed() < Duration::from_millis(100));
    }
}
