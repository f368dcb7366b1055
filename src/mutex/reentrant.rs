/*!
 * Reentrant CAS Spin Mutex
 *
 * Same owner cell as [`SpinMutex`](super::SpinMutex), plus a recursion
 * counter so the owner can re-enter without deadlocking.
 */

use super::{current_thread_token, UNOWNED};
use crate::config::{SyncConfig, WaitMode};
use crate::errors::LockError;
use crate::wait::{Parker, SpinWait};
use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reentrant spin lock built on a CAS'd owner cell
///
/// The recursion counter is a plain [`Cell`], not an atomic: it is only
/// ever touched by the thread whose token sits in the owner cell, and the
/// Acquire/Release pair on that cell provides the happens-before edge that
/// carries the counter between successive owners.
///
/// # Example
///
/// ```
/// use tierlock::ReentrantSpinMutex;
///
/// let mutex = ReentrantSpinMutex::new();
/// mutex.acquire();
/// mutex.acquire(); // owner re-entry succeeds immediately
/// assert_eq!(mutex.hold_count(), 2);
/// mutex.release().unwrap();
/// mutex.release().unwrap(); // lock only opens after the matching release
/// ```
pub struct ReentrantSpinMutex {
    owner: AtomicU64,
    /// Extra holds beyond the first; 0 while held once
    recursion: Cell<usize>,
    config: SyncConfig,
    parker: Parker,
}

// Safety: `recursion` is only read or written by the thread whose token is
// currently stored in `owner`. Mutual exclusion on the owner cell therefore
// serializes all access to the Cell, and the Release store in `release`
// paired with the Acquire CAS in `acquire` publishes the counter to the
// next owner.
unsafe impl Send for ReentrantSpinMutex {}
unsafe impl Sync for ReentrantSpinMutex {}

impl ReentrantSpinMutex {
    /// Create with the default wait configuration
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Create with an explicit wait configuration
    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            owner: AtomicU64::new(UNOWNED),
            recursion: Cell::new(0),
            config,
            parker: Parker::new(),
        }
    }

    /// Acquire the lock, or bump the recursion count when already held by
    /// the calling thread
    pub fn acquire(&self) {
        let token = current_thread_token();

        // Relaxed is enough for the re-entry check: we only compare against
        // our own token, and if it matches we are the thread that stored it.
        if self.owner.load(Ordering::Relaxed) == token {
            self.recursion.set(self.recursion.get() + 1);
            return;
        }

        let mut wait = SpinWait::new(self.config);
        while self
            .owner
            .compare_exchange_weak(UNOWNED, token, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            wait.snooze_with(Some(&self.parker));
        }
    }

    /// Attempt a single acquisition (or re-entry) without waiting
    pub fn try_acquire(&self) -> bool {
        let token = current_thread_token();

        if self.owner.load(Ordering::Relaxed) == token {
            self.recursion.set(self.recursion.get() + 1);
            return true;
        }

        self.owner
            .compare_exchange(UNOWNED, token, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Release one hold; ownership clears only when the outermost hold is
    /// released
    pub fn release(&self) -> Result<(), LockError> {
        let token = current_thread_token();
        let holder = self.owner.load(Ordering::Relaxed);

        if holder != token {
            return Err(if holder == UNOWNED {
                LockError::NotHeld
            } else {
                LockError::NotOwner {
                    caller: token,
                    holder,
                }
            });
        }

        let depth = self.recursion.get();
        if depth > 0 {
            self.recursion.set(depth - 1);
            return Ok(());
        }

        self.owner.store(UNOWNED, Ordering::Release);
        if self.config.select_mode() == WaitMode::Block {
            self.parker.unpark_all();
        }
        Ok(())
    }

    /// Number of holds the calling thread currently has (0 when not owner)
    pub fn hold_count(&self) -> usize {
        if self.owner.load(Ordering::Relaxed) == current_thread_token() {
            self.recursion.get() + 1
        } else {
            0
        }
    }

    /// Whether any thread currently holds the lock
    #[inline]
    pub fn is_held(&self) -> bool {
        self.owner.load(Ordering::Relaxed) != UNOWNED
    }

    /// Whether the calling thread holds the lock
    #[inline]
    pub fn holds_lock(&self) -> bool {
        self.owner.load(Ordering::Relaxed) == current_thread_token()
    }
}

impl Default for ReentrantSpinMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReentrantSpinMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReentrantSpinMutex")
            .field("held", &self.is_held())
            .finish_non_exhaustive()
    }
}
