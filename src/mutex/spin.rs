/*!
 * Non-Reentrant CAS Spin Mutex
 *
 * The baseline owner-cell lock: one atomic word, no recursion, no fairness.
 */

use super::{current_thread_token, UNOWNED};
use crate::config::{SyncConfig, WaitMode};
use crate::errors::LockError;
use crate::wait::{Parker, SpinWait};
use std::sync::atomic::{AtomicU64, Ordering};

/// Spin-based exclusive lock built on a CAS'd owner cell
///
/// # Limitations
///
/// - **No reentrancy**: a second `acquire` by the current owner spins on
///   itself forever. Use [`ReentrantSpinMutex`](super::ReentrantSpinMutex)
///   when the owner may re-enter.
/// - **No starvation freedom**: nothing orders contending threads, so a
///   retrying thread is not guaranteed to eventually win.
///
/// # Example
///
/// ```
/// use tierlock::SpinMutex;
///
/// let mutex = SpinMutex::new();
/// mutex.acquire();
/// // ... critical section ...
/// mutex.release().unwrap();
/// ```
pub struct SpinMutex {
    owner: AtomicU64,
    config: SyncConfig,
    parker: Parker,
}

impl SpinMutex {
    /// Create with the default wait configuration
    pub fn new() -> Self {
        Self::with_config(SyncConfig::default())
    }

    /// Create with an explicit wait configuration
    pub fn with_config(config: SyncConfig) -> Self {
        Self {
            owner: AtomicU64::new(UNOWNED),
            config,
            parker: Parker::new(),
        }
    }

    /// Block until the calling thread is the exclusive owner
    ///
    /// # Performance
    ///
    /// Uncontended acquisition is a single CAS. Under contention the thread
    /// backs off per the configured [`WaitMode`].
    pub fn acquire(&self) {
        let token = current_thread_token();
        let mut wait = SpinWait::new(self.config);

        while self
            .owner
            .compare_exchange_weak(UNOWNED, token, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            wait.snooze_with(Some(&self.parker));
        }
    }

    /// Attempt a single acquisition without waiting
    #[inline]
    pub fn try_acquire(&self) -> bool {
        let token = current_thread_token();
        self.owner
            .compare_exchange(UNOWNED, token, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Release the lock
    ///
    /// Fails with [`LockError`] when the calling thread is not the current
    /// owner; ownership is unchanged in that case.
    pub fn release(&self) -> Result<(), LockError> {
        let token = current_thread_token();
        match self
            .owner
            .compare_exchange(token, UNOWNED, Ordering::Release, Ordering::Relaxed)
        {
            Ok(_) => {
                self.wake_waiters();
                Ok(())
            }
            Err(UNOWNED) => Err(LockError::NotHeld),
            Err(holder) => {
                log::debug!(
                    "release by non-owner: caller token {} holder token {}",
                    token,
                    holder
                );
                Err(LockError::NotOwner {
                    caller: token,
                    holder,
                })
            }
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

    #[inline]
    fn wake_waiters(&self) {
        if self.config.select_mode() == WaitMode::Block {
            self.parker.unpark_all();
        }
    }
}

impl Default for SpinMutex {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SpinMutex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpinMutex")
            .field("held", &self.is_held())
            .finish_non_exhaustive()
    }
}
