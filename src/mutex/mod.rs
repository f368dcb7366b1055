/*!
 * CAS Owner-Cell Mutexes
 *
 * Two exclusive locks built directly on a compare-and-swap word:
 * - [`SpinMutex`]: the non-reentrant baseline. A second acquire by the
 *   owner deadlocks by design.
 * - [`ReentrantSpinMutex`]: adds same-thread recursion counting on top of
 *   the identical owner cell.
 *
 * # Design
 *
 * The entire lock state is one `AtomicU64` holding either `UNOWNED` or the
 * acquiring thread's token. Acquisition is a CAS retry loop; the configured
 * [`WaitMode`](crate::config::WaitMode) only decides what a thread does
 * between failed attempts. There is no fairness guarantee: a continuously
 * retrying thread can lose indefinitely to a stream of fresh contenders.
 *
 * Both locks expose a raw `acquire`/`release` surface rather than an RAII
 * guard because the critical section they protect is external to the lock;
 * `release` fails loudly when the caller is not the owner.
 */

mod reentrant;
mod spin;

pub use reentrant::ReentrantSpinMutex;
pub use spin::SpinMutex;

use std::sync::atomic::{AtomicU64, Ordering};

/// Owner-cell value meaning "no owner". Thread tokens start at 1.
pub(crate) const UNOWNED: u64 = 0;

static NEXT_THREAD_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TOKEN: u64 = NEXT_THREAD_TOKEN.fetch_add(1, Ordering::Relaxed);
}

/// Stable nonzero identity for the calling thread
///
/// `ThreadId` has no stable integer form, and the owner cell needs a
/// word-sized value to CAS, so tokens are allocated from a process-wide
/// counter on first use per thread.
pub(crate) fn current_thread_token() -> u64 {
    THREAD_TOKEN.with(|token| *token)
}
