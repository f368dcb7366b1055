/*!
 * Tierlock Library
 * Low-level synchronization building blocks for shared mutable state under
 * contention
 *
 * # Components
 *
 * - [`SpinMutex`] / [`ReentrantSpinMutex`]: exclusive locks built directly
 *   on a CAS'd atomic owner cell
 * - [`TieredGate`]: optimistic-read / pessimistic-read / exclusive-write
 *   coordination backed by a monotonic version stamp
 * - [`LazyCache`]: lazily populated cache that walks the gate's tiers so
 *   cached reads pay for no gate acquisition at all
 * - [`BoundaryCell`]: atomic holder for a validated `{lower, upper}` range,
 *   replaced wholesale through a CAS retry loop
 *
 * The mutexes and the gate are independent general-purpose primitives; the
 * cache drives a gate; the boundary cell demonstrates the replace-whole-
 * value alternative to lock-based critical sections. None of them schedule
 * threads — callers bring their own.
 *
 * # Waiting
 *
 * All blocking operations are CAS loops whose between-attempt behavior is
 * chosen at construction via [`SyncConfig`]: spin hints, cooperative
 * yields, or condvar parking. No operation takes a timeout and none can be
 * cancelled; bounded waiting belongs in a layer above this one.
 */

pub mod boundary;
pub mod cache;
pub mod config;
pub mod errors;
pub mod gate;
pub mod mutex;
pub mod wait;

// Re-exports
pub use boundary::{Boundary, BoundaryCell};
pub use cache::{AccessTier, CacheSnapshot, CacheStats, LazyCache};
pub use config::{SyncConfig, WaitMode};
pub use errors::{BoundaryError, LockError};
pub use gate::{Gate, ReadGuard, Stamp, TieredGate, WriteGuard};
pub use mutex::{ReentrantSpinMutex, SpinMutex};
pub use wait::SpinWait;
