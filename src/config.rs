/*!
 * Synchronization Configuration
 *
 * Runtime configuration for wait strategy selection
 */

use serde::{Deserialize, Serialize};

/// Wait mode selection
///
/// Every primitive in this crate acquires ownership through a CAS loop; the
/// wait mode only controls what a thread does between failed attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitMode {
    /// Pure busy-wait with processor spin hints (lowest latency, highest CPU)
    Spin,
    /// Cooperative `thread::yield_now` between attempts
    Yield,
    /// Spin briefly, then park on a condvar until a release wakes us
    Block,
    /// Auto-select based on expected hold time
    Auto,
}

/// Synchronization configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Preferred wait mode
    pub mode: WaitMode,
    /// Spin-hint iterations before escalating to yields
    pub spin_limit: u32,
    /// Yield iterations before parking (Block mode only)
    pub yield_limit: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: WaitMode::Auto,
            spin_limit: 6,
            yield_limit: 64,
        }
    }
}

impl SyncConfig {
    /// Configuration optimized for very short critical sections (< 1µs held)
    pub const fn low_latency() -> Self {
        Self {
            mode: WaitMode::Spin,
            spin_limit: 10,
            yield_limit: 0,
        }
    }

    /// Configuration for critical sections that may hold for a while
    pub const fn long_hold() -> Self {
        Self {
            mode: WaitMode::Block,
            spin_limit: 4,
            yield_limit: 16,
        }
    }

    /// Cooperative yielding without parking, the behavior of the classic
    /// teaching spin lock
    pub const fn cooperative() -> Self {
        Self {
            mode: WaitMode::Yield,
            spin_limit: 0,
            yield_limit: u32::MAX,
        }
    }

    /// Resolve `Auto` to a concrete mode
    pub fn select_mode(&self) -> WaitMode {
        match self.mode {
            // Yielding is the safest default: it stays out of the scheduler's
            // way without requiring a wakeup channel.
            WaitMode::Auto => WaitMode::Yield,
            other => other,
        }
    }
}
