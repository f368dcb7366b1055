/*!
 * Atomic Bounded Range
 *
 * A two-field invariant (`lower <= upper`) held behind an atomic reference
 * and replaced wholesale through a CAS retry loop, the lock-free
 * alternative to wrapping the pair in a critical section: concurrent
 * observers can see an older range or a newer range, never a mix of the
 * two.
 */

use crate::errors::BoundaryError;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::thread;

/// Immutable validated range
///
/// Construction is the only validation point; every `Boundary` in
/// circulation satisfies `lower <= upper`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Boundary {
    lower: i64,
    upper: i64,
}

impl Boundary {
    /// Validate and construct; rejects `lower > upper` before any value
    /// exists
    pub fn new(lower: i64, upper: i64) -> Result<Self, BoundaryError> {
        if lower > upper {
            return Err(BoundaryError::Inverted { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    #[inline]
    pub fn lower(&self) -> i64 {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> i64 {
        self.upper
    }

    /// Whether `value` falls inside the range (inclusive on both ends)
    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Range width; saturates at `u64::MAX` for the unbounded default
    pub fn width(&self) -> u64 {
        self.upper.abs_diff(self.lower)
    }
}

impl Default for Boundary {
    /// The unbounded range, matching the cell's initial value
    fn default() -> Self {
        Self {
            lower: i64::MIN,
            upper: i64::MAX,
        }
    }
}

/// Atomic holder for a [`Boundary`]
///
/// Writers build a candidate range and install it with a pointer CAS,
/// retrying from the freshly observed value on failure. Readers copy the
/// whole pair out in one atomic load — there is no state in which a reader
/// can pair one call's `lower` with another call's `upper`.
///
/// # Example
///
/// ```
/// use tierlock::BoundaryCell;
///
/// let cell = BoundaryCell::new();
/// cell.set_boundary(5, 10).unwrap();
///
/// let range = cell.get_boundary();
/// assert_eq!((range.lower(), range.upper()), (5, 10));
///
/// assert!(cell.set_boundary(20, 10).is_err()); // rejected before any update
/// assert_eq!(cell.get_boundary().lower(), 5);
/// ```
pub struct BoundaryCell {
    current: ArcSwap<Boundary>,
}

impl BoundaryCell {
    /// Create holding the unbounded default range
    pub fn new() -> Self {
        Self::with_boundary(Boundary::default())
    }

    /// Create holding a pre-validated range
    pub fn with_boundary(boundary: Boundary) -> Self {
        Self {
            current: ArcSwap::from_pointee(boundary),
        }
    }

    /// Validate and atomically replace the held range
    ///
    /// Fails before touching the cell when `lower > upper`. The replacement
    /// itself is a CAS retry loop with a cooperative yield between
    /// attempts; it cannot fail, only retry.
    pub fn set_boundary(&self, lower: i64, upper: i64) -> Result<(), BoundaryError> {
        let candidate = Boundary::new(lower, upper)?;
        self.replace(candidate);
        Ok(())
    }

    /// Atomically replace the held range with an already-validated one
    pub fn replace(&self, boundary: Boundary) {
        let candidate = Arc::new(boundary);
        loop {
            let current = self.current.load_full();
            let previous = self
                .current
                .compare_and_swap(&current, Arc::clone(&candidate));
            if Arc::ptr_eq(&*previous, &current) {
                return;
            }
            log::trace!(
                "boundary CAS lost the race, retrying against ({}, {})",
                previous.lower,
                previous.upper
            );
            thread::yield_now();
        }
    }

    /// Atomically read the held range as an independent copy
    ///
    /// The returned value is `Copy` and detached from the cell; a racing
    /// writer can never mutate it after the read.
    #[inline]
    pub fn get_boundary(&self) -> Boundary {
        **self.current.load()
    }
}

impl Default for BoundaryCell {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BoundaryCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let boundary = self.get_boundary();
        f.debug_struct("BoundaryCell")
            .field("lower", &boundary.lower)
            .field("upper", &boundary.upper)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unbounded() {
        let cell = BoundaryCell::new();
        let boundary = cell.get_boundary();
        assert_eq!(boundary.lower(), i64::MIN);
        assert_eq!(boundary.upper(), i64::MAX);
    }

    #[test]
    fn test_set_and_get() {
        let cell = BoundaryCell::new();
        cell.set_boundary(5, 10).unwrap();

        let boundary = cell.get_boundary();
        assert_eq!(boundary.lower(), 5);
        assert_eq!(boundary.upper(), 10);
        assert!(boundary.contains(5));
        assert!(boundary.contains(10));
        assert!(!boundary.contains(11));
        assert_eq!(boundary.width(), 5);
    }

    #[test]
    fn test_inverted_range_rejected_without_update() {
        let cell = BoundaryCell::new();
        cell.set_boundary(5, 10).unwrap();

        let err = cell.set_boundary(20, 10).unwrap_err();
        assert_eq!(
            err,
            BoundaryError::Inverted {
                lower: 20,
                upper: 10
            }
        );
        // The held range is untouched by the rejected call.
        assert_eq!(cell.get_boundary(), Boundary::new(5, 10).unwrap());
    }

    #[test]
    fn test_equal_bounds_are_valid() {
        let cell = BoundaryCell::new();
        cell.set_boundary(7, 7).unwrap();
        assert_eq!(cell.get_boundary().width(), 0);
    }

    #[test]
    fn test_read_is_detached_copy() {
        let cell = BoundaryCell::new();
        cell.set_boundary(1, 2).unwrap();

        let before = cell.get_boundary();
        cell.set_boundary(3, 4).unwrap();

        assert_eq!((before.lower(), before.upper()), (1, 2));
        assert_eq!((cell.get_boundary().lower(), cell.get_boundary().upper()), (3, 4));
    }
}
