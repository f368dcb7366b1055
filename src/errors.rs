/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lock ownership errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LockError {
    #[error("release attempted by thread {caller} but lock is held by {holder}")]
    #[diagnostic(
        code(lock::not_owner),
        help("Only the thread that acquired the lock may release it. Check for unbalanced acquire/release pairs.")
    )]
    NotOwner { caller: u64, holder: u64 },

    #[error("release attempted on an unheld lock")]
    #[diagnostic(
        code(lock::not_held),
        help("The lock has no current owner. A release without a matching acquire is a caller bug.")
    )]
    NotHeld,
}

/// Boundary validation errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum BoundaryError {
    #[error("lower bound {lower} exceeds upper bound {upper}")]
    #[diagnostic(
        code(boundary::inverted),
        help("A boundary must satisfy lower <= upper. Swap the arguments or recompute the bounds.")
    )]
    Inverted { lower: i64, upper: i64 },
}
