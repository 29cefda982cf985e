//! Error type for partitioning and indexing.

use std::error::Error as StdError;
use std::fmt;

/// Errors reported by the partitioning and indexing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A single micro-cell is covered by more splats than the bucket budget
    /// allows, so no partition can satisfy the limit. Carries the offending
    /// count so callers can suggest a larger budget.
    Density {
        /// Splats covering the worst cell.
        cell_splats: u64,
    },
    /// The splat source contains no splats.
    EmptyInput,
    /// A quantity exceeds its representation limit (range end past 64 bits,
    /// grid dimension past the supported maximum, too many splats for one
    /// tree).
    OutOfRange(&'static str),
    /// A parameter violates a documented precondition.
    InvalidArgument(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Density { cell_splats } => write!(
                f,
                "too many splats covering one cell ({cell_splats}); raise the bucket splat limit"
            ),
            Error::EmptyInput => write!(f, "at least one input splat is required"),
            Error::OutOfRange(what) => write!(f, "out of range: {what}"),
            Error::InvalidArgument(what) => write!(f, "invalid argument: {what}"),
        }
    }
}

impl StdError for Error {}
