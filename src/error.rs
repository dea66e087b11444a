//! The error taxonomy exposed at the sieve boundary.
//!
//! Only the failures a caller can reasonably react to are represented here.
//! An invariant violation inside the bucket sieve (overflow, a non-monotone
//! line, an out-of-range offset) is a bug, not a recoverable condition, and
//! is reported via `panic!`/`assert!` instead of `Result`.

use std::fmt;

/// The maximum value this crate will ever sieve to or past.
pub const MAX_HIGHLIMIT: u64 = 4_000_000_000_000_000_000;

/// The maximum interval width `hi - lo` that a single call will sieve.
pub const MAX_WIDTH: u64 = 1_000_000_000_000;

#[derive(Debug, thiserror::Error)]
pub enum SoeError {
    /// `hi` (or a seed-prime bound derived from it) exceeds [`MAX_HIGHLIMIT`],
    /// or the requested width exceeds [`MAX_WIDTH`].
    #[error("requested interval [{lo}, {hi}] is too large for this sieve (limit {limit})")]
    TooLarge { lo: u64, hi: u64, limit: u64 },

    /// `hi < lo`.
    #[error("hi ({hi}) is less than lo ({lo})")]
    InvalidRange { lo: u64, hi: u64 },

    /// A setup-time allocation failed. Steady-state sieving never allocates,
    /// so this can only occur while building the sieve context.
    #[error("failed to allocate {0} bytes while preparing the sieve")]
    OutOfMemory(usize),
}

impl SoeError {
    pub(crate) fn too_large(lo: u64, hi: u64) -> SoeError {
        SoeError::TooLarge { lo, hi, limit: MAX_HIGHLIMIT }
    }
}

/// Alias matching the rest of the crate's `Result<T, SoeError>` usage.
pub type Result<T> = std::result::Result<T, SoeError>;

impl fmt::Display for crate::context::Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            crate::context::Mode::Count => write!(f, "count"),
            crate::context::Mode::Enumerate => write!(f, "enumerate"),
        }
    }
}
