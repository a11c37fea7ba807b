//! Error types for the handful of recoverable construction paths.
//!
//! Hot-path misuse (reservation larger than the ring, a reader advancing
//! after being overrun, `set_count` on a semaphore with live waiters) is
//! treated as a defect and panics; it is not represented here. See
//! `Ring::new` vs `Ring::try_new` below for the one path callers may
//! reasonably want to handle instead of crashing on.

use thiserror::Error;

/// Errors that can occur constructing or operating a [`crate::ring::Ring`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RingError {
    /// The requested ring size was not a power of two.
    #[error("ring size {size} is not a power of two")]
    NotPowerOfTwo {
        /// The rejected size.
        size: i64,
    },
}
