//! Error type for the delay engine.

use std::collections::TryReserveError;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong inside the delay engine.
///
/// Audio processing itself is infallible. Creating an instance fails only
/// when its buffers cannot be had.
#[derive(Error, Debug)]
pub enum Error {
    /// A sample buffer could not be provided, either because the allocator
    /// refused or because the required length does not fit in a `usize`.
    #[error("failed to allocate a delay buffer of {samples} samples")]
    AllocationFailure {
        /// Requested buffer length, in samples. Saturates at `usize::MAX`.
        samples: usize,
        /// `None` when the length overflowed before anything was requested.
        #[source]
        source: Option<TryReserveError>,
    },

    /// A circular buffer was asked for a length that is not a power of two.
    #[error("buffer capacity {capacity} is not a power of two")]
    InvalidCapacity { capacity: usize },
}
