//! Error types for ring buffer construction.

use thiserror::Error;

/// Errors raised while building an [`AtomicRingBuffer`](crate::AtomicRingBuffer).
///
/// Overruns and starvation are not errors: writers and readers block instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Capacity exponent outside `1..=30`.
    #[error(
        "power of two for ring buffer capacity must be between 1 and 30 (inclusive) \
         to ensure speedy modulus calculations, got {power}"
    )]
    InvalidPowerOfTwo {
        /// The rejected exponent.
        power: u32,
    },
}
