use crate::ConfigError;

/// Smallest accepted capacity exponent (2 slots).
pub const MIN_POWER_OF_TWO: u32 = 1;

/// Largest accepted capacity exponent (1G slots).
pub const MAX_POWER_OF_TWO: u32 = 30;

/// Configuration for [`AtomicRingBuffer`](crate::AtomicRingBuffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Ring buffer size as power of 2 (default: 16 = 64K slots)
    pub power_of_two: u32,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(power_of_two: u32, enable_metrics: bool) -> Self {
        Self {
            power_of_two,
            enable_metrics,
        }
    }

    /// Checks that the capacity exponent is within
    /// [`MIN_POWER_OF_TWO`]..=[`MAX_POWER_OF_TWO`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (MIN_POWER_OF_TWO..=MAX_POWER_OF_TWO).contains(&self.power_of_two) {
            Ok(())
        } else {
            Err(ConfigError::InvalidPowerOfTwo {
                power: self.power_of_two,
            })
        }
    }

    /// Returns the capacity of the ring buffer.
    ///
    /// Only meaningful once [`validate`](Self::validate) has passed.
    #[inline]
    pub const fn capacity(&self) -> usize {
        1 << self.power_of_two
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity() - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            power_of_two: 16, // 64K slots
            enable_metrics: false,
        }
    }
}

/// Low latency configuration (4K slots, fits in L1 cache)
pub const LOW_LATENCY_CONFIG: Config = Config::new(12, false);

/// High throughput configuration (256K slots)
pub const HIGH_THROUGHPUT_CONFIG: Config = Config::new(18, false);
