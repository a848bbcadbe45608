//! seqring - Sequenced Multi-Reader Ring Buffer
//!
//! A fixed-capacity circular buffer for passing a continuous stream of items
//! between threads with minimal latency. Every item gets a monotonically
//! increasing sequence number; writers publish in strict sequence order so
//! readers only ever observe fully written slots.
//!
//! # Key Features
//!
//! - Wait-free sequence reservation (`fetch_add`), in-order publication
//! - Any number of independent readers, each seeing every item once
//! - Writer-side backpressure: a writer never laps the readers it tracks
//! - Pure busy-waiting: no locks, no syscalls, no sleeping
//! - Readers and writers work over any [`RingBuffer`] implementation
//! - Cache-line padded counters
//!
//! Spinning burns a core while waiting. Use this when waits are short and
//! cores are dedicated.
//!
//! # Example
//!
//! ```
//! use seqring::{AtomicRingBuffer, Reader, Writer};
//! use std::sync::Arc;
//!
//! let buffer = Arc::new(AtomicRingBuffer::<u64>::with_power_of_two(4).unwrap());
//! let mut reader = Reader::new(Arc::clone(&buffer));
//! let mut writer = Writer::new(Arc::clone(&buffer), vec![reader.cursor()], 1);
//!
//! writer.write(42);
//! writer.write(43);
//!
//! assert_eq!(reader.read(), 42);
//! assert_eq!(reader.read(), 43);
//! assert_eq!(buffer.latest_slot(), 1);
//! ```

mod buffer;
mod config;
mod error;
mod invariants;
mod metrics;
mod reader;
mod writer;

pub use buffer::{AtomicRingBuffer, RingBuffer};
pub use config::{
    Config, HIGH_THROUGHPUT_CONFIG, LOW_LATENCY_CONFIG, MAX_POWER_OF_TWO, MIN_POWER_OF_TWO,
};
pub use error::ConfigError;
pub use metrics::MetricsSnapshot;
pub use reader::{Reader, ReaderCursor};
pub use writer::Writer;
