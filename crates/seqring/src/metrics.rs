use std::sync::atomic::{AtomicU64, Ordering};

/// Optional counters for monitoring buffer behaviour.
///
/// All counters use relaxed atomics; they are statistics, not synchronization.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    items_published: AtomicU64,
    publish_spins: AtomicU64,
    backpressure_stalls: AtomicU64,
}

/// Point-in-time copy of a buffer's counters, see
/// [`AtomicRingBuffer::metrics`](crate::AtomicRingBuffer::metrics).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Items made visible to readers.
    pub items_published: u64,
    /// Spin iterations spent in `add` waiting for a predecessor to publish.
    pub publish_spins: u64,
    /// Writes that had to wait for a slow reader.
    pub backpressure_stalls: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn add_items_published(&self, n: u64) {
        self.items_published.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_publish_spins(&self, n: u64) {
        self.publish_spins.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_backpressure_stalls(&self, n: u64) {
        self.backpressure_stalls.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            items_published: self.items_published.load(Ordering::Relaxed),
            publish_spins: self.publish_spins.load(Ordering::Relaxed),
            backpressure_stalls: self.backpressure_stalls.load(Ordering::Relaxed),
        }
    }
}
