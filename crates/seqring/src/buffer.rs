use crate::invariants::{
    debug_assert_no_wrap, debug_assert_publish_order, debug_assert_single_step,
};
use crate::metrics::Metrics;
use crate::{Config, ConfigError, MetricsSnapshot};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::hint;
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

// =============================================================================
// SEQUENCING & PUBLICATION PROTOCOL
// =============================================================================
//
// Every item gets a signed 64-bit sequence number. The slot index is
// `sequence & mask`; sequences themselves never wrap in practice (2^63 items
// at one per nanosecond is ~292 years).
//
// ## Reservation (wait-free)
//
// `next_sequence.fetch_add(1)` hands out sequence numbers. Concurrent writers
// may finish reserving in any order; the counter is the only authority on who
// owns which sequence.
//
// ## Store
//
// The writer stores its item into `slots[seq & mask]` right after reserving.
// Slots are plain memory (`UnsafeCell<MaybeUninit<T>>`), no per-slot atomics
// and no locks. A slot is uninitialized until the first sequence mapping to it
// is stored; `cursor >= s` implies slot `s & mask` has been initialized.
//
// ## Publication (in order)
//
// 1. Spin until `cursor == seq - 1` (Acquire), i.e. the predecessor published
// 2. Store `cursor = seq` (Release)
//
// Because each publisher acquires its predecessor's release before releasing
// its own, the chain is transitive: a reader that observes `cursor >= s` with
// an Acquire load also observes every slot store for sequences `<= s`.
//
// ## What the buffer does NOT do
//
// It never refuses a write. A sequence `s + capacity` silently overwrites the
// slot of `s`. Keeping readers within one lap is the Writer's job.
//
// ## Single-writer-per-slot invariant
//
// Slot `i` is written by the holder of sequence `s` and read for sequence `s`
// only while no sequence `s + k * capacity` (k >= 1) is being stored into it.
// `Writer` upholds this by never running more than `capacity - writer_count`
// ahead of any tracked reader. Callers that bypass `Writer` and `add` more than
// a lap ahead of a concurrent `get` on the same slot race on that slot.
//
// =============================================================================

/// Sequenced storage that [`Reader`](crate::Reader) and
/// [`Writer`](crate::Writer) operate on.
pub trait RingBuffer {
    /// Item type carried by the buffer.
    type Item: Copy;

    /// Reserves the next sequence, stores `item`, publishes it in sequence
    /// order and returns the sequence.
    fn add(&self, item: Self::Item) -> i64;

    /// Returns the item for `sequence`, waiting until it is published.
    fn get(&self, sequence: i64) -> Self::Item;

    /// Number of slots.
    fn capacity(&self) -> usize;

    /// Highest published sequence, -1 when empty.
    fn latest_slot(&self) -> i64;

    /// Called once for every write that had to wait for a slow reader.
    fn record_backpressure_stall(&self) {}
}

/// Fixed-capacity sequenced ring buffer shared by any number of writers and readers.
///
/// `add` publishes items in strict sequence order; `get` blocks until a
/// sequence is published. Share it behind an [`Arc`](std::sync::Arc) and wrap
/// access in [`Writer`](crate::Writer) / [`Reader`](crate::Reader) to get
/// backpressure and per-consumer cursors.
pub struct AtomicRingBuffer<T> {
    // === WRITER HOT === (cache-line padded)
    /// Next sequence to hand out
    next_sequence: CachePadded<AtomicI64>,

    // === SHARED HOT ===
    /// Highest fully published sequence, -1 when empty
    cursor: CachePadded<AtomicI64>,

    // === COLD STATE ===
    metrics: Metrics,
    config: Config,

    // === DATA ===
    /// Uninitialized until the first write to that index. Fixed-size, never grows.
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Safety: slots are only touched under the publication protocol above. Items
// are copied out to reader threads, so sharing needs `T: Sync` as well.
unsafe impl<T: Send> Send for AtomicRingBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for AtomicRingBuffer<T> {}

impl<T: Copy> AtomicRingBuffer<T> {
    /// Creates a buffer of `config.capacity()` slots.
    ///
    /// Fails if `config.power_of_two` is outside `1..=30`.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let capacity = config.capacity();
        let slots: Box<[UnsafeCell<MaybeUninit<T>>]> = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();

        debug!(
            capacity,
            enable_metrics = config.enable_metrics,
            "ring buffer created"
        );

        Ok(Self {
            next_sequence: CachePadded::new(AtomicI64::new(0)),
            cursor: CachePadded::new(AtomicI64::new(-1)),
            metrics: Metrics::new(),
            config,
            slots,
        })
    }

    /// Creates a buffer of `2^power_of_two` slots with metrics disabled.
    pub fn with_power_of_two(power_of_two: u32) -> Result<Self, ConfigError> {
        Self::new(Config::new(power_of_two, false))
    }

    // ---------------------------------------------------------------------
    // WRITE PATH
    // ---------------------------------------------------------------------

    /// Reserves the next sequence, stores `item` and publishes it.
    ///
    /// Spins until every earlier sequence has been published. Never fails and
    /// never checks readers: calling this directly can overwrite items a
    /// reader has not consumed yet. Use [`Writer`](crate::Writer) for
    /// backpressure.
    pub fn add(&self, item: T) -> i64 {
        let seq = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        debug_assert_no_wrap!(seq);

        // SAFETY: `seq` was handed out to this caller only, and no reader may
        // look at this slot for `seq` before the cursor release below. Older
        // occupants (`seq - k * capacity`) are consumed per the
        // single-writer-per-slot invariant.
        unsafe {
            ptr::write(self.slot(seq).get(), MaybeUninit::new(item));
        }

        let mut spins = 0u64;
        while self.cursor.load(Ordering::Acquire) != seq - 1 {
            spins += 1;
            hint::spin_loop();
        }

        // Only the holder of `cursor + 1` gets here, so nobody else moves the cursor.
        let prev = self.cursor.load(Ordering::Relaxed);
        debug_assert_publish_order!(prev, seq);
        debug_assert_single_step!("cursor", prev, seq);

        self.cursor.store(seq, Ordering::Release);

        if self.config.enable_metrics {
            self.metrics.add_items_published(1);
            self.metrics.add_publish_spins(spins);
        }

        seq
    }

    // ---------------------------------------------------------------------
    // READ PATH
    // ---------------------------------------------------------------------

    /// Returns the item stored for `sequence`, spinning until it is published.
    ///
    /// If `sequence` is more than one lap behind the cursor the slot already
    /// holds a newer item and that item is returned. Avoiding this, and never
    /// reading a slot while a writer a lap ahead is storing into it, is the
    /// caller's responsibility; [`Reader`](crate::Reader) paired with
    /// [`Writer`](crate::Writer) guarantees both.
    ///
    /// # Panics
    ///
    /// Panics if `sequence` is negative.
    pub fn get(&self, sequence: i64) -> T {
        assert!(sequence >= 0, "negative sequence {sequence}");
        loop {
            if let Some(item) = self.try_get(sequence) {
                return item;
            }
            hint::spin_loop();
        }
    }

    /// Non-blocking [`get`](Self::get): `None` if `sequence` is not published
    /// yet or is negative.
    pub fn try_get(&self, sequence: i64) -> Option<T> {
        if sequence < 0 || !self.is_published(sequence) {
            return None;
        }
        // SAFETY: `cursor >= sequence` (Acquire) means the store for
        // `sequence` happened-before this load, so the slot is initialized.
        // `T: Copy`, so reading leaves the slot intact for other readers.
        let item = unsafe { ptr::read(self.slot(sequence).get()).assume_init() };
        Some(item)
    }

    // ---------------------------------------------------------------------
    // STATUS
    // ---------------------------------------------------------------------

    /// Number of slots, fixed at construction.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Highest published sequence, or -1 when nothing has been published.
    ///
    /// Never decreases.
    #[inline]
    pub fn latest_slot(&self) -> i64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Returns `true` once `sequence` is visible to readers.
    #[inline]
    pub fn is_published(&self, sequence: i64) -> bool {
        sequence <= self.latest_slot()
    }

    /// The configuration this buffer was built with.
    pub fn config(&self) -> Config {
        self.config
    }

    /// Snapshot of metrics, all zero unless `enable_metrics` is set.
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }

    #[inline]
    fn slot(&self, sequence: i64) -> &UnsafeCell<MaybeUninit<T>> {
        &self.slots[(sequence as usize) & self.config.mask()]
    }
}

impl<T: Copy> RingBuffer for AtomicRingBuffer<T> {
    type Item = T;

    #[inline]
    fn add(&self, item: T) -> i64 {
        AtomicRingBuffer::add(self, item)
    }

    #[inline]
    fn get(&self, sequence: i64) -> T {
        AtomicRingBuffer::get(self, sequence)
    }

    #[inline]
    fn capacity(&self) -> usize {
        AtomicRingBuffer::capacity(self)
    }

    #[inline]
    fn latest_slot(&self) -> i64 {
        AtomicRingBuffer::latest_slot(self)
    }

    fn record_backpressure_stall(&self) {
        if self.config.enable_metrics {
            self.metrics.add_backpressure_stalls(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_matches_power_of_two() {
        for power in 1..=12 {
            let buf = AtomicRingBuffer::<u64>::with_power_of_two(power).unwrap();
            assert_eq!(buf.capacity(), 1 << power);
        }
    }

    #[test]
    fn test_slots_are_plain_lock_free_storage() {
        use std::mem::size_of;

        fn assert_send_sync<S: Send + Sync>() {}

        // No tag, lock word or padding per slot: a slot is exactly one item.
        assert_eq!(size_of::<UnsafeCell<MaybeUninit<u64>>>(), size_of::<u64>());
        assert_eq!(size_of::<UnsafeCell<MaybeUninit<&str>>>(), size_of::<&str>());
        assert_eq!(
            size_of::<UnsafeCell<MaybeUninit<(usize, u64)>>>(),
            size_of::<(usize, u64)>()
        );

        assert_send_sync::<AtomicRingBuffer<u64>>();
        assert_send_sync::<AtomicRingBuffer<&'static str>>();

        let buf = AtomicRingBuffer::<u64>::with_power_of_two(4).unwrap();
        assert_eq!(buf.slots.len(), buf.capacity());
    }

    #[test]
    fn test_usable_through_trait() {
        fn fill<B: RingBuffer<Item = u32>>(buf: &B, n: u32) -> i64 {
            (0..n).fold(-1, |_, i| buf.add(i))
        }

        let buf = AtomicRingBuffer::<u32>::with_power_of_two(3).unwrap();
        assert_eq!(fill(&buf, 5), 4);
        assert_eq!(RingBuffer::latest_slot(&buf), 4);
        assert_eq!(RingBuffer::get(&buf, 2), 2);
        assert_eq!(RingBuffer::capacity(&buf), 8);
    }

    #[test]
    fn test_invalid_power_of_two_rejected() {
        for power in [0, 31, 32, 64, u32::MAX] {
            let err = AtomicRingBuffer::<u64>::with_power_of_two(power)
                .err()
                .expect("construction should fail");
            assert_eq!(err, ConfigError::InvalidPowerOfTwo { power });
        }
    }

    #[test]
    fn test_empty_buffer() {
        let buf = AtomicRingBuffer::<u64>::with_power_of_two(3).unwrap();
        assert_eq!(buf.latest_slot(), -1);
        assert!(!buf.is_published(0));
        assert_eq!(buf.try_get(0), None);
        assert_eq!(buf.try_get(-1), None);
    }

    #[test]
    fn test_sequential_add_get() {
        let buf = AtomicRingBuffer::<u64>::with_power_of_two(4).unwrap();

        for i in 0..10u64 {
            assert_eq!(buf.add(i * 100), i as i64);
        }

        for k in 0..10 {
            assert_eq!(buf.get(k), k as u64 * 100);
        }
        assert_eq!(buf.latest_slot(), 9);
    }

    #[test]
    fn test_status_is_idempotent() {
        let buf = AtomicRingBuffer::<u32>::with_power_of_two(2).unwrap();
        buf.add(7);
        buf.add(8);

        assert_eq!(buf.latest_slot(), buf.latest_slot());
        assert_eq!(buf.capacity(), buf.capacity());
        assert_eq!(buf.latest_slot(), 1);
        assert_eq!(buf.capacity(), 4);
    }

    #[test]
    fn test_overwrite_after_full_lap() {
        let buf = AtomicRingBuffer::<u32>::with_power_of_two(1).unwrap(); // 2 slots

        buf.add(10);
        buf.add(11);
        buf.add(12); // lands on slot 0

        assert_eq!(buf.latest_slot(), 2);
        assert_eq!(buf.get(2), 12);
        // Sequence 0 has been lapped; its slot now holds sequence 2's item.
        assert_eq!(buf.get(0), 12);
        assert_eq!(buf.get(1), 11);
    }

    #[test]
    #[should_panic(expected = "negative sequence")]
    fn test_get_negative_panics() {
        let buf = AtomicRingBuffer::<u32>::with_power_of_two(1).unwrap();
        buf.get(-1);
    }

    #[test]
    fn test_metrics_disabled_by_default() {
        let buf = AtomicRingBuffer::<u32>::with_power_of_two(2).unwrap();
        buf.add(1);
        assert_eq!(buf.metrics(), MetricsSnapshot::default());
    }

    #[test]
    fn test_metrics_count_publications() {
        let buf = AtomicRingBuffer::<u32>::new(Config::new(2, true)).unwrap();
        for i in 0..5 {
            buf.add(i);
        }
        buf.record_backpressure_stall();

        let snap = buf.metrics();
        assert_eq!(snap.items_published, 5);
        assert_eq!(snap.backpressure_stalls, 1);
        // Single-threaded adds never wait on a predecessor.
        assert_eq!(snap.publish_spins, 0);
    }
}
