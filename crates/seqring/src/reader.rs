use crate::invariants::{debug_assert_published, debug_assert_single_step};
use crate::RingBuffer;
use crossbeam_utils::CachePadded;
use std::hint;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// A single consumer's position in a [`RingBuffer`], typically an
/// [`AtomicRingBuffer`](crate::AtomicRingBuffer).
///
/// Every reader sees every published item exactly once, in sequence order.
/// Reading takes `&mut self`, so a `Reader` is driven by one thread at a time;
/// other threads observe its progress through a [`ReaderCursor`].
pub struct Reader<B> {
    buffer: Arc<B>,
    position: Arc<CachePadded<AtomicI64>>,
}

/// Read-only, shareable view of a [`Reader`]'s position.
///
/// Handed to [`Writer`](crate::Writer)s so they can hold back when this
/// reader falls behind.
#[derive(Clone)]
pub struct ReaderCursor {
    position: Arc<CachePadded<AtomicI64>>,
}

impl ReaderCursor {
    /// Last sequence the reader has fully consumed, or -1.
    #[inline]
    pub fn sequence(&self) -> i64 {
        self.position.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for ReaderCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderCursor")
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl<B: RingBuffer> Reader<B> {
    /// Creates a reader positioned before sequence 0.
    pub fn new(buffer: Arc<B>) -> Self {
        Self {
            buffer,
            position: Arc::new(CachePadded::new(AtomicI64::new(-1))),
        }
    }

    /// Returns the next item, spinning until it is published.
    pub fn read(&mut self) -> B::Item {
        let want = self.next_sequence();
        while self.buffer.latest_slot() < want {
            hint::spin_loop();
        }
        self.consume(want)
    }

    /// Returns the next item if it is already published.
    pub fn try_read(&mut self) -> Option<B::Item> {
        let want = self.next_sequence();
        if self.buffer.latest_slot() < want {
            return None;
        }
        Some(self.consume(want))
    }

    /// Last sequence consumed, or -1 before the first read.
    #[inline]
    pub fn sequence(&self) -> i64 {
        self.position.load(Ordering::Relaxed)
    }

    /// Published items this reader has not consumed yet.
    pub fn available(&self) -> i64 {
        self.buffer.latest_slot() - self.sequence()
    }

    /// Handle for writers that must not lap this reader.
    pub fn cursor(&self) -> ReaderCursor {
        ReaderCursor {
            position: Arc::clone(&self.position),
        }
    }

    #[inline]
    fn next_sequence(&self) -> i64 {
        // Only this reader stores to `position`.
        self.position.load(Ordering::Relaxed) + 1
    }

    /// Fetches a published sequence, then announces it as consumed.
    #[inline]
    fn consume(&mut self, want: i64) -> B::Item {
        debug_assert_published!(want, self.buffer.latest_slot());

        let item = self.buffer.get(want);

        // Release: a writer that sees the new position may reuse the slot.
        let prev = self.position.swap(want, Ordering::Release);
        debug_assert_single_step!("reader position", prev, want);

        item
    }
}

impl<B> std::fmt::Debug for Reader<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("sequence", &self.position.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtomicRingBuffer, Config};

    fn buffer(power: u32) -> Arc<AtomicRingBuffer<u64>> {
        Arc::new(AtomicRingBuffer::new(Config::new(power, false)).unwrap())
    }

    #[test]
    fn test_reader_starts_before_zero() {
        let reader = Reader::new(buffer(2));
        assert_eq!(reader.sequence(), -1);
        assert_eq!(reader.cursor().sequence(), -1);
        assert_eq!(reader.available(), 0);
    }

    #[test]
    fn test_read_in_order() {
        let buf = buffer(4);
        let mut reader = Reader::new(Arc::clone(&buf));

        for i in 0..8 {
            buf.add(i);
        }
        assert_eq!(reader.available(), 8);

        for expected in 0..8 {
            assert_eq!(reader.read(), expected);
            assert_eq!(reader.sequence(), expected as i64);
        }
        assert_eq!(reader.available(), 0);
    }

    #[test]
    fn test_try_read_empty_leaves_position() {
        let buf = buffer(2);
        let mut reader = Reader::new(Arc::clone(&buf));

        assert_eq!(reader.try_read(), None);
        assert_eq!(reader.sequence(), -1);

        buf.add(42);
        assert_eq!(reader.try_read(), Some(42));
        assert_eq!(reader.try_read(), None);
        assert_eq!(reader.sequence(), 0);
    }

    #[test]
    fn test_readers_are_independent() {
        let buf = buffer(3);
        let mut fast = Reader::new(Arc::clone(&buf));
        let mut slow = Reader::new(Arc::clone(&buf));

        buf.add(1);
        buf.add(2);

        assert_eq!(fast.read(), 1);
        assert_eq!(fast.read(), 2);
        assert_eq!(slow.read(), 1);

        assert_eq!(fast.sequence(), 1);
        assert_eq!(slow.sequence(), 0);
    }

    #[test]
    fn test_cursor_tracks_reader() {
        let buf = buffer(2);
        let mut reader = Reader::new(Arc::clone(&buf));
        let cursor = reader.cursor();
        let cursor2 = cursor.clone();

        buf.add(5);
        reader.read();

        assert_eq!(cursor.sequence(), 0);
        assert_eq!(cursor2.sequence(), 0);
    }
}
