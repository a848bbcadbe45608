use crate::{ReaderCursor, RingBuffer};
use std::hint;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// A producer handle that refuses to lap slow readers.
///
/// Before each write the writer checks every tracked [`ReaderCursor`]: if any
/// reader is more than `max_lag = capacity - writer_count` sequences behind
/// this writer's last published sequence, the write spins until it catches up.
///
/// The check compares readers against *this* writer's last sequence, not the
/// buffer cursor. With several writers the bound is therefore approximate:
/// sibling writers' publications are not visible to it.
pub struct Writer<B> {
    buffer: Arc<B>,
    readers: Vec<ReaderCursor>,
    max_lag: i64,
    last_published: i64,
}

impl<B: RingBuffer> Writer<B> {
    /// Creates a writer that respects `readers`.
    ///
    /// `writer_count` is the total number of writers sharing `buffer`. A count
    /// at or above the capacity gives a non-positive margin, which stalls every
    /// write until all readers have caught up; it is accepted as-is.
    pub fn new(
        buffer: Arc<B>,
        readers: Vec<ReaderCursor>,
        writer_count: usize,
    ) -> Self {
        let capacity = buffer.capacity();
        // Saturate instead of wrapping on absurd writer counts.
        let max_lag = i64::try_from(capacity)
            .unwrap_or(i64::MAX)
            .saturating_sub(i64::try_from(writer_count).unwrap_or(i64::MAX));

        if max_lag <= 0 {
            warn!(
                capacity,
                writer_count,
                max_lag,
                "writer margin is not positive, every write will wait for readers"
            );
        }
        debug!(
            max_lag,
            tracked_readers = readers.len(),
            writer_count,
            "writer created"
        );

        Self {
            buffer,
            readers,
            max_lag,
            last_published: -1,
        }
    }

    /// Publishes `item`, spinning first while any tracked reader is too far behind.
    ///
    /// Returns the sequence assigned to `item`.
    pub fn write(&mut self, item: B::Item) -> i64 {
        if let Some(reader_sequence) = self.lagging_reader() {
            trace!(
                writer_sequence = self.last_published,
                reader_sequence,
                max_lag = self.max_lag,
                "writer stalled on slow reader"
            );
            self.buffer.record_backpressure_stall();

            while self.lagging_reader().is_some() {
                hint::spin_loop();
            }
        }
        self.publish(item)
    }

    /// Publishes `item` unless a tracked reader is too far behind, in which
    /// case the item is handed back.
    pub fn try_write(&mut self, item: B::Item) -> Result<i64, B::Item> {
        if self.lagging_reader().is_some() {
            return Err(item);
        }
        Ok(self.publish(item))
    }

    /// Sequence of this writer's last publication, or -1.
    #[inline]
    pub fn sequence(&self) -> i64 {
        self.last_published
    }

    /// Largest distance a tracked reader may trail this writer.
    #[inline]
    pub fn max_lag(&self) -> i64 {
        self.max_lag
    }

    /// Returns `true` if the next [`write`](Self::write) would have to wait.
    pub fn is_backpressured(&self) -> bool {
        self.lagging_reader().is_some()
    }

    #[inline]
    fn publish(&mut self, item: B::Item) -> i64 {
        self.last_published = self.buffer.add(item);
        self.last_published
    }

    /// Sequence of the first tracked reader that is more than `max_lag` behind.
    #[inline]
    fn lagging_reader(&self) -> Option<i64> {
        self.readers
            .iter()
            .map(ReaderCursor::sequence)
            .find(|&reader| self.last_published - reader > self.max_lag)
    }
}

impl<B> std::fmt::Debug for Writer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("sequence", &self.last_published)
            .field("max_lag", &self.max_lag)
            .field("tracked_readers", &self.readers.len())
            .finish_non_exhaustive()
    }
}
