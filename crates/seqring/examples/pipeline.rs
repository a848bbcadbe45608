//! Multi-writer, multi-reader pipeline over a single `AtomicRingBuffer`.
//!
//! Run with: RUST_LOG=seqring=trace cargo run --release --example pipeline

use seqring::{AtomicRingBuffer, Config, Reader, Writer};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const N_WRITERS: usize = 2;
const N_READERS: usize = 3;
const ITEMS_PER_WRITER: u64 = 1_000_000;

#[derive(Debug, Clone, Copy)]
struct Tick {
    writer: usize,
    seq: u64,
    price: f64,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::new(10, true); // 1K slots
    let buffer = Arc::new(AtomicRingBuffer::<Tick>::new(config).expect("valid config"));

    let readers: Vec<_> = (0..N_READERS)
        .map(|_| Reader::new(Arc::clone(&buffer)))
        .collect();
    let cursors: Vec<_> = readers.iter().map(Reader::cursor).collect();

    info!(
        capacity = buffer.capacity(),
        writers = N_WRITERS,
        readers = N_READERS,
        items_per_writer = ITEMS_PER_WRITER,
        "starting pipeline"
    );

    let total = ITEMS_PER_WRITER * N_WRITERS as u64;
    let start = Instant::now();

    let consumers: Vec<_> = readers
        .into_iter()
        .enumerate()
        .map(|(id, mut reader)| {
            thread::spawn(move || {
                let mut next = [0u64; N_WRITERS];
                let mut notional = 0.0;
                for _ in 0..total {
                    let tick = reader.read();
                    assert_eq!(tick.seq, next[tick.writer], "reader {} saw a gap", id);
                    next[tick.writer] += 1;
                    notional += tick.price;
                }
                (id, reader.sequence(), notional)
            })
        })
        .collect();

    let producers: Vec<_> = (0..N_WRITERS)
        .map(|writer_id| {
            let mut writer = Writer::new(Arc::clone(&buffer), cursors.clone(), N_WRITERS);
            thread::spawn(move || {
                for seq in 0..ITEMS_PER_WRITER {
                    writer.write(Tick {
                        writer: writer_id,
                        seq,
                        price: 100.0 + (seq % 7) as f64 * 0.25,
                    });
                }
                writer.sequence()
            })
        })
        .collect();

    for producer in producers {
        let last = producer.join().expect("writer panicked");
        info!(last_sequence = last, "writer done");
    }
    for consumer in consumers {
        let (id, last, notional) = consumer.join().expect("reader panicked");
        info!(reader = id, last_sequence = last, notional, "reader done");
    }

    let elapsed = start.elapsed();
    let metrics = buffer.metrics();
    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        items_per_sec = (total as f64 / elapsed.as_secs_f64()) as u64,
        published = metrics.items_published,
        publish_spins = metrics.publish_spins,
        backpressure_stalls = metrics.backpressure_stalls,
        "pipeline finished"
    );
}
