// src/pipeline.rs
//! Two-thread decode→queue→apply→publish pipeline.
//!
//! The producer thread walks the memory-mapped feed, drops undecodable
//! records, and pushes events into the SPSC ring, yielding while the ring
//! is full. The consumer (the calling thread) pops events, routes them to
//! the owning book, measures decode→apply latency, and emits a top-of-book
//! row per configured symbol on the publish cadence. Both sides re-check
//! the shutdown flag every loop turn; the consumer drains the ring before
//! exiting.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use hashbrown::HashMap;
use tracing::debug;

use crate::book::OrderBook;
use crate::clock;
use crate::decoder::Decoder;
use crate::metrics::{LatencyStats, LatencySummary, PipelineStats};
use crate::publish::TopOfBookPublisher;
use crate::ring;
use crate::wire::{Event, EventBody, Symbol};

/// Matches the feed generator's default message count; holds about one
/// second of feed at the target rate.
pub const DEFAULT_RING_CAPACITY: usize = 1 << 20;

const ORDERS_RESERVE: usize = 1 << 16;

#[derive(Clone, Copy, Debug)]
pub struct PipelineConfig {
    /// Minimum microseconds between top-of-book publishes.
    pub publish_interval_us: u64,
    /// SPSC ring capacity; must be a power of two.
    pub ring_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            publish_interval_us: 1000,
            ring_capacity: DEFAULT_RING_CAPACITY,
        }
    }
}

/// Final accounting returned by [`run`].
#[derive(Debug)]
pub struct PipelineReport {
    pub stats: PipelineStats,
    pub latency: Option<LatencySummary>,
    pub elapsed_us: u64,
}

impl PipelineReport {
    /// Consumed messages per second over the whole run.
    pub fn throughput(&self) -> f64 {
        if self.elapsed_us == 0 {
            return 0.0;
        }
        self.stats.consumed as f64 / (self.elapsed_us as f64 / 1e6)
    }
}

/// Runs the pipeline over `decoder` until the feed is exhausted or
/// `shutdown` is raised, publishing CSV rows to `out`.
pub fn run<W: Write>(
    decoder: Decoder,
    symbols: &[Symbol],
    config: &PipelineConfig,
    out: W,
    shutdown: &AtomicBool,
) -> io::Result<PipelineReport> {
    let mut books: Vec<(Symbol, OrderBook)> = symbols
        .iter()
        .map(|&sym| {
            let mut book = OrderBook::new();
            book.reserve_orders(ORDERS_RESERVE);
            (sym, book)
        })
        .collect();
    let by_symbol: HashMap<Symbol, usize> = symbols
        .iter()
        .enumerate()
        .map(|(i, &sym)| (sym, i))
        .collect();
    // The wire carries no symbol on modify/execute/delete; this index
    // routes them to the owning book in O(1).
    let mut owners: HashMap<u64, usize> = HashMap::with_capacity(ORDERS_RESERVE);

    let mut publisher = TopOfBookPublisher::new(out);
    let mut stats = PipelineStats::default();
    let mut latency = LatencyStats::new();

    let (mut tx, mut rx) = ring::channel::<Event>(config.ring_capacity);
    let feed_done = AtomicBool::new(false);
    let abort = AtomicBool::new(false);

    let start_us = clock::now_us();
    let mut last_publish_us = start_us;

    let (consumed, pushed, invalid) = thread::scope(|s| {
        let feed_done = &feed_done;
        let abort = &abort;

        let producer = s.spawn(move || {
            let mut decoder = decoder;
            let mut pushed = 0u64;
            let mut invalid = 0u64;

            while !shutdown.load(Ordering::Relaxed)
                && !abort.load(Ordering::Relaxed)
                && decoder.has_next()
            {
                let before = decoder.position();
                let Some(mut event) = decoder.next() else {
                    if decoder.position() == before {
                        // Truncated trailing record: nothing left to decode.
                        break;
                    }
                    invalid += 1;
                    continue;
                };

                loop {
                    match tx.try_push(event) {
                        Ok(()) => {
                            pushed += 1;
                            break;
                        }
                        Err(back) => {
                            if shutdown.load(Ordering::Relaxed) || abort.load(Ordering::Relaxed) {
                                feed_done.store(true, Ordering::Release);
                                return (pushed, invalid);
                            }
                            event = back;
                            thread::yield_now();
                        }
                    }
                }
            }

            feed_done.store(true, Ordering::Release);
            (pushed, invalid)
        });

        let mut consumed = 0u64;
        let mut consumer_err: Option<io::Error> = None;

        'consume: loop {
            let Some(event) = rx.try_pop() else {
                if feed_done.load(Ordering::Acquire) || shutdown.load(Ordering::Relaxed) {
                    // Keep draining until the ring is actually empty.
                    if rx.is_empty() {
                        break;
                    }
                    continue;
                }
                thread::yield_now();
                continue;
            };

            consumed += 1;
            if apply_event(&mut books, &by_symbol, &mut owners, &event.body) {
                stats.applied += 1;
                latency.record(clock::now_us().saturating_sub(event.decode_ts_us));
            } else {
                stats.rejected += 1;
            }

            let now_us = clock::now_us();
            if now_us.saturating_sub(last_publish_us) >= config.publish_interval_us {
                for (sym, book) in &books {
                    if let Err(err) = publisher.publish(now_us, *sym, &book.top_of_book()) {
                        consumer_err = Some(err);
                        break 'consume;
                    }
                    stats.rows_published += 1;
                }
                last_publish_us = now_us;
            }
        }

        if consumer_err.is_some() {
            // Let the producer wind down instead of spinning on a full ring.
            abort.store(true, Ordering::Relaxed);
            while rx.try_pop().is_some() {}
        }

        let (pushed, invalid) = match producer.join() {
            Ok(counts) => counts,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        match consumer_err {
            Some(err) => Err(err),
            None => Ok((consumed, pushed, invalid)),
        }
    })?;

    stats.consumed = consumed;
    stats.decoded = pushed;
    stats.invalid_records = invalid;

    debug!(
        pushed,
        consumed,
        invalid,
        applied = stats.applied,
        "pipeline drained"
    );

    Ok(PipelineReport {
        stats,
        latency: latency.summary(),
        elapsed_us: clock::now_us().saturating_sub(start_us),
    })
}

/// Applies one event to the configured books. Adds route by symbol;
/// modify/execute/delete route through the order-id index, which is kept in
/// step with order lifetimes.
fn apply_event(
    books: &mut [(Symbol, OrderBook)],
    by_symbol: &HashMap<Symbol, usize>,
    owners: &mut HashMap<u64, usize>,
    body: &EventBody,
) -> bool {
    match *body {
        EventBody::Add(msg) => {
            let Some(&idx) = by_symbol.get(&msg.symbol) else {
                return false;
            };
            let accepted = books[idx]
                .1
                .on_add(msg.order_id, msg.side, msg.px_nano, msg.qty);
            if accepted {
                owners.insert(msg.order_id, idx);
            }
            accepted
        }
        EventBody::Modify(msg) => {
            let Some(&idx) = owners.get(&msg.order_id) else {
                return false;
            };
            books[idx]
                .1
                .on_modify(msg.order_id, msg.new_px_nano, msg.new_qty)
        }
        EventBody::Execute(msg) => {
            let Some(&idx) = owners.get(&msg.order_id) else {
                return false;
            };
            let book = &mut books[idx].1;
            let accepted = book.on_execute(msg.order_id, msg.exec_qty);
            if accepted && !book.contains_order(msg.order_id) {
                owners.remove(&msg.order_id);
            }
            accepted
        }
        EventBody::Delete(msg) => {
            let Some(&idx) = owners.get(&msg.order_id) else {
                return false;
            };
            let accepted = books[idx].1.on_delete(msg.order_id);
            if accepted {
                owners.remove(&msg.order_id);
            }
            accepted
        }
    }
}
