//! # feedbook - Binary Feed to Limit Order Book Pipeline
//!
//! This crate ingests a binary market-data feed, reconstructs per-symbol
//! limit order books in real time, and emits periodic top-of-book CSV
//! snapshots. It is built for sustained throughput on the order of a
//! million messages per second with bounded decode→apply tail latency.
//!
//! ## Architecture
//!
//! The pipeline is two threads around a lock-free queue:
//!
//! - **Decoder**: zero-copy cursor over the memory-mapped feed file
//! - **SPSC ring**: fixed-capacity handoff between decoder and applier
//! - **OrderBook**: per-symbol price ladders with per-order tracking and a
//!   no-crossing invariant
//! - **Publisher**: CSV top-of-book emitter on a configurable cadence
//!
//! Data flow: file bytes → [`Decoder`] → [`Event`] → ring →
//! [`OrderBook`] → [`TopOfBook`] → CSV sink.
//!
//! ## Example
//!
//! ```rust
//! use feedbook::book::{OrderBook, Side};
//!
//! let mut book = OrderBook::new();
//! assert!(book.on_add(1, Side::Bid, 150_000_000_000, 100)); // $150.00
//! assert!(book.on_add(2, Side::Ask, 151_000_000_000, 200));
//!
//! let tob = book.top_of_book();
//! assert_eq!(tob.bid_px, Some(150_000_000_000));
//! assert_eq!(tob.ask_qty, 200);
//! ```

pub mod book;
pub mod clock;
pub mod decoder;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod publish;
pub mod ring;
pub mod wire;

pub use book::{OrderBook, Side, TopOfBook};
pub use decoder::Decoder;
pub use error::FeedError;
pub use wire::{Event, EventBody, Symbol};
