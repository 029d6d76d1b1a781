// src/bin/simgen.rs
//! Synthetic binary feed generator.
//!
//! Emits a plausible order lifecycle stream: adds priced around a $100
//! base, with later modifies, executes and deletes targeting orders that
//! are actually live, so most of the feed is accepted by the books.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use feedbook::book::Side;
use feedbook::clock;
use feedbook::wire::{self, Symbol};

#[derive(Parser, Debug)]
#[command(name = "simgen", version, about = "Generate a synthetic binary market-data feed")]
struct Cli {
    /// Number of messages to generate
    #[arg(long, default_value_t = 1_000_000)]
    messages: u64,

    /// Comma-separated symbols
    #[arg(long, default_value = "AAPL,MSFT")]
    symbols: String,

    /// Output file path
    #[arg(long, default_value = "data/sim.bin")]
    output: PathBuf,

    /// PRNG seed; defaults to a clock-derived value
    #[arg(long)]
    seed: Option<u64>,
}

/// SplitMix64: tiny, fast, and good enough for synthetic data.
struct SplitMix64(u64);

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in [0, 1).
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform in [0, n).
    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

#[derive(Clone, Copy)]
struct LiveOrder {
    order_id: u64,
    px_nano: i64,
    qty: u32,
}

const BASE_PX_NANO: i64 = 100_000_000_000; // $100.00

struct FeedGenerator {
    rng: SplitMix64,
    symbols: Vec<Symbol>,
    live: Vec<Vec<LiveOrder>>,
    next_order_id: u64,
    buf: Vec<u8>,
}

impl FeedGenerator {
    fn new(symbols: Vec<Symbol>, seed: u64) -> Self {
        let live = symbols.iter().map(|_| Vec::new()).collect();
        Self {
            rng: SplitMix64::new(seed),
            symbols,
            live,
            next_order_id: 1,
            buf: Vec::with_capacity(wire::ADD_LEN),
        }
    }

    fn generate<W: Write>(&mut self, out: &mut W, messages: u64) -> Result<()> {
        let mut ts_us = clock::now_us();

        for _ in 0..messages {
            ts_us += (self.rng.next_f64() * 10.0) as u64;
            let sym_idx = self.rng.below(self.symbols.len());

            let roll = self.rng.next_f64();
            self.buf.clear();
            if self.live[sym_idx].is_empty() || roll < 0.4 {
                self.gen_add(ts_us, sym_idx);
            } else if roll < 0.6 {
                self.gen_modify(ts_us, sym_idx);
            } else if roll < 0.8 {
                self.gen_execute(ts_us, sym_idx);
            } else {
                self.gen_delete(ts_us, sym_idx);
            }
            out.write_all(&self.buf)?;
        }

        Ok(())
    }

    fn gen_add(&mut self, ts_us: u64, sym_idx: usize) {
        let order_id = self.next_order_id;
        self.next_order_id += 1;

        let side = if self.rng.next_f64() < 0.5 { Side::Bid } else { Side::Ask };
        // Within ±5% of the base price.
        let factor = 0.95 + self.rng.next_f64() * 0.1;
        let px_nano = (BASE_PX_NANO as f64 * factor) as i64;
        let qty = 100 + (self.rng.next_f64() * 9900.0) as u32;

        wire::encode_add(
            &mut self.buf,
            ts_us,
            order_id,
            self.symbols[sym_idx],
            side,
            px_nano,
            qty,
        );
        self.live[sym_idx].push(LiveOrder { order_id, px_nano, qty });
    }

    fn gen_modify(&mut self, ts_us: u64, sym_idx: usize) {
        let idx = self.rng.below(self.live[sym_idx].len());
        let order = self.live[sym_idx][idx];

        let factor = 0.99 + self.rng.next_f64() * 0.02;
        let new_px = (order.px_nano as f64 * factor) as i64;
        let qty_factor = 0.5 + self.rng.next_f64();
        let new_qty = ((order.qty as f64 * qty_factor) as u32).max(1);

        wire::encode_modify(&mut self.buf, ts_us, order.order_id, new_px, new_qty);
        self.live[sym_idx][idx] = LiveOrder {
            order_id: order.order_id,
            px_nano: new_px,
            qty: new_qty,
        };
    }

    fn gen_execute(&mut self, ts_us: u64, sym_idx: usize) {
        let idx = self.rng.below(self.live[sym_idx].len());
        let order = self.live[sym_idx][idx];

        // 10% to 100% of the remaining quantity.
        let frac = 0.1 + self.rng.next_f64() * 0.9;
        let exec_qty = ((order.qty as f64 * frac) as u32).clamp(1, order.qty);

        wire::encode_execute(&mut self.buf, ts_us, order.order_id, exec_qty);
        if exec_qty == order.qty {
            self.live[sym_idx].swap_remove(idx);
        } else {
            self.live[sym_idx][idx].qty = order.qty - exec_qty;
        }
    }

    fn gen_delete(&mut self, ts_us: u64, sym_idx: usize) {
        let idx = self.rng.below(self.live[sym_idx].len());
        let order = self.live[sym_idx].swap_remove(idx);
        wire::encode_delete(&mut self.buf, ts_us, order.order_id);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let symbols: Vec<Symbol> = cli
        .symbols
        .split(',')
        .filter(|s| !s.is_empty())
        .map(Symbol::new)
        .collect();
    anyhow::ensure!(!symbols.is_empty(), "--symbols must name at least one symbol");

    if let Some(dir) = cli.output.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create output directory {}", dir.display()))?;
        }
    }
    let file = File::create(&cli.output)
        .with_context(|| format!("create output file {}", cli.output.display()))?;
    let mut out = BufWriter::new(file);

    let seed = cli.seed.unwrap_or_else(clock::now_us);
    info!(
        messages = cli.messages,
        symbols = %cli.symbols,
        output = %cli.output.display(),
        seed,
        "generating feed"
    );
    let mut generator = FeedGenerator::new(symbols, seed);

    let start = Instant::now();
    generator.generate(&mut out, cli.messages)?;
    out.flush()?;
    let elapsed = start.elapsed();

    let bytes = fs::metadata(&cli.output)?.len();
    let rate = if elapsed.is_zero() {
        0
    } else {
        (cli.messages as f64 / elapsed.as_secs_f64()) as u64
    };
    info!(
        messages = cli.messages,
        bytes,
        elapsed_ms = elapsed.as_millis() as u64,
        rate_msgs_per_sec = rate,
        "feed written"
    );

    Ok(())
}
