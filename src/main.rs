// src/main.rs
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::info;

use feedbook::decoder::Decoder;
use feedbook::pipeline::{self, PipelineConfig};
use feedbook::wire::Symbol;

#[derive(Parser, Debug)]
#[command(
    name = "feedbook",
    version,
    about = "Replay a binary market-data feed into per-symbol order books, publishing top-of-book CSV on stdout"
)]
struct Cli {
    /// Input binary feed file
    #[arg(long)]
    input: PathBuf,

    /// Comma-separated symbols to maintain books for (e.g. "AAPL,MSFT")
    #[arg(long)]
    symbols: String,

    /// Top-of-book publish interval in microseconds
    #[arg(long = "publish-top-of-book-us", default_value_t = 1000)]
    publish_top_of_book_us: u64,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Usage errors exit 1; --help/--version exit 0.
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    // Stdout carries the CSV stream; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(cli) {
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
    ensure!(!symbols.is_empty(), "--symbols must name at least one symbol");

    let decoder =
        Decoder::open(&cli.input).with_context(|| format!("input {}", cli.input.display()))?;
    info!(
        input = %cli.input.display(),
        bytes = decoder.len(),
        symbols = symbols.len(),
        publish_interval_us = cli.publish_top_of_book_us,
        "starting pipeline"
    );

    let config = PipelineConfig {
        publish_interval_us: cli.publish_top_of_book_us,
        ..Default::default()
    };

    // SIGINT/SIGTERM request a cooperative stop; the consumer still drains
    // the ring before exiting.
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .context("install signal handler")?;
    }

    let stdout = io::stdout();
    let report = pipeline::run(decoder, &symbols, &config, stdout.lock(), &shutdown)
        .context("pipeline failed")?;

    info!(
        consumed = report.stats.consumed,
        applied = report.stats.applied,
        rejected = report.stats.rejected,
        invalid = report.stats.invalid_records,
        rows = report.stats.rows_published,
        elapsed_ms = report.elapsed_us / 1000,
        throughput_msgs_per_sec = report.throughput() as u64,
        "pipeline finished"
    );
    if let Some(lat) = &report.latency {
        info!(
            p50_us = lat.p50_us,
            p95_us = lat.p95_us,
            p99_us = lat.p99_us,
            samples = lat.samples,
            "decode->apply latency"
        );
    }

    Ok(())
}
