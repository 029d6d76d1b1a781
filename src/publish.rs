// src/publish.rs
//! CSV top-of-book publisher.
//!
//! One header row, then one row per (timestamp, symbol) snapshot. Prices
//! are fixed-point decimals with nine fractional digits (nano-units), kept
//! in integer math throughout. Rows are flushed immediately so a consumer
//! can tail the stream.

use std::io::{self, Write};

use itoa::Buffer;

use crate::book::TopOfBook;
use crate::wire::Symbol;

const HEADER: &[u8] = b"ts_us,symbol,bid_px,bid_sz,ask_px,ask_sz\n";

pub struct TopOfBookPublisher<W: Write> {
    out: W,
    header_written: bool,
    row: Vec<u8>,
}

impl<W: Write> TopOfBookPublisher<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            header_written: false,
            row: Vec::with_capacity(96),
        }
    }

    /// Writes one CSV row. An empty side prints as `,,`.
    pub fn publish(&mut self, ts_us: u64, symbol: Symbol, tob: &TopOfBook) -> io::Result<()> {
        if !self.header_written {
            self.out.write_all(HEADER)?;
            self.header_written = true;
        }

        let mut buf = Buffer::new();
        self.row.clear();
        self.row.extend_from_slice(buf.format(ts_us).as_bytes());
        self.row.push(b',');
        self.row.extend_from_slice(symbol.as_str().as_bytes());
        self.row.push(b',');

        match tob.bid_px {
            Some(px) => {
                push_px(&mut self.row, &mut buf, px);
                self.row.push(b',');
                self.row.extend_from_slice(buf.format(tob.bid_qty).as_bytes());
            }
            None => self.row.push(b','),
        }
        self.row.push(b',');

        match tob.ask_px {
            Some(px) => {
                push_px(&mut self.row, &mut buf, px);
                self.row.push(b',');
                self.row.extend_from_slice(buf.format(tob.ask_qty).as_bytes());
            }
            None => self.row.push(b','),
        }
        self.row.push(b'\n');

        self.out.write_all(&self.row)?;
        self.out.flush()
    }

    /// Consumes the publisher, handing the sink back.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Formats `px_nano` as `<units>.<9-digit fraction>`.
fn push_px(row: &mut Vec<u8>, buf: &mut Buffer, px_nano: i64) {
    if px_nano < 0 {
        row.push(b'-');
    }
    let abs = px_nano.unsigned_abs();
    row.extend_from_slice(buf.format(abs / 1_000_000_000).as_bytes());
    row.push(b'.');
    let frac = buf.format(abs % 1_000_000_000);
    for _ in frac.len()..9 {
        row.push(b'0');
    }
    row.extend_from_slice(frac.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish_rows(rows: &[(u64, &str, TopOfBook)]) -> String {
        let mut publisher = TopOfBookPublisher::new(Vec::new());
        for &(ts, sym, tob) in rows {
            publisher.publish(ts, Symbol::new(sym), &tob).unwrap();
        }
        String::from_utf8(publisher.into_inner()).unwrap()
    }

    #[test]
    fn header_written_once() {
        let out = publish_rows(&[
            (1, "AAPL", TopOfBook::default()),
            (2, "AAPL", TopOfBook::default()),
        ]);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "ts_us,symbol,bid_px,bid_sz,ask_px,ask_sz");
        assert_eq!(lines[1], "1,AAPL,,,,");
        assert_eq!(lines[2], "2,AAPL,,,,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn two_sided_row() {
        let tob = TopOfBook {
            bid_px: Some(150_500_000_000),
            bid_qty: 100,
            ask_px: Some(151_000_000_000),
            ask_qty: 200,
        };
        let out = publish_rows(&[(42, "AAPL", tob)]);
        assert_eq!(
            out.lines().nth(1).unwrap(),
            "42,AAPL,150.500000000,100,151.000000000,200"
        );
    }

    #[test]
    fn one_sided_rows() {
        let bid_only = TopOfBook {
            bid_px: Some(100_000_000_000),
            bid_qty: 7,
            ..Default::default()
        };
        let ask_only = TopOfBook {
            ask_px: Some(99_000_000_005),
            ask_qty: 3,
            ..Default::default()
        };
        let out = publish_rows(&[(1, "MSFT", bid_only), (2, "MSFT", ask_only)]);
        assert_eq!(out.lines().nth(1).unwrap(), "1,MSFT,100.000000000,7,,");
        assert_eq!(out.lines().nth(2).unwrap(), "2,MSFT,,,99.000000005,3");
    }

    #[test]
    fn fractional_prices_zero_padded() {
        let tob = TopOfBook {
            bid_px: Some(5),
            bid_qty: 1,
            ..Default::default()
        };
        let out = publish_rows(&[(1, "X", tob)]);
        assert_eq!(out.lines().nth(1).unwrap(), "1,X,0.000000005,1,,");
    }

    #[test]
    fn negative_price_formatted() {
        let tob = TopOfBook {
            bid_px: Some(-500_000_000),
            bid_qty: 1,
            ..Default::default()
        };
        let out = publish_rows(&[(1, "X", tob)]);
        assert_eq!(out.lines().nth(1).unwrap(), "1,X,-0.500000000,1,,");
    }

    #[test]
    fn symbol_trimmed_in_row() {
        let tob = TopOfBook::default();
        let out = publish_rows(&[(9, "AB", tob)]);
        assert_eq!(out.lines().nth(1).unwrap(), "9,AB,,,,");
    }
}
