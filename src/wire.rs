// src/wire.rs
//! Binary feed framing: packed record layouts and the decoded event types.
//!
//! The feed is a raw concatenation of little-endian records with no
//! inter-record framing. Each record starts with a one-byte tag followed by
//! a fixed payload:
//!
//! | tag | len | fields                                                           |
//! |-----|-----|------------------------------------------------------------------|
//! | `A` | 36  | ts_us u64, order_id u64, symbol [u8;6], side u8, px i64, qty u32 |
//! | `U` | 29  | ts_us u64, order_id u64, new_px i64, new_qty u32                 |
//! | `E` | 21  | ts_us u64, order_id u64, exec_qty u32                            |
//! | `D` | 17  | ts_us u64, order_id u64                                          |

use std::fmt;

use crate::book::Side;

pub const TAG_ADD: u8 = b'A';
pub const TAG_MODIFY: u8 = b'U';
pub const TAG_EXECUTE: u8 = b'E';
pub const TAG_DELETE: u8 = b'D';

pub const ADD_LEN: usize = 36;
pub const MODIFY_LEN: usize = 29;
pub const EXECUTE_LEN: usize = 21;
pub const DELETE_LEN: usize = 17;

/// Fixed six-byte right-space-padded ASCII symbol, compared byte-wise.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol([u8; 6]);

impl Symbol {
    pub const LEN: usize = 6;

    /// Builds a symbol from a string, space-padding and truncating to six
    /// bytes.
    pub fn new(name: &str) -> Self {
        let mut data = [b' '; Self::LEN];
        let bytes = name.as_bytes();
        let n = bytes.len().min(Self::LEN);
        data[..n].copy_from_slice(&bytes[..n]);
        Self(data)
    }

    #[inline]
    pub fn from_bytes(data: [u8; 6]) -> Self {
        Self(data)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Logical string form: trailing spaces trimmed.
    pub fn as_str(&self) -> &str {
        let end = self.0.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
        std::str::from_utf8(&self.0[..end]).unwrap_or("")
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({:?})", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddOrder {
    pub ts_us: u64,
    pub order_id: u64,
    pub symbol: Symbol,
    pub side: Side,
    pub px_nano: i64,
    pub qty: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModifyOrder {
    pub ts_us: u64,
    pub order_id: u64,
    pub new_px_nano: i64,
    pub new_qty: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecuteOrder {
    pub ts_us: u64,
    pub order_id: u64,
    pub exec_qty: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeleteOrder {
    pub ts_us: u64,
    pub order_id: u64,
}

/// A decoded feed record together with the time it left the decoder.
#[derive(Clone, Copy, Debug)]
pub struct Event {
    pub body: EventBody,
    pub decode_ts_us: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventBody {
    Add(AddOrder),
    Modify(ModifyOrder),
    Execute(ExecuteOrder),
    Delete(DeleteOrder),
}

#[inline(always)]
fn read_u32(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(buf[at..at + 4].try_into().unwrap())
}

#[inline(always)]
fn read_u64(buf: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
}

#[inline(always)]
fn read_i64(buf: &[u8], at: usize) -> i64 {
    i64::from_le_bytes(buf[at..at + 8].try_into().unwrap())
}

impl AddOrder {
    /// Decodes a full record (tag byte included, `rec.len() == ADD_LEN`).
    /// Returns `None` when the side byte is not `B`/`S` or the quantity is
    /// zero.
    pub fn decode(rec: &[u8]) -> Option<Self> {
        debug_assert_eq!(rec.len(), ADD_LEN);
        let side = Side::from_byte(rec[23])?;
        let qty = read_u32(rec, 32);
        if qty == 0 {
            return None;
        }
        let mut symbol = [0u8; 6];
        symbol.copy_from_slice(&rec[17..23]);
        Some(Self {
            ts_us: read_u64(rec, 1),
            order_id: read_u64(rec, 9),
            symbol: Symbol::from_bytes(symbol),
            side,
            px_nano: read_i64(rec, 24),
            qty,
        })
    }
}

impl ModifyOrder {
    /// Returns `None` when the new quantity is zero.
    pub fn decode(rec: &[u8]) -> Option<Self> {
        debug_assert_eq!(rec.len(), MODIFY_LEN);
        let new_qty = read_u32(rec, 25);
        if new_qty == 0 {
            return None;
        }
        Some(Self {
            ts_us: read_u64(rec, 1),
            order_id: read_u64(rec, 9),
            new_px_nano: read_i64(rec, 17),
            new_qty,
        })
    }
}

impl ExecuteOrder {
    /// Returns `None` when the executed quantity is zero.
    pub fn decode(rec: &[u8]) -> Option<Self> {
        debug_assert_eq!(rec.len(), EXECUTE_LEN);
        let exec_qty = read_u32(rec, 17);
        if exec_qty == 0 {
            return None;
        }
        Some(Self {
            ts_us: read_u64(rec, 1),
            order_id: read_u64(rec, 9),
            exec_qty,
        })
    }
}

impl DeleteOrder {
    pub fn decode(rec: &[u8]) -> Option<Self> {
        debug_assert_eq!(rec.len(), DELETE_LEN);
        Some(Self {
            ts_us: read_u64(rec, 1),
            order_id: read_u64(rec, 9),
        })
    }
}

#[inline(always)]
fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[inline(always)]
fn push_u64(out: &mut Vec<u8>, v: u64) {
    out.extend_from_slice(&v.to_le_bytes());
}

#[inline(always)]
fn push_i64(out: &mut Vec<u8>, v: i64) {
    out.extend_from_slice(&v.to_le_bytes());
}

pub fn encode_add(
    out: &mut Vec<u8>,
    ts_us: u64,
    order_id: u64,
    symbol: Symbol,
    side: Side,
    px_nano: i64,
    qty: u32,
) {
    out.push(TAG_ADD);
    push_u64(out, ts_us);
    push_u64(out, order_id);
    out.extend_from_slice(symbol.as_bytes());
    out.push(side.as_byte());
    push_i64(out, px_nano);
    push_u32(out, qty);
}

pub fn encode_modify(out: &mut Vec<u8>, ts_us: u64, order_id: u64, new_px_nano: i64, new_qty: u32) {
    out.push(TAG_MODIFY);
    push_u64(out, ts_us);
    push_u64(out, order_id);
    push_i64(out, new_px_nano);
    push_u32(out, new_qty);
}

pub fn encode_execute(out: &mut Vec<u8>, ts_us: u64, order_id: u64, exec_qty: u32) {
    out.push(TAG_EXECUTE);
    push_u64(out, ts_us);
    push_u64(out, order_id);
    push_u32(out, exec_qty);
}

pub fn encode_delete(out: &mut Vec<u8>, ts_us: u64, order_id: u64) {
    out.push(TAG_DELETE);
    push_u64(out, ts_us);
    push_u64(out, order_id);
}
