// src/decoder.rs
//! Memory-mapped binary feed decoder.
//!
//! The whole feed file is mapped read-only at construction; decoding is a
//! cursor walk over the mapping, so reads are page faults rather than
//! syscalls. The decoder owns the mapping exclusively for its lifetime and
//! is movable but not clonable.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::clock;
use crate::error::{FeedError, Result};
use crate::wire::{
    self, AddOrder, DeleteOrder, Event, EventBody, ExecuteOrder, ModifyOrder,
};

/// Sequential decoder over a memory-mapped feed file.
pub struct Decoder {
    map: Mmap,
    pos: usize,
}

/// Fixed-size record that can be lifted out of the mapping.
trait Record: Sized {
    const LEN: usize;
    fn parse(rec: &[u8]) -> Option<Self>;
    fn into_body(self) -> EventBody;
}

impl Record for AddOrder {
    const LEN: usize = wire::ADD_LEN;
    fn parse(rec: &[u8]) -> Option<Self> {
        AddOrder::decode(rec)
    }
    fn into_body(self) -> EventBody {
        EventBody::Add(self)
    }
}

impl Record for ModifyOrder {
    const LEN: usize = wire::MODIFY_LEN;
    fn parse(rec: &[u8]) -> Option<Self> {
        ModifyOrder::decode(rec)
    }
    fn into_body(self) -> EventBody {
        EventBody::Modify(self)
    }
}

impl Record for ExecuteOrder {
    const LEN: usize = wire::EXECUTE_LEN;
    fn parse(rec: &[u8]) -> Option<Self> {
        ExecuteOrder::decode(rec)
    }
    fn into_body(self) -> EventBody {
        EventBody::Execute(self)
    }
}

impl Record for DeleteOrder {
    const LEN: usize = wire::DELETE_LEN;
    fn parse(rec: &[u8]) -> Option<Self> {
        DeleteOrder::decode(rec)
    }
    fn into_body(self) -> EventBody {
        EventBody::Delete(self)
    }
}

impl Decoder {
    /// Opens and maps `path`. Fails with [`FeedError::Io`] when the file
    /// cannot be opened or mapped, and with [`FeedError::EmptyInput`] when
    /// it has zero length.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = unsafe { Mmap::map(&file) }.map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if map.is_empty() {
            return Err(FeedError::EmptyInput(path.to_path_buf()));
        }
        Ok(Self { map, pos: 0 })
    }

    /// True while the cursor has not reached the end of the mapping.
    #[inline]
    pub fn has_next(&self) -> bool {
        self.pos < self.map.len()
    }

    /// Current cursor offset in bytes.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total mapped file size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Rewinds the cursor to the start of the file. Decoding from here
    /// yields the same record sequence again.
    #[inline]
    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Decodes the record at the cursor.
    ///
    /// Returns `None` in three distinguishable situations:
    /// - end of file (`has_next()` is now false);
    /// - a complete record that failed validation — the cursor has advanced
    ///   past it and the stream continues;
    /// - a known tag whose record is cut off by end of file — the cursor
    ///   does **not** advance, so `position()` is unchanged and the caller
    ///   should treat the stream as exhausted.
    ///
    /// A byte that is not a known tag is skipped and decoding retries at
    /// the next byte; a single unknown byte is the only tolerated framing
    /// corruption.
    pub fn next(&mut self) -> Option<Event> {
        loop {
            let &tag = self.map.get(self.pos)?;
            match tag {
                wire::TAG_ADD => return self.take::<AddOrder>(),
                wire::TAG_MODIFY => return self.take::<ModifyOrder>(),
                wire::TAG_EXECUTE => return self.take::<ExecuteOrder>(),
                wire::TAG_DELETE => return self.take::<DeleteOrder>(),
                _ => self.pos += 1, // resync one byte at a time
            }
        }
    }

    fn take<R: Record>(&mut self) -> Option<Event> {
        let rec = self.map.get(self.pos..self.pos + R::LEN)?;
        let decoded = R::parse(rec);
        self.pos += R::LEN;
        Some(Event {
            body: decoded?.into_body(),
            decode_ts_us: clock::now_us(),
        })
    }
}
