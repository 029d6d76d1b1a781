// src/ring.rs
//! Lock-free single-producer single-consumer ring buffer.
//!
//! A fixed power-of-two slot array with wrapped head/tail indices. The slot
//! for an index is `index & (capacity - 1)`; the queue is empty when
//! `head == tail` and full when `(tail + 1) & mask == head`, so one slot is
//! permanently unused and the usable capacity is `capacity - 1`.
//!
//! The producer's release store on `tail` publishes the slot write to the
//! consumer's acquire load; symmetrically the consumer's release store on
//! `head` publishes the freed slot to the producer's acquire load. The
//! producer is the sole writer of `tail`, the consumer the sole writer of
//! `head`; exclusive ownership of the two halves enforces the single
//! producer / single consumer contract at compile time. Head and tail live
//! on separate cache lines to avoid false sharing.
//!
//! No blocking anywhere, and no allocation after construction.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[repr(align(64))]
struct CacheAligned(AtomicUsize);

struct Shared<T> {
    buf: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    /// Consumer read index.
    head: CacheAligned,
    /// Producer write index.
    tail: CacheAligned,
}

// Slots are handed off between exactly two threads via the release/acquire
// pairs on head and tail.
unsafe impl<T: Send> Send for Shared<T> {}
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        // Exclusive access here; drop whatever is still queued.
        let mut head = *self.head.0.get_mut();
        let tail = *self.tail.0.get_mut();
        while head != tail {
            unsafe { (*self.buf[head].get()).assume_init_drop() };
            head = (head + 1) & self.mask;
        }
    }
}

/// Creates a connected producer/consumer pair over a ring of `capacity`
/// slots.
///
/// # Panics
/// Panics unless `capacity` is a power of two greater than one.
pub fn channel<T>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(
        capacity.is_power_of_two() && capacity > 1,
        "ring capacity must be a power of two > 1"
    );

    let buf = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let shared = Arc::new(Shared {
        buf,
        mask: capacity - 1,
        head: CacheAligned(AtomicUsize::new(0)),
        tail: CacheAligned(AtomicUsize::new(0)),
    });

    (
        Producer {
            shared: Arc::clone(&shared),
        },
        Consumer { shared },
    )
}

/// Producer half; sole writer of the tail index.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Producer<T> {
    /// Attempts to enqueue `item`, returning it back when the ring is full.
    #[inline]
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        let shared = &*self.shared;
        let tail = shared.tail.0.load(Ordering::Relaxed);
        let next = (tail + 1) & shared.mask;

        if next == shared.head.0.load(Ordering::Acquire) {
            return Err(item); // full
        }

        unsafe { (*shared.buf[tail].get()).write(item) };
        shared.tail.0.store(next, Ordering::Release);
        Ok(())
    }

    /// Approximate number of queued items.
    #[inline]
    pub fn len(&self) -> usize {
        len(&self.shared)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.mask + 1
    }
}

/// Consumer half; sole writer of the head index.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Consumer<T> {
    /// Attempts to dequeue the oldest item.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let shared = &*self.shared;
        let head = shared.head.0.load(Ordering::Relaxed);

        if head == shared.tail.0.load(Ordering::Acquire) {
            return None; // empty
        }

        let item = unsafe { (*shared.buf[head].get()).assume_init_read() };
        shared.head.0.store((head + 1) & shared.mask, Ordering::Release);
        Some(item)
    }

    /// Approximate number of queued items.
    #[inline]
    pub fn len(&self) -> usize {
        len(&self.shared)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.shared.mask + 1
    }
}

#[inline]
fn len<T>(shared: &Shared<T>) -> usize {
    let tail = shared.tail.0.load(Ordering::Acquire);
    let head = shared.head.0.load(Ordering::Acquire);
    tail.wrapping_sub(head) & shared.mask
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_single() {
        let (mut tx, mut rx) = channel::<u64>(16);
        assert!(rx.try_pop().is_none());
        assert!(tx.try_push(42).is_ok());
        assert_eq!(rx.try_pop(), Some(42));
        assert!(rx.try_pop().is_none());
    }

    #[test]
    fn fifo_order() {
        let (mut tx, mut rx) = channel::<u64>(16);
        for i in 0..10 {
            assert!(tx.try_push(i).is_ok());
        }
        for i in 0..10 {
            assert_eq!(rx.try_pop(), Some(i));
        }
    }

    #[test]
    fn full_at_capacity_minus_one() {
        let (mut tx, mut rx) = channel::<u64>(8);
        for i in 0..7 {
            assert!(tx.try_push(i).is_ok(), "slot {i} should fit");
        }
        assert_eq!(tx.try_push(99), Err(99));
        assert_eq!(tx.len(), 7);

        assert_eq!(rx.try_pop(), Some(0));
        assert!(tx.try_push(99).is_ok());
    }

    #[test]
    fn len_wraps_with_indices() {
        let (mut tx, mut rx) = channel::<u64>(4);
        // Cycle enough to wrap the indices several times.
        for i in 0..32 {
            assert!(tx.try_push(i).is_ok());
            assert_eq!(tx.len(), 1);
            assert_eq!(rx.try_pop(), Some(i));
            assert!(rx.is_empty());
        }
    }

    #[test]
    fn capacity_reported() {
        let (tx, rx) = channel::<u64>(1024);
        assert_eq!(tx.capacity(), 1024);
        assert_eq!(rx.capacity(), 1024);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_non_power_of_two() {
        let _ = channel::<u64>(1000);
    }

    #[test]
    fn drops_queued_items() {
        use std::sync::atomic::AtomicUsize;

        static DROPS: AtomicUsize = AtomicUsize::new(0);

        struct Counted;
        impl Drop for Counted {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::Relaxed);
            }
        }

        let (mut tx, rx) = channel::<Counted>(8);
        for _ in 0..5 {
            assert!(tx.try_push(Counted).is_ok());
        }
        drop(tx);
        drop(rx);
        assert_eq!(DROPS.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn threaded_round_trip() {
        let (mut tx, mut rx) = channel::<u64>(64);

        let handle = std::thread::spawn(move || {
            for i in 0..10_000u64 {
                while tx.try_push(i).is_err() {
                    std::thread::yield_now();
                }
            }
        });

        let mut expect = 0u64;
        while expect < 10_000 {
            if let Some(v) = rx.try_pop() {
                assert_eq!(v, expect);
                expect += 1;
            } else {
                std::thread::yield_now();
            }
        }

        handle.join().unwrap();
        assert!(rx.try_pop().is_none());
    }
}
