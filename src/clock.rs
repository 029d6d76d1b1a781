// src/clock.rs
use std::sync::OnceLock;
use std::time::Instant;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Microseconds on a process-wide monotonic timeline.
///
/// The timeline starts at the first call; all decode stamps, latency math
/// and publish cadence share it. Wall-clock time is never consulted.
#[inline]
pub fn now_us() -> u64 {
    ANCHOR.get_or_init(Instant::now).elapsed().as_micros() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic() {
        let a = now_us();
        let b = now_us();
        assert!(b >= a);
    }
}
