//! Fixed-window bucket state.

use std::time::Duration;

/// Per-key counter state for one fixed window.
///
/// Invariant: `remaining <= capacity` for the owning limiter's capacity.
/// A bucket never refills mid-window; it resets to full once the window
/// duration has elapsed since `window_start`.
#[derive(Debug, Clone)]
pub(crate) struct Bucket {
    remaining: u32,
    window_start: u64,
    last_seen: u64,
}

impl Bucket {
    /// A full bucket whose window starts at `now` (millis).
    pub(crate) fn full(capacity: u32, now: u64) -> Self {
        Self { remaining: capacity, window_start: now, last_seen: now }
    }

    /// Reset to a fresh window if `window_millis` has elapsed since the
    /// window start. Must run before every consume attempt.
    pub(crate) fn refill_if_elapsed(&mut self, capacity: u32, window_millis: u64, now: u64) {
        if now >= self.window_start.saturating_add(window_millis) {
            self.remaining = capacity;
            self.window_start = now;
        }
    }

    /// Consume one point. Returns the points left on success, or the time
    /// until the current window ends when the bucket is exhausted.
    pub(crate) fn consume(&mut self, window_millis: u64, now: u64) -> Result<u32, Duration> {
        self.last_seen = now;
        if self.remaining > 0 {
            self.remaining -= 1;
            Ok(self.remaining)
        } else {
            let window_end = self.window_start.saturating_add(window_millis);
            Err(Duration::from_millis(window_end.saturating_sub(now)))
        }
    }

    pub(crate) fn last_seen(&self) -> u64 {
        self.last_seen
    }

    #[cfg(test)]
    pub(crate) fn remaining(&self) -> u32 {
        self.remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: u64 = 60_000;

    #[test]
    fn fresh_bucket_is_full() {
        let bucket = Bucket::full(5, 0);
        assert_eq!(bucket.remaining(), 5);
    }

    #[test]
    fn consume_decrements_until_exhausted() {
        let mut bucket = Bucket::full(2, 0);

        assert_eq!(bucket.consume(WINDOW, 10), Ok(1));
        assert_eq!(bucket.consume(WINDOW, 20), Ok(0));

        let wait = bucket.consume(WINDOW, 30).unwrap_err();
        assert_eq!(wait, Duration::from_millis(WINDOW - 30));
    }

    #[test]
    fn refill_only_after_window_elapses() {
        let mut bucket = Bucket::full(1, 0);
        assert_eq!(bucket.consume(WINDOW, 0), Ok(0));

        // One millisecond short of the boundary: still exhausted.
        bucket.refill_if_elapsed(1, WINDOW, WINDOW - 1);
        assert!(bucket.consume(WINDOW, WINDOW - 1).is_err());

        // Exactly at the boundary: fresh window.
        bucket.refill_if_elapsed(1, WINDOW, WINDOW);
        assert_eq!(bucket.consume(WINDOW, WINDOW), Ok(0));
    }

    #[test]
    fn exhausted_bucket_does_not_go_negative() {
        let mut bucket = Bucket::full(1, 0);
        assert_eq!(bucket.consume(WINDOW, 0), Ok(0));

        for now in [1, 2, 3] {
            assert!(bucket.consume(WINDOW, now).is_err());
        }
        assert_eq!(bucket.remaining(), 0);
    }

    #[test]
    fn consume_tracks_last_seen() {
        let mut bucket = Bucket::full(1, 0);
        let _ = bucket.consume(WINDOW, 500);
        assert_eq!(bucket.last_seen(), 500);
    }
}
