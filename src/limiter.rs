//! Fixed-window limiter keyed by caller identity.
//!
//! A [`Limiter`] owns a private key→bucket map; nothing is shared between
//! limiter instances. Buckets are created lazily on first use, live in
//! process memory for the life of the process, and are never persisted.
//! Restarting the process clears all limiter state; this is a documented
//! trade-off, not a bug.
//!
//! The map grows with distinct keys. It has no implicit eviction; callers
//! that expect large key churn can wire [`Limiter::evict_idle`] to a
//! maintenance task.

use crate::bucket::Bucket;
use crate::clock::{Clock, MonotonicClock};
use crate::error::ConfigError;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Immutable capacity/window pair for one limiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimiterConfig {
    capacity: u32,
    window: Duration,
}

impl LimiterConfig {
    /// Validate and build a config.
    ///
    /// Fails fast on zero capacity or a zero window; a misconfigured limiter
    /// never constructs.
    pub fn new(capacity: u32, window: Duration) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        Ok(Self { capacity, window })
    }

    /// Points admitted per window.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Window duration.
    pub fn window(&self) -> Duration {
        self.window
    }

    fn window_millis(&self) -> u64 {
        u64::try_from(self.window.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Outcome of a single admission check. The only domain outcomes are admit
/// and reject; `consume` never fails otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The request may proceed.
    Admitted {
        /// Points left in the key's bucket after this admission.
        remaining: u32,
    },
    /// The key's bucket is exhausted for the current window.
    Rejected {
        /// Time until the window ends and the bucket refills.
        retry_after: Duration,
    },
}

impl Outcome {
    /// Helper to check if admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }

    /// Time until refill, if rejected.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Rejected { retry_after } => Some(*retry_after),
            Self::Admitted { .. } => None,
        }
    }
}

/// Fixed-window rate limiter with per-key buckets.
pub struct Limiter {
    config: LimiterConfig,
    clock: Arc<dyn Clock>,
    buckets: Mutex<HashMap<String, Bucket>>,
    checks: AtomicU64,
    admitted: AtomicU64,
    rejected: AtomicU64,
}

impl std::fmt::Debug for Limiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Limiter")
            .field("config", &self.config)
            .field("checks", &self.checks)
            .field("admitted", &self.admitted)
            .field("rejected", &self.rejected)
            .finish()
    }
}

impl Limiter {
    /// Create a limiter from a validated config.
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            clock: Arc::new(MonotonicClock::default()),
            buckets: Mutex::new(HashMap::new()),
            checks: AtomicU64::new(0),
            admitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Override the clock (useful for deterministic tests).
    ///
    /// # Example
    /// ```rust
    /// use std::time::Duration;
    /// use turnstile::{Limiter, LimiterConfig, ManualClock};
    ///
    /// let clock = ManualClock::new();
    /// let limiter = Limiter::new(LimiterConfig::new(1, Duration::from_secs(60)).unwrap())
    ///     .with_clock(clock.clone());
    ///
    /// assert!(limiter.consume("k").is_admitted());
    /// assert!(!limiter.consume("k").is_admitted());
    ///
    /// clock.advance(60_000);
    /// assert!(limiter.consume("k").is_admitted());
    /// ```
    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Check-and-decrement the bucket for `key`.
    ///
    /// A missing bucket is created full. If the key's window has elapsed the
    /// bucket refills to capacity before the check. The bucket is only
    /// decremented on admission, so rejected calls cannot push it negative.
    ///
    /// Synchronous and non-blocking; the map lock makes the refill check and
    /// decrement atomic with respect to concurrent calls on the same key.
    pub fn consume(&self, key: &str) -> Outcome {
        self.checks.fetch_add(1, Ordering::Relaxed);

        let now = self.clock.now_millis();
        let window_millis = self.config.window_millis();

        let mut buckets = self.buckets.lock().unwrap();
        let bucket = match buckets.entry(key.to_owned()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                tracing::debug!(key, "new admission bucket");
                entry.insert(Bucket::full(self.config.capacity, now))
            }
        };

        bucket.refill_if_elapsed(self.config.capacity, window_millis, now);
        match bucket.consume(window_millis, now) {
            Ok(remaining) => {
                self.admitted.fetch_add(1, Ordering::Relaxed);
                Outcome::Admitted { remaining }
            }
            Err(retry_after) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                Outcome::Rejected { retry_after }
            }
        }
    }

    /// Drop buckets that have not been touched within `max_idle`.
    ///
    /// Never runs implicitly; schedule it from a maintenance task if key
    /// churn makes unbounded map growth a concern.
    pub fn evict_idle(&self, max_idle: Duration) {
        let now = self.clock.now_millis();
        let idle_millis = u64::try_from(max_idle.as_millis()).unwrap_or(u64::MAX);

        let mut buckets = self.buckets.lock().unwrap();
        let before = buckets.len();
        buckets.retain(|_, bucket| now.saturating_sub(bucket.last_seen()) <= idle_millis);
        let evicted = before - buckets.len();
        if evicted > 0 {
            tracing::debug!(evicted, "evicted idle admission buckets");
        }
    }

    /// Number of live buckets.
    pub fn active_buckets(&self) -> usize {
        self.buckets.lock().unwrap().len()
    }

    /// Total admission checks.
    pub fn checks(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    /// Total admitted requests.
    pub fn admitted(&self) -> u64 {
        self.admitted.load(Ordering::Relaxed)
    }

    /// Total rejected requests.
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// The limiter's configuration.
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }
}
