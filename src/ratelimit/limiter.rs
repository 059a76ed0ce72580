//! Core fixed-window rate limiter implementation.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::error::{FloodgateError, Result};
use crate::metrics;

/// Validated parameters for a rate limit check.
///
/// Construction fails fast on parameters that would produce a nonsensical
/// window, so a `LimitConfig` in hand is always safe to check against.
#[derive(Debug, Clone)]
pub struct LimitConfig {
    /// Maximum requests allowed in the time window
    max_requests: u32,
    /// Duration of the time window
    window: Duration,
}

impl LimitConfig {
    /// Create a new limit configuration.
    pub fn new(max_requests: u32, window: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(FloodgateError::Config(
                "max_requests must be greater than zero".to_string(),
            ));
        }
        if window.is_zero() {
            return Err(FloodgateError::Config(
                "window must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            max_requests,
            window,
        })
    }

    /// Maximum requests allowed in the window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Duration of the window.
    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// Requests left in the current window, saturating at zero
    pub remaining: u32,
    /// When the current window ends
    pub reset_at: Instant,
}

/// A per-key request counter within a fixed window.
///
/// An entry whose `reset_at` has passed is logically expired and is
/// replaced on the next check rather than consulted.
struct RateLimitEntry {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window rate limiter over a shared counter store.
///
/// Windows are per-key and independent: a key's window starts with its
/// first request after the previous window expired, with no global clock
/// alignment. Bursts straddling a window boundary can be admitted on both
/// sides; this matches the documented fixed-window semantics and is not
/// upgraded to a sliding log.
///
/// This struct is thread-safe and can be shared across multiple tasks. A
/// single mutex guards the whole map; critical sections are short and
/// perform no I/O.
pub struct RateLimiter {
    /// Request counters indexed by caller-supplied key
    entries: Mutex<HashMap<String, RateLimitEntry>>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a new rate limiter backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create a new rate limiter with an explicit clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Check the rate limit for a given key.
    ///
    /// Looks up the key's counter, discarding it if its window has
    /// expired, then creates or increments it. The whole
    /// lookup-check-update sequence runs under one lock acquisition, so
    /// concurrent checks for the same key always observe a single counter
    /// lineage.
    ///
    /// A rejected entry keeps counting: once `count` exceeds the limit,
    /// admission stays false for the rest of the window.
    pub fn check(&self, key: &str, limit: &LimitConfig) -> Decision {
        let now = self.clock.now();

        let (decision, tracked_keys) = {
            let mut entries = self.entries.lock();

            let entry = entries.entry(key.to_string()).or_insert_with(|| {
                debug!(key = %key, limit = limit.max_requests, "Starting new rate limit window");
                RateLimitEntry {
                    count: 0,
                    reset_at: now + limit.window,
                }
            });

            if entry.reset_at <= now {
                // Expired: discard the old counter and start a fresh window.
                debug!(key = %key, "Rate limit window expired, starting fresh");
                *entry = RateLimitEntry {
                    count: 0,
                    reset_at: now + limit.window,
                };
            }

            entry.count = entry.count.saturating_add(1);

            let decision = Decision {
                allowed: entry.count <= limit.max_requests,
                remaining: limit.max_requests.saturating_sub(entry.count),
                reset_at: entry.reset_at,
            };

            (decision, entries.len())
        };

        metrics::RATE_LIMIT_KEYS.set(tracked_keys as i64);
        if decision.allowed {
            metrics::REQUESTS_ALLOWED.inc();
        } else {
            debug!(key = %key, "Rate limit exceeded");
            metrics::REQUESTS_REJECTED.inc();
        }
        trace!(
            key = %key,
            allowed = decision.allowed,
            remaining = decision.remaining,
            "Rate limit checked"
        );

        decision
    }

    /// Clear all counters.
    ///
    /// This is primarily useful for testing and must not be exposed as a
    /// production control surface; all in-flight counters are lost.
    pub fn reset(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
    }

    /// Get the number of tracked keys.
    pub fn entry_count(&self) -> usize {
        let entries = self.entries.lock();
        entries.len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
