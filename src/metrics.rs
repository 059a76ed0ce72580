//! Prometheus metrics for rate-limit decisions and cache outcomes.
//!
//! All counters are incremented outside the component locks and are
//! best-effort: reporting can never block or fail an admission decision
//! or a cache read.

use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_gauge, IntCounter, IntGauge};

lazy_static! {
    pub static ref REQUESTS_ALLOWED: IntCounter = register_int_counter!(
        "floodgate_requests_allowed_total",
        "Requests admitted by the rate limiter"
    )
    .unwrap();
    pub static ref REQUESTS_REJECTED: IntCounter = register_int_counter!(
        "floodgate_requests_rejected_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref RATE_LIMIT_KEYS: IntGauge = register_int_gauge!(
        "floodgate_rate_limit_keys",
        "Number of tracked rate limit keys"
    )
    .unwrap();
    pub static ref CACHE_HITS: IntCounter = register_int_counter!(
        "floodgate_cache_hits_total",
        "Cache reads served from a fresh entry"
    )
    .unwrap();
    pub static ref CACHE_STALE_HITS: IntCounter = register_int_counter!(
        "floodgate_cache_stale_hits_total",
        "Cache reads served from a stale entry while revalidating"
    )
    .unwrap();
    pub static ref CACHE_MISSES: IntCounter = register_int_counter!(
        "floodgate_cache_misses_total",
        "Cache reads that required a synchronous fetch"
    )
    .unwrap();
    pub static ref REFRESH_FAILURES: IntCounter = register_int_counter!(
        "floodgate_refresh_failures_total",
        "Background refreshes that failed and were swallowed"
    )
    .unwrap();
    pub static ref CACHE_ENTRIES: IntGauge = register_int_gauge!(
        "floodgate_cache_entries",
        "Current number of cache entries"
    )
    .unwrap();
}
