//! Floodgate - In-Process Rate Limiting and Revalidating Cache
//!
//! This crate implements the two stateful concurrency primitives a single
//! service instance needs for admission control and response caching: a
//! fixed-window rate limiter with a shared counter store, and a
//! stale-while-revalidate cache with single-flight refresh. Both are
//! self-contained, thread-safe leaf components designed to be constructed
//! once and shared across request handlers.

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod ratelimit;

pub use cache::RevalidatingCache;
pub use clock::{Clock, SystemClock};
pub use config::FloodgateConfig;
pub use error::{BoxError, FloodgateError, Result};
pub use ratelimit::{Decision, LimitConfig, RateLimiter};
