//! Rate limiting logic and state management.

mod limiter;

pub use limiter::{Decision, LimitConfig, RateLimiter};
