//! Caching logic and state management.

mod revalidating;

pub use revalidating::RevalidatingCache;
