//! Clock abstraction for time-based policies.
//!
//! Both the rate limiter and the revalidating cache make decisions based on
//! elapsed monotonic time. Routing every time read through the [`Clock`]
//! trait lets tests advance time explicitly instead of sleeping.

use std::time::Instant;

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// System clock implementation using `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::Clock;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    /// Controllable clock for deterministic time-based tests.
    ///
    /// Clones share the underlying time value, so advancing one clone is
    /// visible to every component holding another.
    #[derive(Debug, Clone)]
    pub(crate) struct MockClock {
        current: Arc<Mutex<Instant>>,
    }

    impl MockClock {
        pub(crate) fn new() -> Self {
            Self {
                current: Arc::new(Mutex::new(Instant::now())),
            }
        }

        /// Move the clock forward by `delta`.
        pub(crate) fn advance(&self, delta: Duration) {
            let mut current = self.current.lock();
            *current += delta;
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            *self.current.lock()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mock::MockClock;
    use std::time::Duration;

    #[test]
    fn test_system_clock_advances() {
        let clock = SystemClock::new();
        let t1 = clock.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = clock.now();

        assert!(t2 > t1);
    }

    #[test]
    fn test_mock_clock_advances_explicitly() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(10));
        assert_eq!(clock.now(), start + Duration::from_secs(10));
    }

    #[test]
    fn test_mock_clock_clones_share_time() {
        let clock = MockClock::new();
        let start = clock.now();
        let clone = clock.clone();

        clone.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), start + Duration::from_secs(5));
    }
}
