//! Stale-while-revalidate cache with single-flight refresh.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::error::{BoxError, FloodgateError, Result};
use crate::metrics;

/// A successfully fetched value and the instant it was committed.
struct CachedValue<V> {
    value: V,
    cached_at: Instant,
}

/// Per-key cache state.
///
/// `revalidating` guards background refreshes: at most one is in flight
/// per key. `fetch_lock` serializes the fetches themselves, so concurrent
/// cold-start callers queue behind the first fetch instead of duplicating
/// it. Neither lock is ever held together with the map lock across an
/// await.
struct CacheEntry<V> {
    value: Option<CachedValue<V>>,
    revalidating: bool,
    fetch_lock: Arc<AsyncMutex<()>>,
}

impl<V> Default for CacheEntry<V> {
    fn default() -> Self {
        Self {
            value: None,
            revalidating: false,
            fetch_lock: Arc::new(AsyncMutex::new(())),
        }
    }
}

/// How a read should proceed, decided in one pass under the map lock.
enum ReadState<V> {
    Fresh(V),
    Stale { value: V, start_refresh: bool },
    NeedsFetch { fetch_lock: Arc<AsyncMutex<()>> },
}

/// Stale-while-revalidate cache over a shared entry store.
///
/// Values fresher than `max_age` are served directly. Values older than
/// `max_age` but within the stale window are served immediately while a
/// single background refresh runs. Older (or never-fetched) values cost
/// the caller a synchronous fetch, shared between concurrent callers for
/// the same key.
///
/// This struct is thread-safe; cloning it shares the underlying store, so
/// a clone can be handed to each request handler. A single mutex guards
/// the whole map; critical sections are pure metadata transitions and the
/// fetch itself never runs under the map lock.
pub struct RevalidatingCache<V> {
    entries: Arc<Mutex<HashMap<String, CacheEntry<V>>>>,
    clock: Arc<dyn Clock>,
}

impl<V> Clone for RevalidatingCache<V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<V: Clone + Send + 'static> RevalidatingCache<V> {
    /// Create a new cache backed by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock::new()))
    }

    /// Create a new cache with an explicit clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Get the value for `key`, fetching or revalidating as its age
    /// requires.
    ///
    /// Suspends only on the expired/never-fetched path, until the shared
    /// synchronous fetch completes. A stale-window shorter than `max_age`
    /// is clamped to `max_age` rather than rejected.
    ///
    /// `fetcher` may be invoked more than once over the lifetime of an
    /// entry (background refreshes, later retries), but never twice
    /// concurrently for the same key.
    pub async fn get<F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        max_age: Duration,
        stale_while_revalidate: Duration,
    ) -> Result<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, BoxError>> + Send,
    {
        let stale_window = stale_while_revalidate.max(max_age);

        let state = {
            let mut entries = self.entries.lock();
            let entry = entries.entry(key.to_string()).or_default();
            let now = self.clock.now();

            match &entry.value {
                Some(cached) => {
                    let age = now.saturating_duration_since(cached.cached_at);
                    if age < max_age {
                        ReadState::Fresh(cached.value.clone())
                    } else if age < stale_window {
                        let start_refresh = !entry.revalidating;
                        if start_refresh {
                            entry.revalidating = true;
                        }
                        ReadState::Stale {
                            value: cached.value.clone(),
                            start_refresh,
                        }
                    } else {
                        ReadState::NeedsFetch {
                            fetch_lock: Arc::clone(&entry.fetch_lock),
                        }
                    }
                }
                None => ReadState::NeedsFetch {
                    fetch_lock: Arc::clone(&entry.fetch_lock),
                },
            }
        };

        match state {
            ReadState::Fresh(value) => {
                trace!(key = %key, "Cache hit");
                metrics::CACHE_HITS.inc();
                Ok(value)
            }
            ReadState::Stale {
                value,
                start_refresh,
            } => {
                if start_refresh {
                    self.spawn_refresh(key.to_string(), fetcher);
                }
                trace!(key = %key, "Serving stale value");
                metrics::CACHE_STALE_HITS.inc();
                Ok(value)
            }
            ReadState::NeedsFetch { fetch_lock } => {
                self.fetch_blocking(key, fetcher, stale_window, fetch_lock)
                    .await
            }
        }
    }

    /// Fetch on the caller's schedule, sharing the fetch with concurrent
    /// callers for the same key.
    async fn fetch_blocking<F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        stale_window: Duration,
        fetch_lock: Arc<AsyncMutex<()>>,
    ) -> Result<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, BoxError>> + Send,
    {
        let _guard = fetch_lock.lock().await;

        // A caller that held the lock before us may have committed a
        // usable value already.
        {
            let entries = self.entries.lock();
            if let Some(cached) = entries.get(key).and_then(|e| e.value.as_ref()) {
                let age = self.clock.now().saturating_duration_since(cached.cached_at);
                if age < stale_window {
                    metrics::CACHE_HITS.inc();
                    return Ok(cached.value.clone());
                }
            }
        }

        debug!(key = %key, "Fetching synchronously");
        metrics::CACHE_MISSES.inc();

        match fetcher().await {
            Ok(value) => {
                let mut entries = self.entries.lock();
                let entry = entries.entry(key.to_string()).or_default();
                entry.value = Some(CachedValue {
                    value: value.clone(),
                    cached_at: self.clock.now(),
                });
                metrics::CACHE_ENTRIES.set(entries.len() as i64);
                Ok(value)
            }
            // The entry is left untouched: an old stale value, if any,
            // survives a failed fetch.
            Err(error) => Err(FloodgateError::FetchFailed(error)),
        }
    }

    /// Spawn the fire-and-forget background refresh for `key`.
    ///
    /// The triggering caller never awaits this task. Failures are logged
    /// and counted, never surfaced; the `revalidating` flag is cleared
    /// either way so a later stale read can try again.
    fn spawn_refresh<F, Fut>(&self, key: String, fetcher: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<V, BoxError>> + Send,
    {
        let entries = Arc::clone(&self.entries);
        let clock = Arc::clone(&self.clock);
        debug!(key = %key, "Starting background refresh");

        tokio::spawn(async move {
            let fetch_lock = {
                let entries = entries.lock();
                match entries.get(&key) {
                    Some(entry) => Arc::clone(&entry.fetch_lock),
                    // Entry was cleared since the triggering read.
                    None => return,
                }
            };

            let _guard = fetch_lock.lock().await;
            let result = fetcher().await;

            let mut entries = entries.lock();
            if let Some(entry) = entries.get_mut(&key) {
                match result {
                    Ok(value) => {
                        entry.value = Some(CachedValue {
                            value,
                            cached_at: clock.now(),
                        });
                        trace!(key = %key, "Background refresh complete");
                    }
                    Err(error) => {
                        warn!(key = %key, error = %error, "Background refresh failed, keeping stale value");
                        metrics::REFRESH_FAILURES.inc();
                    }
                }
                entry.revalidating = false;
            }
        });
    }

    /// Remove all entries.
    ///
    /// This is primarily useful for testing and must not be exposed as a
    /// production control surface.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.clear();
        metrics::CACHE_ENTRIES.set(0);
    }

    /// Get the number of cached keys, counting entries whose first fetch
    /// has not completed yet.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock();
        entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone + Send + 'static> Default for RevalidatingCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
