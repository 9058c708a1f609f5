//! Caching layer for Sleeper API responses.
//!
//! Entries are keyed by logical request (endpoint name plus sorted
//! parameters) and expire after a per-entry TTL chosen by endpoint class.
//! Concurrent misses for the same key share one load: the first caller
//! starts it on a spawned task and later callers attach to it, so a
//! cancelled caller never aborts a load others are waiting for.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use moka::Expiry;
use moka::future::Cache as MokaCache;
use moka::policy::EvictionPolicy;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::sleeper::{SleeperError, TtlClass};

/// Identity of a logical request: endpoint name and its parameters.
///
/// Parameters are sorted by name, so the key doesn't depend on the order
/// they were supplied in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: &'static str,
    params: Vec<(&'static str, String)>,
}

impl CacheKey {
    pub fn new(
        endpoint: &'static str,
        params: impl IntoIterator<Item = (&'static str, String)>,
    ) -> Self {
        let mut params: Vec<_> = params.into_iter().collect();
        params.sort();
        Self { endpoint, params }
    }

    pub fn endpoint(&self) -> &'static str {
        self.endpoint
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.endpoint)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str(")")
    }
}

/// Configuration for the cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// TTL for the players directory.
    pub reference_ttl: Duration,

    /// TTL for users and league membership.
    pub identity_ttl: Duration,

    /// TTL for league, roster and season state.
    pub live_ttl: Duration,

    /// Maximum number of cached entries. Least recently used go first.
    pub max_capacity: u64,
}

impl CacheConfig {
    /// TTL for an endpoint class.
    pub fn ttl_for(&self, class: TtlClass) -> Duration {
        match class {
            TtlClass::Reference => self.reference_ttl,
            TtlClass::Identity => self.identity_ttl,
            TtlClass::Live => self.live_ttl,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            reference_ttl: Duration::from_secs(6 * 60 * 60),
            identity_ttl: Duration::from_secs(5 * 60),
            live_ttl: Duration::from_secs(30),
            max_capacity: 1000,
        }
    }
}

/// Cache statistics (for monitoring).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses that joined a load already in flight.
    pub coalesced: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub entry_count: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    loads: AtomicU64,
    load_failures: AtomicU64,
}

#[derive(Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl<V> Expiry<CacheKey, Entry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &CacheKey,
        value: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &CacheKey,
        value: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

type Load<V> = Shared<BoxFuture<'static, Result<V, SleeperError>>>;

/// TTL cache with single-flight loading.
pub struct ResponseCache<V> {
    entries: MokaCache<CacheKey, Entry<V>>,
    in_flight: Arc<Mutex<HashMap<CacheKey, Load<V>>>>,
    counters: Arc<Counters>,
}

impl<V> ResponseCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a new cache with the given capacity bound.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(config.max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(PerEntryTtl)
            .build();

        info!(max_capacity = config.max_capacity, "response cache initialised");

        Self {
            entries,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Return the live value for `key`, or run `loader` to produce it.
    ///
    /// At most one `loader` runs per key at a time; callers arriving while
    /// it runs receive its result. Failures are handed to every waiter and
    /// are not cached.
    pub async fn get_or_load<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        loader: F,
    ) -> Result<V, SleeperError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, SleeperError>> + Send + 'static,
    {
        self.get_or_load_with(key, move || {
            let load = loader();
            async move { load.await.map(|value| (value, Some(ttl))) }
        })
        .await
    }

    /// Like [`get_or_load`](Self::get_or_load), but the loader also says how
    /// long to keep its value. `None` hands the value to the waiting callers
    /// without storing it.
    pub async fn get_or_load_with<F, Fut>(&self, key: CacheKey, loader: F) -> Result<V, SleeperError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(V, Option<Duration>), SleeperError>> + Send + 'static,
    {
        if let Some(entry) = self.entries.get(&key).await {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            debug!(%key, "cache hit");
            return Ok(entry.value);
        }

        let load = {
            let mut in_flight = self.in_flight.lock().await;

            if let Some(load) = in_flight.get(&key) {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(%key, "joining in-flight load");
                load.clone()
            } else if let Some(entry) = self.entries.get(&key).await {
                // A load finished between the first lookup and taking the lock.
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                debug!(%key, "cache hit");
                return Ok(entry.value);
            } else {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!(%key, "cache miss");
                let load = self.spawn_load(key.clone(), loader);
                in_flight.insert(key, load.clone());
                load
            }
        };

        load.await
    }

    /// Start `loader` on its own task and return a shareable handle to it.
    ///
    /// Must be called with the in-flight lock held: the task removes its own
    /// in-flight entry on completion, after storing a successful value.
    fn spawn_load<F, Fut>(&self, key: CacheKey, loader: F) -> Load<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(V, Option<Duration>), SleeperError>> + Send + 'static,
    {
        let entries = self.entries.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let counters = Arc::clone(&self.counters);

        let task = tokio::spawn(async move {
            counters.loads.fetch_add(1, Ordering::Relaxed);

            let result = match AssertUnwindSafe(loader()).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(SleeperError::RateLimitInternal(format!(
                    "loader for {key} panicked"
                ))),
            };

            let result = match result {
                Ok((value, Some(ttl))) => {
                    entries
                        .insert(
                            key.clone(),
                            Entry {
                                value: value.clone(),
                                ttl,
                            },
                        )
                        .await;
                    info!(%key, ttl_secs = ttl.as_secs(), "cached upstream response");
                    Ok(value)
                }
                Ok((value, None)) => {
                    debug!(%key, "response not cacheable, shared with waiters only");
                    Ok(value)
                }
                Err(e) => {
                    counters.load_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(%key, error = %e, "load failed, not cached");
                    Err(e)
                }
            };

            in_flight.lock().await.remove(&key);
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(SleeperError::RateLimitInternal(format!(
                    "load task did not complete: {e}"
                )))
            })
        }
        .boxed()
        .shared()
    }

    /// Drop the entry for `key`, if any.
    pub async fn invalidate(&self, key: &CacheKey) {
        self.entries.invalidate(key).await;
    }

    /// Invalidate all cached entries.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }

    /// Purge expired entries now instead of on next access.
    pub async fn sweep(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// Whether `key` currently has a live entry. Does not count as a hit.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            loads: self.counters.loads.load(Ordering::Relaxed),
            load_failures: self.counters.load_failures.load(Ordering::Relaxed),
            entry_count: self.entries.entry_count(),
        }
    }
}
