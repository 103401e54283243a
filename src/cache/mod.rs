//! Read-side cache for list pages and dashboard aggregates.
//!
//! Entries are keyed by the full query tuple (see [`CacheKey`]) and expire
//! after a fixed TTL. Writes never invalidate entries, so a cached read may
//! lag a write by up to the TTL. Every backend failure degrades to a
//! cache miss.

pub mod key;

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub use key::CacheKey;

/// Memory backend purges expired entries once it grows past this size.
const MEMORY_PURGE_THRESHOLD: usize = 1024;

#[derive(Debug)]
struct MemoryEntry {
    payload: String,
    expires_at: Instant,
}

#[derive(Clone)]
enum Backend {
    Memory(Arc<RwLock<HashMap<String, MemoryEntry>>>),
    Redis(ConnectionManager),
    Disabled,
}

/// TTL-bounded cache in front of expensive reads.
#[derive(Clone)]
pub struct ReadCache {
    backend: Backend,
    list_ttl: Duration,
    stats_ttl: Duration,
}

impl std::fmt::Debug for ReadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.backend {
            Backend::Memory(_) => "memory",
            Backend::Redis(_) => "redis",
            Backend::Disabled => "disabled",
        };
        f.debug_struct("ReadCache")
            .field("backend", &backend)
            .field("list_ttl", &self.list_ttl)
            .field("stats_ttl", &self.stats_ttl)
            .finish()
    }
}

impl ReadCache {
    /// In-process cache.
    #[must_use]
    pub fn memory(list_ttl: Duration, stats_ttl: Duration) -> Self {
        Self {
            backend: Backend::Memory(Arc::new(RwLock::new(HashMap::new()))),
            list_ttl,
            stats_ttl,
        }
    }

    /// Redis-backed cache shared by every gateway process.
    #[must_use]
    pub fn redis(connection: ConnectionManager, list_ttl: Duration, stats_ttl: Duration) -> Self {
        Self {
            backend: Backend::Redis(connection),
            list_ttl,
            stats_ttl,
        }
    }

    /// Cache that never stores anything.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            backend: Backend::Disabled,
            list_ttl: Duration::ZERO,
            stats_ttl: Duration::ZERO,
        }
    }

    /// TTL for paginated lists.
    #[must_use]
    pub const fn list_ttl(&self) -> Duration {
        self.list_ttl
    }

    /// TTL for dashboard aggregates.
    #[must_use]
    pub const fn stats_ttl(&self) -> Duration {
        self.stats_ttl
    }

    /// Returns the cached value, or `None` on miss, expiry, or any backend
    /// or decoding failure.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = match &self.backend {
            Backend::Memory(map) => {
                let now = Instant::now();
                let guard = map.read().await;
                guard
                    .get(key)
                    .filter(|entry| entry.expires_at > now)
                    .map(|entry| entry.payload.clone())
            }
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                match conn.get::<_, Option<String>>(key).await {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(error = %e, key, "cache read failed; treating as miss");
                        None
                    }
                }
            }
            Backend::Disabled => None,
        };
        let Some(payload) = payload else {
            tracing::debug!(key, "cache miss");
            return None;
        };
        match serde_json::from_str(&payload) {
            Ok(value) => {
                tracing::debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(error = %e, key, "cached payload undecodable; treating as miss");
                None
            }
        }
    }

    /// Stores `value` for `ttl`. Returns `false` (after logging) if the
    /// value could not be stored.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        if ttl.is_zero() {
            return false;
        }
        let payload = match serde_json::to_string(value) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, key, "cache serialization failed");
                return false;
            }
        };
        match &self.backend {
            Backend::Memory(map) => {
                let now = Instant::now();
                let mut guard = map.write().await;
                if guard.len() >= MEMORY_PURGE_THRESHOLD {
                    guard.retain(|_, entry| entry.expires_at > now);
                }
                guard.insert(
                    key.to_string(),
                    MemoryEntry {
                        payload,
                        expires_at: now + ttl,
                    },
                );
                true
            }
            Backend::Redis(conn) => {
                let mut conn = conn.clone();
                let secs = ttl.as_secs().max(1);
                match conn.set_ex::<_, _, ()>(key, payload, secs).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, key, "cache write failed");
                        false
                    }
                }
            }
            Backend::Disabled => false,
        }
    }

    /// Serves `key` from the cache, or runs `compute` and caches its
    /// successful result for `ttl`.
    ///
    /// # Errors
    ///
    /// Propagates only errors returned by `compute`; cache failures are
    /// treated as misses.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.read_through(key, ttl, false, compute).await
    }

    /// Like [`ReadCache::get_or_compute`], but with `bypass` set the cached
    /// entry is ignored and overwritten with the recomputed value.
    ///
    /// # Errors
    ///
    /// Propagates only errors returned by `compute`.
    pub async fn read_through<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        bypass: bool,
        compute: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !bypass && let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = compute().await?;
        self.set(key, &value, ttl).await;
        Ok(value)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn cache() -> ReadCache {
        ReadCache::memory(Duration::from_secs(60), Duration::from_secs(300))
    }

    async fn compute_counted(cache: &ReadCache, calls: &AtomicU32) -> u32 {
        let result = cache
            .get_or_compute("evslot:test:k", cache.list_ttl(), || async {
                Ok::<_, std::convert::Infallible>(calls.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .await;
        let Ok(value) = result else {
            panic!("compute failed");
        };
        value
    }

    #[tokio::test(start_paused = true)]
    async fn served_unchanged_until_ttl_then_recomputed() {
        let cache = cache();
        let calls = AtomicU32::new(0);

        assert_eq!(compute_counted(&cache, &calls).await, 1);
        tokio::time::advance(Duration::from_secs(59)).await;
        assert_eq!(compute_counted(&cache, &calls).await, 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(compute_counted(&cache, &calls).await, 2);
        assert_eq!(compute_counted(&cache, &calls).await, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn bypass_recomputes_and_refreshes_the_entry() {
        let cache = cache();
        let calls = AtomicU32::new(0);
        assert_eq!(compute_counted(&cache, &calls).await, 1);

        let fresh = cache
            .read_through("evslot:test:k", cache.list_ttl(), true, || async {
                Ok::<_, std::convert::Infallible>(calls.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .await;
        assert_eq!(fresh, Ok(2));
        // Later cached reads see the refreshed value.
        assert_eq!(compute_counted(&cache, &calls).await, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn compute_errors_are_not_cached() {
        let cache = cache();
        let first: Result<u32, &str> = cache
            .get_or_compute("evslot:test:err", Duration::from_secs(60), || async { Err("boom") })
            .await;
        assert!(first.is_err());
        let second: Result<u32, &str> = cache
            .get_or_compute("evslot:test:err", Duration::from_secs(60), || async { Ok(7) })
            .await;
        assert_eq!(second, Ok(7));
    }

    #[tokio::test]
    async fn disabled_cache_always_recomputes() {
        let cache = ReadCache::disabled();
        assert!(!cache.set("k", &1u32, Duration::from_secs(60)).await);
        assert_eq!(cache.get::<u32>("k").await, None);
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_miss() {
        let cache = cache();
        assert!(cache.set("k", &"text", Duration::from_secs(60)).await);
        assert_eq!(cache.get::<u32>("k").await, None);
        assert_eq!(cache.get::<String>("k").await.as_deref(), Some("text"));
    }
}
