//! Content-hash keyed get-or-compute cache with TTL expiry and an LRU bound.
//!
//! Concurrent misses on the same key are coalesced: callers hash onto a fixed
//! set of async lock stripes, and the second caller re-checks the cache after
//! acquiring the stripe instead of recomputing. A failed computation stores
//! nothing.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lru::LruCache;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

const LOCK_STRIPES: usize = 64;

/// Namespaced SHA-256 hex key for `input`.
#[must_use]
pub fn cache_key(namespace: &str, input: &str) -> String {
    format!("{namespace}:{:x}", Sha256::digest(input.as_bytes()))
}

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

pub struct TtlCache<V> {
    entries: Mutex<LruCache<String, Entry<V>>>,
    stripes: Vec<tokio::sync::Mutex<()>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            stripes: (0..LOCK_STRIPES)
                .map(|_| tokio::sync::Mutex::new(()))
                .collect(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, LruCache<String, Entry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stripe(&self, key: &str) -> &tokio::sync::Mutex<()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        // Modulo keeps the index below LOCK_STRIPES, so the cast cannot truncate.
        #[allow(clippy::cast_possible_truncation)]
        let idx = (hasher.finish() % LOCK_STRIPES as u64) as usize;
        &self.stripes[idx]
    }

    /// Live value for `key`, evicting it if expired.
    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries();
        let expired = match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    pub fn insert(&self, key: String, value: V, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries().put(key, Entry { value, expires_at });
    }

    /// Drop `key`. Returns whether an entry was present.
    pub fn invalidate(&self, key: &str) -> bool {
        self.entries().pop(key).is_some()
    }

    /// Return the cached value for `key`, or run `compute`, store its result
    /// for `ttl`, and return it.
    ///
    /// # Errors
    ///
    /// Propagates the error from `compute`; nothing is cached in that case.
    pub async fn get_or_set<F, Fut, E>(&self, key: &str, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "cache hit");
            return Ok(value);
        }

        let _guard = self.stripe(key).lock().await;

        if let Some(value) = self.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key, "cache hit after waiting on in-flight computation");
            return Ok(value);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(key, "cache miss");
        let value = compute().await?;
        self.insert(key.to_string(), value.clone(), ttl);
        Ok(value)
    }

    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Number of stored entries, including any not yet evicted after expiry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
