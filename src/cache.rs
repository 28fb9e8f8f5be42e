//! Result caching with TTL and size-bounded LRU eviction.
//!
//! Hot search results and detail lookups are cached as canonical JSON values
//! keyed by (operation, normalized parameters). [`ResultCache::get_or_compute`]
//! is the single entry point wrapping hit/miss handling. All size accounting
//! happens under one lock, so eviction decisions are atomic relative to
//! concurrent inserts.

use crate::error::Result;
use lru::LruCache;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cache key: operation kind plus its normalized parameters.
///
/// `crate_scope` is the crate the entry depends on; `None` means the entry
/// spans the whole corpus (e.g. an unfiltered search) and is invalidated by
/// any crate write.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Operation kind, e.g. `search_rust_docs`.
    pub op: &'static str,
    /// Canonical (JSON) rendering of the normalized parameters.
    pub params: String,
    /// Crate this entry references, if it references exactly one.
    pub crate_scope: Option<String>,
}

struct CacheEntry {
    value: serde_json::Value,
    /// Serialized size in bytes, fixed at insert time.
    size: u64,
    created: Instant,
}

struct CacheInner {
    entries: LruCache<CacheKey, CacheEntry>,
    /// Total resident size of all entries, in bytes.
    resident: u64,
}

/// Size-bounded, TTL-aware result cache.
pub struct ResultCache {
    inner: Mutex<CacheInner>,
    size_limit: u64,
}

impl ResultCache {
    /// Create a cache bounded to `size_limit` bytes of serialized values.
    pub fn new(size_limit: u64) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                resident: 0,
            }),
            size_limit,
        }
    }

    /// Return the cached value for `key` if it is younger than `ttl`;
    /// otherwise run `compute`, cache its result, and evict LRU entries
    /// until the size bound holds again.
    ///
    /// A value larger than the entire cache limit is returned uncached and
    /// recomputed on every call. Errors from `compute` are never cached.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: CacheKey,
        ttl: Duration,
        compute: F,
    ) -> Result<serde_json::Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<serde_json::Value>>,
    {
        {
            let mut inner = self.inner.lock().expect("cache lock poisoned");
            // `get` bumps recency on hit.
            if let Some(entry) = inner.entries.get(&key) {
                if entry.created.elapsed() < ttl {
                    tracing::debug!("Cache hit for {}:{}", key.op, key.params);
                    return Ok(entry.value.clone());
                }
                // Stale: drop it and fall through to recompute.
                if let Some(old) = inner.entries.pop(&key) {
                    inner.resident -= old.size;
                }
            }
        }

        let value = compute().await?;
        let size = serde_json::to_string(&value)?.len() as u64;

        if size > self.size_limit {
            tracing::debug!(
                "Result for {}:{} ({} bytes) exceeds cache limit ({} bytes), bypassing cache",
                key.op,
                key.params,
                size,
                self.size_limit
            );
            return Ok(value);
        }

        let mut inner = self.inner.lock().expect("cache lock poisoned");
        // A concurrent compute may have inserted the same key meanwhile;
        // replacing it keeps the size accounting exact.
        if let Some(old) = inner.entries.pop(&key) {
            inner.resident -= old.size;
        }
        inner.entries.put(
            key,
            CacheEntry {
                value: value.clone(),
                size,
                created: Instant::now(),
            },
        );
        inner.resident += size;

        while inner.resident > self.size_limit {
            match inner.entries.pop_lru() {
                Some((evicted_key, evicted)) => {
                    inner.resident -= evicted.size;
                    tracing::debug!(
                        "Evicted cache entry {}:{} ({} bytes)",
                        evicted_key.op,
                        evicted_key.params,
                        evicted.size
                    );
                }
                None => break,
            }
        }

        Ok(value)
    }

    /// Remove all entries matching `predicate`. Returns how many were removed.
    pub fn invalidate<P>(&self, predicate: P) -> usize
    where
        P: Fn(&CacheKey) -> bool,
    {
        let mut inner = self.inner.lock().expect("cache lock poisoned");
        let doomed: Vec<CacheKey> = inner
            .entries
            .iter()
            .filter(|(key, _)| predicate(key))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &doomed {
            if let Some(entry) = inner.entries.pop(key) {
                inner.resident -= entry.size;
            }
        }
        doomed.len()
    }

    /// Total resident size in bytes.
    pub fn resident_size(&self) -> u64 {
        self.inner.lock().expect("cache lock poisoned").resident
    }

    /// Number of resident entries.
    pub fn entry_count(&self) -> usize {
        self.inner.lock().expect("cache lock poisoned").entries.len()
    }
}
