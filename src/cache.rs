//! # Request-Coalescing Cache
//!
//! Maps a key to a shared, single-resolution future. The first caller for a
//! key starts the load; everyone arriving later, while the load is in flight
//! or after it finished, awaits the same future and gets a clone of the same
//! value. Nothing distinguishes a cached error from a cached success.
//!
//! ## Eviction
//!
//! - Least recently accessed entries go first once `capacity` is reached.
//! - Entries not accessed for `idle` are dropped, pending or not.
//!
//! An evicted pending entry keeps serving the callers already awaiting it; a
//! later call for the same key starts a fresh load.
//!
//! The map sits behind an async mutex that is held only for lookups and
//! inserts, never while a load runs, so slow keys do not block other keys.

use std::future::Future;
use std::num::NonZeroUsize;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

struct Entry<V: Clone> {
    future: Shared<BoxFuture<'static, V>>,
    last_access: Instant,
}

/// Cache of in-flight and finished loads keyed by string
pub struct DedupCache<V: Clone> {
    entries: Mutex<LruCache<String, Entry<V>>>,
    idle: Duration,
}

impl<V> DedupCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache holding at most `capacity` keys, each dropped after
    /// `idle` without access.
    pub fn new(capacity: NonZeroUsize, idle: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            idle,
        }
    }

    /// Return the value for `key`, running `load` only if no live entry
    /// exists.
    ///
    /// `load` is called at most once per miss, with the map locked, and must
    /// only build the future; the future itself runs after the lock is
    /// released.
    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V> + Send + 'static,
    {
        let future = {
            let mut entries = self.entries.lock().await;
            let now = Instant::now();
            self.evict_idle(&mut entries, now);

            match entries.get_mut(key) {
                Some(entry) => {
                    trace!(key, "cache hit");
                    entry.last_access = now;
                    entry.future.clone()
                }
                None => {
                    debug!(key, "cache miss");
                    let future = load().boxed().shared();
                    let entry = Entry {
                        future: future.clone(),
                        last_access: now,
                    };
                    if let Some((evicted, _)) = entries.push(key.to_string(), entry) {
                        if evicted != key {
                            trace!(key = %evicted, "evicted least recently used entry");
                        }
                    }
                    future
                }
            }
        };

        future.await
    }

    /// Drop every entry idle for longer than the limit.
    ///
    /// Access order and idle order are the same, so expired entries are
    /// always at the least recently used end.
    fn evict_idle(&self, entries: &mut LruCache<String, Entry<V>>, now: Instant) {
        while let Some((key, entry)) = entries.peek_lru() {
            if now.duration_since(entry.last_access) < self.idle {
                break;
            }
            trace!(key = %key, "evicted idle entry");
            entries.pop_lru();
        }
    }

    /// Forget `key`, so the next call loads it again.
    ///
    /// Returns whether an entry was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.lock().await.pop(key).is_some()
    }

    /// Forget every key
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.lock().await;
        self.evict_idle(&mut entries, Instant::now());
        entries.len()
    }

    /// Whether the cache holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<V: Clone> std::fmt::Debug for DedupCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupCache")
            .field("idle", &self.idle)
            .finish_non_exhaustive()
    }
}
