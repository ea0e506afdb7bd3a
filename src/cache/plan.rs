//! Cache of parsed-and-rewritten query plans, keyed by source text.
//!
//! Rewriting a query is pure per index state, so identical source strings
//! always produce the same plan and can skip the rewrite entirely. The cache
//! is entry-count bounded with access-based expiry and keeps hit/miss
//! counters that reset together with the entries.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::config::PlanCacheConfig;

/// Point-in-time hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanCacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub entry_count: u64,
}

struct PlanEntry<P> {
    plan: P,
    last_access: Instant,
}

struct PlanInner<P> {
    lru: LruCache<String, PlanEntry<P>>,
    hits: u64,
    misses: u64,
}

/// Entry-count bounded LRU cache of rewritten plans. `P` is the host
/// engine's plan type; it only needs to be cloneable.
pub struct QueryPlanCache<P: Clone> {
    enabled: bool,
    expire_after_access: Option<Duration>,
    inner: Mutex<PlanInner<P>>,
}

impl<P: Clone> QueryPlanCache<P> {
    pub fn new(config: &PlanCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        let expire_after_access = (config.expire_after_access_secs > 0)
            .then(|| Duration::from_secs(config.expire_after_access_secs));
        QueryPlanCache {
            enabled: config.enabled,
            expire_after_access,
            inner: Mutex::new(PlanInner {
                lru: LruCache::new(capacity),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Whether caching is enabled at all. A disabled cache never stores
    /// anything and counts nothing.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The cached plan for a source string, counting a hit or a miss.
    pub fn get(&self, source: &str) -> Option<P> {
        if !self.enabled {
            return None;
        }
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let expired = match inner.lru.get_mut(source) {
            None => {
                inner.misses += 1;
                return None;
            }
            Some(entry) => match self.expire_after_access {
                Some(ttl) if now.duration_since(entry.last_access) > ttl => true,
                _ => {
                    entry.last_access = now;
                    let plan = entry.plan.clone();
                    inner.hits += 1;
                    return Some(plan);
                }
            },
        };
        debug_assert!(expired);
        inner.lru.pop(source);
        inner.misses += 1;
        None
    }

    /// Store the rewritten plan for a source string, overwriting any stale
    /// entry and evicting the least-recent one past the capacity.
    pub fn put(&self, source: impl Into<String>, plan: P) {
        if !self.enabled {
            return;
        }
        let mut inner = self.inner.lock();
        inner.lru.put(
            source.into(),
            PlanEntry {
                plan,
                last_access: Instant::now(),
            },
        );
    }

    /// Drop all entries and reset the counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.lru.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn stats(&self) -> PlanCacheStats {
        let inner = self.inner.lock();
        PlanCacheStats {
            hit_count: inner.hits,
            miss_count: inner.misses,
            entry_count: inner.lru.len() as u64,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_entries: usize) -> PlanCacheConfig {
        PlanCacheConfig {
            enabled: true,
            max_entries,
            expire_after_access_secs: 0,
        }
    }

    #[test]
    fn test_get_put_and_counters() {
        let cache: QueryPlanCache<String> = QueryPlanCache::new(&config(10));
        assert!(cache.get("status:open").is_none());
        cache.put("status:open", "plan-a".to_string());
        assert_eq!(cache.get("status:open").as_deref(), Some("plan-a"));

        let stats = cache.stats();
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let cache: QueryPlanCache<u32> = QueryPlanCache::new(&config(2));
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.get("a"), Some(1));
        cache.put("c", 3);

        assert_eq!(cache.get("a"), Some(1));
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_overwrite_replaces_plan() {
        let cache: QueryPlanCache<u32> = QueryPlanCache::new(&config(10));
        cache.put("q", 1);
        cache.put("q", 2);
        assert_eq!(cache.get("q"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_resets_entries_and_counters() {
        let cache: QueryPlanCache<u32> = QueryPlanCache::new(&config(10));
        cache.put("q", 1);
        let _ = cache.get("q");
        let _ = cache.get("missing");
        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats, PlanCacheStats::default());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_disabled_cache_stores_and_counts_nothing() {
        let cache: QueryPlanCache<u32> = QueryPlanCache::new(&PlanCacheConfig {
            enabled: false,
            max_entries: 10,
            expire_after_access_secs: 0,
        });
        cache.put("q", 1);
        assert!(cache.get("q").is_none());
        assert_eq!(cache.stats(), PlanCacheStats::default());
    }

    #[test]
    fn test_access_expiry() {
        let cache: QueryPlanCache<u32> = QueryPlanCache::new(&PlanCacheConfig {
            enabled: true,
            max_entries: 10,
            expire_after_access_secs: 1,
        });
        cache.put("q", 1);
        {
            let mut inner = cache.inner.lock();
            inner.lru.get_mut("q").unwrap().last_access = Instant::now() - Duration::from_secs(10);
        }
        assert!(cache.get("q").is_none());
        assert!(cache.is_empty());
    }
}
