//! Segment-scoped, weight-bounded LRU cache of query results.
//!
//! Keys pair an ephemeral [`SegmentIdentity`] (the in-memory identity of one
//! open segment instance, not its durable prefix) with a caller-supplied
//! query fingerprint that must uniquely identify the logical query — there
//! is no structural hashing fallback. Values are materialized
//! [`DocIdSet`]s. The cache is bounded by total estimated byte weight,
//! evicting lowest-recency entries first, with optional access-based
//! expiry. A reverse index from segment identity to live fingerprints makes
//! closing a segment O(keys-for-that-segment).

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use ahash::{AHashMap, AHashSet};
use log::debug;
use lru::LruCache;
use parking_lot::Mutex;

use crate::config::ResultCacheConfig;

/// Fixed per-entry overhead: key + value references, doubled because hash
/// tables run oversized to avoid collisions.
pub const ENTRY_OVERHEAD_BYTES: u64 = 2 * 8 * 2;

/// Identity token for one open segment instance. Invalidated (by issuing a
/// fresh token) whenever the segment is closed or replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentIdentity(u64);

impl SegmentIdentity {
    /// Issue a fresh, process-unique identity.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        SegmentIdentity(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An immutable, sorted, deduplicated set of document ordinals — the
/// materialized result of evaluating a query against one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocIdSet {
    docs: Arc<[u32]>,
}

impl DocIdSet {
    pub fn new(mut docs: Vec<u32>) -> Self {
        docs.sort_unstable();
        docs.dedup();
        DocIdSet { docs: docs.into() }
    }

    pub fn empty() -> Self {
        DocIdSet { docs: Arc::new([]) }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn contains(&self, doc: u32) -> bool {
        self.docs.binary_search(&doc).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.docs.iter().copied()
    }

    /// Estimated heap footprint of the set.
    pub fn ram_bytes_used(&self) -> u64 {
        (size_of::<Self>() + self.docs.len() * size_of::<u32>()) as u64
    }
}

/// Point-in-time counters for one segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentCacheStats {
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
    pub entry_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    segment: SegmentIdentity,
    fingerprint: String,
}

struct Entry {
    set: DocIdSet,
    weight: u64,
    last_access: Instant,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    entries: u64,
}

struct Inner {
    lru: LruCache<CacheKey, Entry>,
    weight: u64,
    segment_keys: AHashMap<SegmentIdentity, AHashSet<String>>,
    counters: AHashMap<SegmentIdentity, Counters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemovalCause {
    Size,
    Expired,
    Explicit,
}

/// Weight-bounded LRU cache of `(segment, fingerprint) -> DocIdSet`.
pub struct SegmentResultCache {
    max_bytes: u64,
    expire_after_access: Option<Duration>,
    inner: Mutex<Inner>,
}

impl SegmentResultCache {
    pub fn new(config: &ResultCacheConfig) -> Self {
        let expire_after_access = (config.expire_after_access_secs > 0)
            .then(|| Duration::from_secs(config.expire_after_access_secs));
        SegmentResultCache {
            max_bytes: config.max_bytes,
            expire_after_access,
            inner: Mutex::new(Inner {
                lru: LruCache::unbounded(),
                weight: 0,
                segment_keys: AHashMap::new(),
                counters: AHashMap::new(),
            }),
        }
    }

    /// Look up the cached doc-id set for a query against a segment,
    /// recording a hit or miss.
    pub fn get(&self, segment: SegmentIdentity, fingerprint: &str) -> Option<DocIdSet> {
        let key = CacheKey {
            segment,
            fingerprint: fingerprint.to_string(),
        };
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let expired = match inner.lru.get_mut(&key) {
            None => {
                inner.counters.entry(segment).or_default().misses += 1;
                return None;
            }
            Some(entry) => match self.expire_after_access {
                Some(ttl) if now.duration_since(entry.last_access) > ttl => true,
                _ => {
                    entry.last_access = now;
                    let set = entry.set.clone();
                    inner.counters.entry(segment).or_default().hits += 1;
                    return Some(set);
                }
            },
        };
        debug_assert!(expired);
        if let Some(entry) = inner.lru.pop(&key) {
            Self::on_removal(&mut inner, &key, &entry, RemovalCause::Expired);
        }
        inner.counters.entry(segment).or_default().misses += 1;
        None
    }

    /// Insert the computed doc-id set for a query against a segment,
    /// evicting least-recently-used entries past the weight bound.
    pub fn put(&self, segment: SegmentIdentity, fingerprint: impl Into<String>, set: DocIdSet) {
        let key = CacheKey {
            segment,
            fingerprint: fingerprint.into(),
        };
        let weight = ENTRY_OVERHEAD_BYTES + set.ram_bytes_used();
        let entry = Entry {
            set,
            weight,
            last_access: Instant::now(),
        };

        let mut inner = self.inner.lock();
        let mut overwrote = false;
        if let Some(replaced) = inner.lru.push(key.clone(), entry) {
            if replaced.0 == key {
                // Overwrite of the same fingerprint: only the weight moves.
                inner.weight -= replaced.1.weight;
                overwrote = true;
            } else {
                Self::on_removal(&mut inner, &replaced.0, &replaced.1, RemovalCause::Size);
            }
        }
        inner.weight += weight;
        inner
            .segment_keys
            .entry(segment)
            .or_default()
            .insert(key.fingerprint.clone());
        if !overwrote {
            inner.counters.entry(segment).or_default().entries += 1;
        }

        while inner.weight > self.max_bytes {
            let Some((evicted_key, evicted)) = inner.lru.pop_lru() else {
                break;
            };
            Self::on_removal(&mut inner, &evicted_key, &evicted, RemovalCause::Size);
        }
    }

    /// Removal bookkeeping. Must never fail the operation that triggered
    /// the removal; all it does is adjust counters and the reverse index.
    fn on_removal(inner: &mut Inner, key: &CacheKey, entry: &Entry, cause: RemovalCause) {
        inner.weight -= entry.weight;
        if cause != RemovalCause::Explicit {
            if let Some(keys) = inner.segment_keys.get_mut(&key.segment) {
                keys.remove(&key.fingerprint);
                if keys.is_empty() {
                    inner.segment_keys.remove(&key.segment);
                }
            }
        }
        let counters = inner.counters.entry(key.segment).or_default();
        counters.entries = counters.entries.saturating_sub(1);
        if cause != RemovalCause::Explicit {
            counters.evictions += 1;
        }
        debug!(
            "result cache removed entry for segment {:?} ({cause:?})",
            key.segment
        );
    }

    /// Drop every entry owned by a segment. Called when the host engine
    /// closes that segment instance.
    pub fn clear_segment(&self, segment: SegmentIdentity) {
        let mut inner = self.inner.lock();
        let Some(fingerprints) = inner.segment_keys.remove(&segment) else {
            return;
        };
        for fingerprint in fingerprints {
            let key = CacheKey {
                segment,
                fingerprint,
            };
            if let Some(entry) = inner.lru.pop(&key) {
                Self::on_removal(&mut inner, &key, &entry, RemovalCause::Explicit);
            }
        }
        inner.counters.remove(&segment);
    }

    /// Drop every entry whose fingerprint matches a removed or replaced
    /// query, across all segments. Linear scan of the key set; invalidation
    /// is rare and the cache is bounded.
    pub fn clear_query(&self, fingerprint: &str) {
        let mut inner = self.inner.lock();
        let matches: Vec<CacheKey> = inner
            .lru
            .iter()
            .filter(|(key, _)| key.fingerprint == fingerprint)
            .map(|(key, _)| key.clone())
            .collect();
        for key in matches {
            if let Some(entry) = inner.lru.pop(&key) {
                inner.weight -= entry.weight;
                if let Some(keys) = inner.segment_keys.get_mut(&key.segment) {
                    keys.remove(&key.fingerprint);
                    if keys.is_empty() {
                        inner.segment_keys.remove(&key.segment);
                    }
                }
                let counters = inner.counters.entry(key.segment).or_default();
                counters.entries = counters.entries.saturating_sub(1);
            }
        }
    }

    /// Drop everything, including per-segment counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.lru.clear();
        inner.weight = 0;
        inner.segment_keys.clear();
        inner.counters.clear();
    }

    /// Counters for one segment, `None` once the segment has been cleared.
    pub fn stats(&self, segment: SegmentIdentity) -> Option<SegmentCacheStats> {
        let inner = self.inner.lock();
        inner.counters.get(&segment).map(|c| SegmentCacheStats {
            hit_count: c.hits,
            miss_count: c.misses,
            eviction_count: c.evictions,
            entry_count: c.entries,
        })
    }

    /// Current total weight of cached entries, in bytes.
    pub fn weight_bytes(&self) -> u64 {
        self.inner.lock().weight
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
