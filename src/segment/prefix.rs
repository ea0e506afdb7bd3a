//! Per-segment namespace prefixes and their registry.
//!
//! A [`SegmentPrefix`] scopes every remote-store key belonging to one
//! physical segment of one shard. It is assigned exactly once when the
//! segment is first written, persisted in the segment's sidecar file, and
//! re-derived by parsing on segment open. Writers and readers never talk to
//! each other; the prefix is the only thing they share.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::error::{RemoraError, Result};

/// A globally-unique namespace token for one `(shard, segment)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentPrefix {
    shard_id: String,
    unique_id: String,
}

impl SegmentPrefix {
    /// Mint a fresh prefix for `shard_id` with a random unique half.
    pub fn generate(shard_id: impl Into<String>) -> Self {
        SegmentPrefix {
            shard_id: shard_id.into(),
            unique_id: Uuid::new_v4().simple().to_string(),
        }
    }

    pub fn shard_id(&self) -> &str {
        &self.shard_id
    }

    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }
}

impl fmt::Display for SegmentPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.shard_id, self.unique_id)
    }
}

impl FromStr for SegmentPrefix {
    type Err = RemoraError;

    fn from_str(s: &str) -> Result<Self> {
        let Some((shard_id, unique_id)) = s.split_once('/') else {
            return Err(RemoraError::corrupted(format!(
                "invalid segment prefix syntax: {s:?}"
            )));
        };
        if shard_id.is_empty() || unique_id.is_empty() {
            return Err(RemoraError::corrupted(format!(
                "invalid segment prefix syntax: {s:?}"
            )));
        }
        Ok(SegmentPrefix {
            shard_id: shard_id.to_string(),
            unique_id: unique_id.to_string(),
        })
    }
}

/// Assigns and memoizes prefixes per `(shard, segment)` pair, and resolves
/// which remote cluster a field's data lives on.
pub struct SegmentPrefixRegistry {
    /// `(shard, segment id)` -> prefix. Insert-if-absent; first writer wins.
    segments: RwLock<AHashMap<String, Arc<SegmentPrefix>>>,
    /// Static field -> cluster routing from configuration.
    routing: AHashMap<String, String>,
    /// Memoized resolutions. The whole map is swapped on close so readers
    /// holding the old `Arc` are never disrupted.
    field_to_cluster: RwLock<Arc<AHashMap<String, String>>>,
}

impl SegmentPrefixRegistry {
    pub fn new(routing: impl IntoIterator<Item = (String, String)>) -> Self {
        SegmentPrefixRegistry {
            segments: RwLock::new(AHashMap::new()),
            routing: routing.into_iter().collect(),
            field_to_cluster: RwLock::new(Arc::new(AHashMap::new())),
        }
    }

    fn segment_key(shard_id: &str, segment_id: &[u8]) -> String {
        let mut key = String::with_capacity(shard_id.len() + 1 + segment_id.len() * 2);
        key.push_str(shard_id);
        key.push('_');
        for byte in segment_id {
            key.push_str(&format!("{byte:02x}"));
        }
        key
    }

    /// Idempotent prefix assignment. Concurrent first-time callers race on
    /// the insert; exactly one wins and everyone observes the winner.
    pub fn get_or_create_prefix(&self, shard_id: &str, segment_id: &[u8]) -> Arc<SegmentPrefix> {
        let key = Self::segment_key(shard_id, segment_id);
        if let Some(prefix) = self.segments.read().get(&key) {
            return prefix.clone();
        }
        let fresh = Arc::new(SegmentPrefix::generate(shard_id));
        self.segments
            .write()
            .entry(key)
            .or_insert(fresh)
            .clone()
    }

    /// Read-path registration of a prefix recovered from segment metadata.
    /// A pre-existing conflicting registration means the namespace mapping
    /// is no longer trustworthy and is reported as an invariant violation.
    pub fn register_segment(&self, prefix: &Arc<SegmentPrefix>, segment_id: &[u8]) -> Result<()> {
        let key = Self::segment_key(prefix.shard_id(), segment_id);
        let existing = self
            .segments
            .write()
            .entry(key)
            .or_insert_with(|| prefix.clone())
            .clone();
        if existing.as_ref() != prefix.as_ref() {
            return Err(RemoraError::invariant(format!(
                "segment already registered with prefix {existing}, got {prefix}"
            )));
        }
        Ok(())
    }

    /// Resolve and memoize the cluster a field's data lives on. Fails with
    /// a configuration error for unrouted fields; never degrades silently.
    pub fn cluster_for_field(&self, field: &str) -> Result<String> {
        if let Some(cluster) = self.field_to_cluster.read().get(field) {
            return Ok(cluster.clone());
        }
        let cluster = self
            .routing
            .get(field)
            .ok_or_else(|| {
                RemoraError::config(format!("no remote cluster configured for field: {field}"))
            })?
            .clone();

        let mut cache = self.field_to_cluster.write();
        if !cache.contains_key(field) {
            let mut next = AHashMap::clone(cache.as_ref());
            next.insert(field.to_string(), cluster.clone());
            *cache = Arc::new(next);
        }
        Ok(cluster)
    }

    /// Clusters currently bound to some field.
    pub fn bound_clusters(&self) -> Vec<String> {
        self.field_to_cluster.read().values().cloned().collect()
    }

    /// Swap the memoized routing map out wholesale. In-flight readers keep
    /// the old map; no entries are mutated in place.
    pub fn reset_field_bindings(&self) {
        *self.field_to_cluster.write() = Arc::new(AHashMap::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn registry() -> SegmentPrefixRegistry {
        SegmentPrefixRegistry::new([("tag_ids".to_string(), "tags".to_string())])
    }

    #[test]
    fn test_prefix_display_parse_round_trip() {
        let prefix = SegmentPrefix::generate("posts-3");
        let parsed: SegmentPrefix = prefix.to_string().parse().unwrap();
        assert_eq!(parsed, prefix);
    }

    #[test]
    fn test_parse_rejects_malformed_prefix() {
        assert!("no-separator".parse::<SegmentPrefix>().is_err());
        assert!("/missing-shard".parse::<SegmentPrefix>().is_err());
        assert!("shard/".parse::<SegmentPrefix>().is_err());
    }

    #[test]
    fn test_get_or_create_prefix_is_idempotent() {
        let registry = registry();
        let first = registry.get_or_create_prefix("posts-0", b"seg-id-0");
        let second = registry.get_or_create_prefix("posts-0", b"seg-id-0");
        assert_eq!(first, second);

        let other = registry.get_or_create_prefix("posts-0", b"seg-id-1");
        assert_ne!(first, other);
    }

    #[test]
    fn test_concurrent_assignment_has_one_winner() {
        let registry = Arc::new(registry());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                registry.get_or_create_prefix("posts-0", b"seg-id-9")
            }));
        }
        let observed: HashSet<String> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap().to_string())
            .collect();
        assert_eq!(observed.len(), 1);
    }

    #[test]
    fn test_register_segment_detects_conflict() {
        let registry = registry();
        let prefix = registry.get_or_create_prefix("posts-0", b"seg-id-0");
        registry.register_segment(&prefix, b"seg-id-0").unwrap();

        let conflicting = Arc::new(SegmentPrefix::generate("posts-0"));
        let err = registry
            .register_segment(&conflicting, b"seg-id-0")
            .unwrap_err();
        assert!(matches!(err, RemoraError::Invariant(_)));
    }

    #[test]
    fn test_field_routing_and_reset() {
        let registry = registry();
        assert_eq!(registry.cluster_for_field("tag_ids").unwrap(), "tags");
        assert_eq!(registry.bound_clusters(), vec!["tags".to_string()]);

        let err = registry.cluster_for_field("unrouted").unwrap_err();
        assert!(matches!(err, RemoraError::Config(_)));

        registry.reset_field_bindings();
        assert!(registry.bound_clusters().is_empty());
        // Still resolvable after reset; memoization repopulates.
        assert_eq!(registry.cluster_for_field("tag_ids").unwrap(), "tags");
    }
}
