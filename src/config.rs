//! Configuration surface for the remote-backed index layer.
//!
//! Everything here deserializes with `serde` and carries documented
//! defaults, so a host engine can hand over a JSON/YAML fragment and only
//! override what it needs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default batch size for paginated postings enumeration.
pub const DEFAULT_POSTINGS_BATCH_SIZE: usize = 10_000;

/// Top-level configuration for one logical index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoraConfig {
    /// Name of the logical index this configuration belongs to.
    pub index: String,

    /// Remote clusters by name. A field's data lives on exactly one of
    /// these, selected through [`RemoraConfig::routing`].
    #[serde(default)]
    pub clusters: HashMap<String, ClusterConfig>,

    /// Field name to cluster name routing. A field without an entry here
    /// never resolves to a usable store.
    #[serde(default)]
    pub routing: HashMap<String, String>,

    /// Segment result cache settings.
    #[serde(default)]
    pub result_cache: ResultCacheConfig,

    /// Query plan cache settings.
    #[serde(default)]
    pub plan_cache: PlanCacheConfig,

    /// Maximum number of postings fetched per remote round trip.
    #[serde(default = "default_postings_batch_size")]
    pub postings_batch_size: usize,
}

impl RemoraConfig {
    /// Create a configuration for `index` with no clusters or routing.
    pub fn new(index: impl Into<String>) -> Self {
        RemoraConfig {
            index: index.into(),
            clusters: HashMap::new(),
            routing: HashMap::new(),
            result_cache: ResultCacheConfig::default(),
            plan_cache: PlanCacheConfig::default(),
            postings_batch_size: DEFAULT_POSTINGS_BATCH_SIZE,
        }
    }

    /// Register a remote cluster under `name`.
    pub fn add_cluster(mut self, name: impl Into<String>, config: ClusterConfig) -> Self {
        self.clusters.insert(name.into(), config);
        self
    }

    /// Route `field` to the cluster registered under `cluster`.
    pub fn route_field(mut self, field: impl Into<String>, cluster: impl Into<String>) -> Self {
        self.routing.insert(field.into(), cluster.into());
        self
    }
}

/// Connection settings for one remote cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Seed endpoint in `host:port` form.
    pub seed: String,

    /// Maximum number of idle pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// TCP connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Read/write timeout per remote call in milliseconds.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

impl ClusterConfig {
    pub fn new(seed: impl Into<String>) -> Self {
        ClusterConfig {
            seed: seed.into(),
            pool_size: default_pool_size(),
            connect_timeout_ms: default_connect_timeout_ms(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

/// Settings for the segment-scoped query result cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCacheConfig {
    /// Maximum total weight of cached doc-id sets, in bytes.
    #[serde(default = "default_result_cache_max_bytes")]
    pub max_bytes: u64,

    /// Entries not accessed for this many seconds become eligible for
    /// expiry. Zero disables access-based expiry.
    #[serde(default = "default_expire_after_access_secs")]
    pub expire_after_access_secs: u64,
}

impl Default for ResultCacheConfig {
    fn default() -> Self {
        ResultCacheConfig {
            max_bytes: default_result_cache_max_bytes(),
            expire_after_access_secs: default_expire_after_access_secs(),
        }
    }
}

/// Settings for the query plan cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanCacheConfig {
    /// Whether query plan caching is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of cached plans.
    #[serde(default = "default_plan_cache_max_entries")]
    pub max_entries: usize,

    /// Entries not accessed for this many seconds become eligible for
    /// expiry. Zero disables access-based expiry.
    #[serde(default = "default_expire_after_access_secs")]
    pub expire_after_access_secs: u64,
}

impl Default for PlanCacheConfig {
    fn default() -> Self {
        PlanCacheConfig {
            enabled: true,
            max_entries: default_plan_cache_max_entries(),
            expire_after_access_secs: default_expire_after_access_secs(),
        }
    }
}

fn default_postings_batch_size() -> usize {
    DEFAULT_POSTINGS_BATCH_SIZE
}

fn default_pool_size() -> usize {
    4
}

fn default_connect_timeout_ms() -> u64 {
    1_000
}

fn default_io_timeout_ms() -> u64 {
    5_000
}

fn default_result_cache_max_bytes() -> u64 {
    64 * 1024 * 1024
}

fn default_expire_after_access_secs() -> u64 {
    2 * 60 * 60
}

fn default_plan_cache_max_entries() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let config: RemoraConfig = serde_json::from_str(
            r#"{
                "index": "posts",
                "clusters": { "tags": { "seed": "127.0.0.1:6379" } },
                "routing": { "tag_ids": "tags" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.index, "posts");
        assert_eq!(config.postings_batch_size, DEFAULT_POSTINGS_BATCH_SIZE);
        assert_eq!(config.clusters["tags"].pool_size, 4);
        assert_eq!(config.clusters["tags"].io_timeout_ms, 5_000);
        assert_eq!(config.result_cache.max_bytes, 64 * 1024 * 1024);
        assert!(config.plan_cache.enabled);
        assert_eq!(config.plan_cache.max_entries, 10_000);
        assert_eq!(config.plan_cache.expire_after_access_secs, 7_200);
    }

    #[test]
    fn test_builder_round_trip() {
        let config = RemoraConfig::new("posts")
            .add_cluster("tags", ClusterConfig::new("10.0.0.1:6379"))
            .route_field("tag_ids", "tags");

        let json = serde_json::to_string(&config).unwrap();
        let parsed: RemoraConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.routing["tag_ids"], "tags");
        assert_eq!(parsed.clusters["tags"].seed, "10.0.0.1:6379");
    }
}
