//! # Remora
//!
//! A remote-backed storage and cache layer for segment-oriented search
//! engines.
//!
//! ## Features
//!
//! - Inverted index postings and terms stored as remote sorted sets
//! - Per-document values stored as remote sets, with absence semantics
//! - Durable segment prefixes and checksummed sidecar metadata files
//! - Shared, ref-counted remote clients routed per field
//! - Weight-bounded per-segment result cache and a query plan cache

// Core modules
pub mod cache;
mod config;
mod error;
pub mod index;
pub mod remote;
pub mod segment;
mod service;

pub mod doc_values;

// Re-exports for the public API
pub use cache::{
    DocIdSet, PlanCacheStats, QueryPlanCache, SegmentCacheStats, SegmentIdentity,
    SegmentResultCache,
};
pub use config::{ClusterConfig, PlanCacheConfig, RemoraConfig, ResultCacheConfig};
pub use doc_values::{DocValuesReader, DocValuesWriter, RemoteDocValuesReader};
pub use error::{RemoraError, Result};
pub use index::{
    PostingsCursor, PostingsWriter, RemotePostingsCursor, RemoteTermCursor, SeekOutcome,
    TermCursor,
};
pub use remote::{LexBound, MemoryStore, RemoteClientRegistry, RemoteStore, RespStore};
pub use segment::{
    SEGMENT_ID_LEN, SegmentPrefix, SegmentPrefixRegistry, SidecarMeta, read_sidecar,
    write_sidecar,
};
pub use service::RemoteIndexService;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
