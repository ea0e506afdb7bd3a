//! Query-side caches: per-segment result sets and rewritten plans.
//!
//! - `result`: weight-bounded LRU of materialized doc-id sets, keyed by
//!   segment identity plus query fingerprint
//! - `plan`: entry-bounded LRU of parsed-and-rewritten query plans, keyed by
//!   query source text

pub mod plan;
pub mod result;

// Re-exports
pub use plan::{PlanCacheStats, QueryPlanCache};
pub use result::{DocIdSet, SegmentCacheStats, SegmentIdentity, SegmentResultCache};
