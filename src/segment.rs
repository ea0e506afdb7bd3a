//! Segment identity: durable prefixes and the on-disk sidecar format.
//!
//! - `prefix`: `shard/unique` key prefixes and the per-index registry that
//!   hands them out and pins field → cluster bindings
//! - `sidecar`: the checksummed metadata file written next to each segment

pub mod prefix;
pub mod sidecar;

// Re-exports
pub use prefix::{SegmentPrefix, SegmentPrefixRegistry};
pub use sidecar::{SEGMENT_ID_LEN, SidecarMeta, read_sidecar, write_sidecar};
