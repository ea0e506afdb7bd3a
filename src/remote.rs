//! Remote key-value store abstraction and its implementations.
//!
//! # Module Structure
//!
//! - `store`: The [`store::RemoteStore`] trait every backend implements
//! - `memory`: In-process backend for tests and embedded use
//! - `resp`: RESP2 wire encoding and reply parsing
//! - `client`: TCP-pooled RESP backend
//! - `registry`: Per-cluster shared, ref-counted client lookups

pub mod client;
pub mod memory;
pub mod registry;
pub mod resp;
pub mod store;

// Re-exports
pub use client::RespStore;
pub use memory::MemoryStore;
pub use registry::{ClientLookup, RemoteClientRegistry};
pub use store::{LexBound, RemoteStore};
