//! The remote-store command surface consumed by this crate.

use crate::error::Result;

/// Lower bound for a lexicographic sorted-set range query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexBound {
    /// No lower bound (`-`): start from the smallest member.
    Unbounded,
    /// Inclusive bound (`[term`): members greater than or equal to the term.
    Inclusive(String),
    /// Exclusive bound (`(term`): members strictly greater than the term.
    Exclusive(String),
}

/// A thin synchronous client over a remote key-value/sorted-set store.
///
/// All operations are blocking network round trips against the store's
/// existing command set. Failures are propagated, never retried. The store
/// provides "last writer wins" per key and nothing stronger.
pub trait RemoteStore: Send + Sync {
    /// Add document ordinals to a sorted set; each ordinal is both the
    /// member (stringified) and its score.
    fn z_add_docs(&self, key: &str, docs: &[u32]) -> Result<()>;

    /// Add string members to a sorted set with score 0, so the set orders
    /// lexicographically.
    fn z_add_members(&self, key: &str, members: &[String]) -> Result<()>;

    /// Add members to a plain set.
    fn s_add(&self, key: &str, members: &[String]) -> Result<()>;

    /// Cardinality of a sorted set. Zero for a missing key.
    fn z_card(&self, key: &str) -> Result<u64>;

    /// Range over a sorted set by rank, both bounds inclusive. Negative
    /// indices count from the end, as the remote store defines them.
    fn z_range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<String>>;

    /// Ascending members whose score is strictly greater than `after`
    /// (all members when `None`), at most `count` of them.
    fn z_range_by_score(&self, key: &str, after: Option<u32>, count: usize)
    -> Result<Vec<String>>;

    /// Lexicographic range with an open upper bound (`+`), skipping
    /// `offset` members and returning at most `count`.
    fn z_range_by_lex(
        &self,
        key: &str,
        min: LexBound,
        offset: usize,
        count: usize,
    ) -> Result<Vec<String>>;

    /// Members of a plain set. Empty for a missing key.
    fn s_members(&self, key: &str) -> Result<Vec<String>>;

    /// Get a scalar string value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a scalar string value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Release pooled connections. Idempotent.
    fn close(&self) -> Result<()>;
}
