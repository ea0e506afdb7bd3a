//! The per-index service tying client registry, prefix registry, and field
//! routing together.
//!
//! [`RemoteIndexService`] is an explicit context object owned by the index
//! lifecycle — there is no process-wide singleton. Every operation resolves
//! field → cluster → client, brackets the call with `incref`/`decref` on the
//! shared lookup, and performs blocking remote round trips.

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use log::debug;

use crate::config::RemoraConfig;
use crate::error::{RemoraError, Result};
use crate::index::keys;
use crate::remote::registry::{ClientLookup, RemoteClientRegistry};
use crate::remote::store::{LexBound, RemoteStore};
use crate::segment::prefix::{SegmentPrefix, SegmentPrefixRegistry};

/// Per-index entry point for all remote-backed index and doc-values
/// operations.
pub struct RemoteIndexService {
    config: Arc<RemoraConfig>,
    registry: Arc<RemoteClientRegistry>,
    prefixes: SegmentPrefixRegistry,
}

impl RemoteIndexService {
    pub fn new(config: Arc<RemoraConfig>, registry: Arc<RemoteClientRegistry>) -> Self {
        let prefixes = SegmentPrefixRegistry::new(
            config
                .routing
                .iter()
                .map(|(field, cluster)| (field.clone(), cluster.clone())),
        );
        RemoteIndexService {
            config,
            registry,
            prefixes,
        }
    }

    /// The configured postings batch size.
    pub fn postings_batch_size(&self) -> usize {
        self.config.postings_batch_size
    }

    fn lookup_for_field(&self, field: &str) -> Result<Arc<ClientLookup>> {
        let cluster = self.prefixes.cluster_for_field(field)?;
        self.registry.get_or_create(&cluster)
    }

    /// Resolve the client for `field` and run `op` with the ref count held.
    fn with_client<T>(
        &self,
        field: &str,
        op: impl FnOnce(&dyn RemoteStore) -> Result<T>,
    ) -> Result<T> {
        let lookup = self.lookup_for_field(field)?;
        lookup.incref();
        let result = lookup.get_or_create().and_then(|store| op(store.as_ref()));
        lookup.decref();
        result
    }

    // ── prefix registry ─────────────────────────────────────────────

    pub fn get_or_create_prefix(&self, shard_id: &str, segment_id: &[u8]) -> Arc<SegmentPrefix> {
        self.prefixes.get_or_create_prefix(shard_id, segment_id)
    }

    pub fn register_segment(&self, prefix: &Arc<SegmentPrefix>, segment_id: &[u8]) -> Result<()> {
        self.prefixes.register_segment(prefix, segment_id)
    }

    // ── inverted index, write path ──────────────────────────────────

    /// Write one field's accumulated postings for one segment: per-term
    /// postings sets, the terms set, and the distinct-document summary.
    pub fn consume_segment(
        &self,
        prefix: &SegmentPrefix,
        segment: &str,
        field: &str,
        postings: &AHashMap<String, Vec<u32>>,
    ) -> Result<()> {
        self.with_client(field, |store| {
            let mut terms = Vec::with_capacity(postings.len());
            let mut distinct_docs = AHashSet::new();
            for (term, docs) in postings {
                if docs.is_empty() {
                    continue;
                }
                store.z_add_docs(&keys::postings_key(prefix, segment, field, term), docs)?;
                distinct_docs.extend(docs.iter().copied());
                terms.push(term.clone());
            }
            store.z_add_members(&keys::terms_key(prefix, segment, field), &terms)?;
            store.set(
                &keys::segment_summary_key(prefix, segment, field),
                &distinct_docs.len().to_string(),
            )?;
            debug!(
                "consumed segment {segment} field {field}: {} terms, {} docs",
                terms.len(),
                distinct_docs.len()
            );
            Ok(())
        })
    }

    /// Distinct-document count for a field in a segment, `None` when the
    /// segment was never written.
    pub fn get_doc_count(
        &self,
        prefix: &SegmentPrefix,
        segment: &str,
        field: &str,
    ) -> Result<Option<u64>> {
        self.with_client(field, |store| {
            let value = store.get(&keys::segment_summary_key(prefix, segment, field))?;
            match value {
                None => Ok(None),
                Some(text) => text.parse::<u64>().map(Some).map_err(|_| {
                    RemoraError::corrupted(format!("malformed segment summary: {text:?}"))
                }),
            }
        })
    }

    /// Document frequency of one term.
    pub fn get_doc_count_for_term(
        &self,
        prefix: &SegmentPrefix,
        segment: &str,
        field: &str,
        term: &str,
    ) -> Result<u64> {
        self.with_client(field, |store| {
            store.z_card(&keys::postings_key(prefix, segment, field, term))
        })
    }

    /// Number of distinct terms for a field in a segment.
    pub fn terms_size(&self, prefix: &SegmentPrefix, segment: &str, field: &str) -> Result<u64> {
        self.with_client(field, |store| {
            store.z_card(&keys::terms_key(prefix, segment, field))
        })
    }

    // ── inverted index, read path ───────────────────────────────────

    /// Smallest stored term >= `term` (smallest overall for `None`), or
    /// `None` at end of enumeration.
    pub fn seek_ceil(
        &self,
        prefix: &SegmentPrefix,
        segment: &str,
        field: &str,
        term: Option<&str>,
    ) -> Result<Option<String>> {
        let bound = match term {
            Some(term) => LexBound::Inclusive(term.to_string()),
            None => LexBound::Unbounded,
        };
        self.fetch_term_from(prefix, segment, field, bound)
    }

    /// Smallest stored term strictly greater than `term`, or `None` at end.
    pub fn next_term(
        &self,
        prefix: &SegmentPrefix,
        segment: &str,
        field: &str,
        term: &str,
    ) -> Result<Option<String>> {
        self.fetch_term_from(prefix, segment, field, LexBound::Exclusive(term.to_string()))
    }

    fn fetch_term_from(
        &self,
        prefix: &SegmentPrefix,
        segment: &str,
        field: &str,
        bound: LexBound,
    ) -> Result<Option<String>> {
        self.with_client(field, |store| {
            let mut terms =
                store.z_range_by_lex(&keys::terms_key(prefix, segment, field), bound, 0, 1)?;
            Ok(if terms.is_empty() {
                None
            } else {
                Some(terms.swap_remove(0))
            })
        })
    }

    /// One batch of a term's postings: ascending document ordinals strictly
    /// greater than `after` (from the start for `None`), at most
    /// `batch_size` of them.
    pub fn get_doc_after(
        &self,
        prefix: &SegmentPrefix,
        segment: &str,
        field: &str,
        term: &str,
        after: Option<u32>,
        batch_size: usize,
    ) -> Result<Vec<u32>> {
        self.with_client(field, |store| {
            let members = store.z_range_by_score(
                &keys::postings_key(prefix, segment, field, term),
                after,
                batch_size,
            )?;
            let mut docs = Vec::with_capacity(members.len());
            for member in members {
                docs.push(member.parse::<u32>().map_err(|_| {
                    RemoraError::corrupted(format!("malformed posting member: {member:?}"))
                })?);
            }
            docs.sort_unstable();
            Ok(docs)
        })
    }

    // ── doc values ──────────────────────────────────────────────────

    /// Write string doc values: each document's values join that document's
    /// value set. Documents absent from the map are never written.
    pub fn consume_doc_values(
        &self,
        prefix: &SegmentPrefix,
        segment: &str,
        field: &str,
        doc_values: &AHashMap<u32, Vec<String>>,
    ) -> Result<()> {
        if doc_values.is_empty() {
            return Ok(());
        }
        self.with_client(field, |store| {
            for (doc_id, values) in doc_values {
                store.s_add(&keys::doc_values_key(prefix, segment, field, *doc_id), values)?;
            }
            Ok(())
        })
    }

    /// Write numeric doc values, stringified into the same value sets.
    pub fn consume_numeric_doc_values(
        &self,
        prefix: &SegmentPrefix,
        segment: &str,
        field: &str,
        doc_values: &AHashMap<u32, Vec<i64>>,
    ) -> Result<()> {
        if doc_values.is_empty() {
            return Ok(());
        }
        self.with_client(field, |store| {
            for (doc_id, values) in doc_values {
                let members: Vec<String> = values.iter().map(|value| value.to_string()).collect();
                store.s_add(
                    &keys::doc_values_key(prefix, segment, field, *doc_id),
                    &members,
                )?;
            }
            Ok(())
        })
    }

    /// Fetch one document's value set. Empty means the document was never
    /// written — absence of a value, not a meaningful zero.
    pub fn fetch_doc_values(
        &self,
        prefix: &SegmentPrefix,
        segment: &str,
        field: &str,
        doc_id: u32,
    ) -> Result<Vec<String>> {
        self.with_client(field, |store| {
            store.s_members(&keys::doc_values_key(prefix, segment, field, doc_id))
        })
    }

    // ── lifecycle ───────────────────────────────────────────────────

    /// Release this index's bindings: swap the field routing map out and
    /// offer every bound cluster's client for eviction.
    pub fn close(&self) {
        let clusters = self.prefixes.bound_clusters();
        self.prefixes.reset_field_bindings();
        for cluster in clusters {
            self.registry.try_remove_unused(&cluster);
        }
    }
}
