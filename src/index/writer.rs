//! Write path of the remote-backed inverted index.
//!
//! At segment flush, the host engine feeds one field's postings through a
//! [`PostingsWriter`], which accumulates `term -> document ordinals` in
//! memory. On finish the whole accumulation is written to the remote store
//! in one logical segment consume, a sidecar file records `(prefix, field)`
//! for the read path, and the accumulator is discarded.

use std::io::Write;

use ahash::AHashMap;

use crate::error::Result;
use crate::segment::prefix::SegmentPrefix;
use crate::segment::sidecar::{self, SEGMENT_ID_LEN, SidecarMeta};
use crate::service::RemoteIndexService;
use std::sync::Arc;

/// In-memory postings accumulator for one field of one segment.
pub struct PostingsWriter {
    prefix: Arc<SegmentPrefix>,
    segment: String,
    field: String,
    postings: AHashMap<String, Vec<u32>>,
}

impl PostingsWriter {
    pub fn new(
        prefix: Arc<SegmentPrefix>,
        segment: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        PostingsWriter {
            prefix,
            segment: segment.into(),
            field: field.into(),
            postings: AHashMap::new(),
        }
    }

    /// Record that `doc` contains `term`. Duplicates are tolerated; the
    /// store's set semantics deduplicate on write.
    pub fn push(&mut self, term: &str, doc: u32) {
        self.postings.entry(term.to_string()).or_default().push(doc);
    }

    /// Number of distinct terms accumulated so far.
    pub fn term_count(&self) -> usize {
        self.postings.len()
    }

    /// Flush the accumulation to the remote store and persist the sidecar
    /// metadata, consuming the writer.
    pub fn finish<W: Write>(
        self,
        service: &RemoteIndexService,
        segment_id: &[u8; SEGMENT_ID_LEN],
        sidecar_out: &mut W,
    ) -> Result<()> {
        service.consume_segment(&self.prefix, &self.segment, &self.field, &self.postings)?;
        sidecar::write_sidecar(
            sidecar_out,
            segment_id,
            &SidecarMeta {
                prefix: self.prefix.as_ref().clone(),
                field: self.field,
            },
        )
    }
}
