//! Remote-backed per-document values, independent of the postings path.
//!
//! Each document ordinal with at least one value owns a value set in the
//! remote store; ordinals that were never written have no key at all, so
//! absence in the store means absence of a value, not zero. Ordinal-based
//! sorted / sorted-set formats are not modeled and fail fast.

use std::io::Write;
use std::sync::Arc;

use ahash::AHashMap;

use crate::error::{RemoraError, Result};
use crate::segment::prefix::SegmentPrefix;
use crate::segment::sidecar::{self, SEGMENT_ID_LEN, SidecarMeta};
use crate::service::RemoteIndexService;

/// Read access to one field's doc values in one segment.
pub trait DocValuesReader {
    /// Scalar numeric value, `None` when the document has no value. When a
    /// document holds several values an arbitrary member is returned.
    fn numeric(&self, doc: u32) -> Result<Option<i64>>;

    /// Scalar numeric access with the historical zero default. Callers must
    /// treat 0 as "no value", not as a stored zero; prefer [`Self::numeric`].
    fn numeric_or_zero(&self, doc: u32) -> Result<i64> {
        Ok(self.numeric(doc)?.unwrap_or(0))
    }

    /// All numeric values of a document, ascending. Empty when absent.
    fn sorted_numeric(&self, doc: u32) -> Result<Vec<i64>>;

    /// Single stored value as an opaque byte string.
    fn binary(&self, doc: u32) -> Result<Option<Vec<u8>>>;

    /// Whether the document has any value for this field. Issues the same
    /// remote read as value retrieval.
    fn has_value(&self, doc: u32) -> Result<bool>;

    /// Ordinal of a sorted doc value. Not modeled by this format.
    fn sorted_ord(&self, _doc: u32) -> Result<u64> {
        Err(unsupported_ordinals())
    }

    /// Ordinals of a sorted-set doc value. Not modeled by this format.
    fn sorted_set_ords(&self, _doc: u32) -> Result<Vec<u64>> {
        Err(unsupported_ordinals())
    }
}

fn unsupported_ordinals() -> RemoraError {
    RemoraError::unsupported("ordinal based doc values are not supported")
}

/// Accumulates one field's doc values for one segment.
pub struct DocValuesWriter {
    prefix: Arc<SegmentPrefix>,
    segment: String,
    field: String,
    text_values: AHashMap<u32, Vec<String>>,
    numeric_values: AHashMap<u32, Vec<i64>>,
}

impl DocValuesWriter {
    pub fn new(
        prefix: Arc<SegmentPrefix>,
        segment: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        DocValuesWriter {
            prefix,
            segment: segment.into(),
            field: field.into(),
            text_values: AHashMap::new(),
            numeric_values: AHashMap::new(),
        }
    }

    /// Record a string (or opaque binary) value for `doc`.
    pub fn add_text(&mut self, doc: u32, value: impl Into<String>) {
        self.text_values.entry(doc).or_default().push(value.into());
    }

    /// Record a numeric value for `doc`. Multi-valued fields call this once
    /// per value.
    pub fn add_numeric(&mut self, doc: u32, value: i64) {
        self.numeric_values.entry(doc).or_default().push(value);
    }

    /// Ordinal-based sorted values are not modeled by this format.
    pub fn add_sorted(&mut self, _doc: u32, _ord: u64) -> Result<()> {
        Err(unsupported_ordinals())
    }

    /// Flush all accumulated values and persist the sidecar metadata,
    /// consuming the writer. Documents never added are never written.
    pub fn finish<W: Write>(
        self,
        service: &RemoteIndexService,
        segment_id: &[u8; SEGMENT_ID_LEN],
        sidecar_out: &mut W,
    ) -> Result<()> {
        service.consume_doc_values(&self.prefix, &self.segment, &self.field, &self.text_values)?;
        service.consume_numeric_doc_values(
            &self.prefix,
            &self.segment,
            &self.field,
            &self.numeric_values,
        )?;
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

/// [`DocValuesReader`] fetching value sets from the remote store.
pub struct RemoteDocValuesReader {
    service: Arc<RemoteIndexService>,
    prefix: Arc<SegmentPrefix>,
    segment: String,
    field: String,
}

impl RemoteDocValuesReader {
    pub fn new(
        service: Arc<RemoteIndexService>,
        prefix: Arc<SegmentPrefix>,
        segment: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        RemoteDocValuesReader {
            service,
            prefix,
            segment: segment.into(),
            field: field.into(),
        }
    }

    fn fetch(&self, doc: u32) -> Result<Vec<String>> {
        self.service
            .fetch_doc_values(&self.prefix, &self.segment, &self.field, doc)
    }

    fn parse_numeric(member: &str) -> Result<i64> {
        // Values are stringified on write; accept the float form too.
        if let Ok(value) = member.parse::<i64>() {
            return Ok(value);
        }
        member
            .parse::<f64>()
            .map(|value| value as i64)
            .map_err(|_| RemoraError::corrupted(format!("non-numeric doc value: {member:?}")))
    }
}

impl DocValuesReader for RemoteDocValuesReader {
    fn numeric(&self, doc: u32) -> Result<Option<i64>> {
        let values = self.fetch(doc)?;
        match values.first() {
            None => Ok(None),
            Some(member) => Self::parse_numeric(member).map(Some),
        }
    }

    fn sorted_numeric(&self, doc: u32) -> Result<Vec<i64>> {
        let members = self.fetch(doc)?;
        let mut values = Vec::with_capacity(members.len());
        for member in &members {
            values.push(Self::parse_numeric(member)?);
        }
        values.sort_unstable();
        Ok(values)
    }

    fn binary(&self, doc: u32) -> Result<Option<Vec<u8>>> {
        let mut values = self.fetch(doc)?;
        if values.is_empty() {
            return Ok(None);
        }
        Ok(Some(values.swap_remove(0).into_bytes()))
    }

    fn has_value(&self, doc: u32) -> Result<bool> {
        Ok(!self.fetch(doc)?.is_empty())
    }
}
