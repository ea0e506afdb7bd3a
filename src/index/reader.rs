//! Read path of the remote-backed inverted index.
//!
//! Two cursor traits sit at the seam to the host engine:
//!
//! - [`TermCursor`]: lexicographic term enumeration with `seek_ceil`/`next`,
//!   one remote round trip per step.
//! - [`PostingsCursor`]: forward-only, batched enumeration of one term's
//!   postings; never materializes the full list in memory.
//!
//! This format models presence only: frequency is always 1, and positions,
//! offsets, and payloads are permanently absent.

use std::sync::Arc;

use crate::error::{RemoraError, Result};
use crate::segment::prefix::SegmentPrefix;
use crate::service::RemoteIndexService;

/// Outcome of a [`TermCursor::seek_ceil`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The cursor landed exactly on the requested term.
    Found,
    /// The cursor landed on the smallest term greater than the request
    /// (always the case when seeking with no bound).
    NotFound,
    /// The term set is exhausted; the cursor is unpositioned.
    End,
}

/// Lexicographic cursor over the distinct terms of one field in one segment.
pub trait TermCursor {
    /// Position on the smallest stored term >= `term`, or the smallest term
    /// overall when `term` is `None`.
    fn seek_ceil(&mut self, term: Option<&str>) -> Result<SeekOutcome>;

    /// Advance to the lexicographically next term, or `None` at end. A
    /// fresh cursor positions on the first term.
    fn next(&mut self) -> Result<Option<&str>>;

    /// The term the cursor is positioned on.
    fn term(&self) -> Option<&str>;

    /// Document frequency of the current term, fetched on demand.
    fn doc_freq(&self) -> Result<u64>;
}

/// Forward-only cursor over one term's postings.
pub trait PostingsCursor {
    /// The current document ordinal, `None` before the first call or after
    /// exhaustion.
    fn doc_id(&self) -> Option<u32>;

    /// Advance to the next document, or `None` at end of postings.
    fn next_doc(&mut self) -> Result<Option<u32>>;

    /// Advance to the smallest document ordinal >= `target`, or `None` if
    /// no remaining batch contains one.
    fn advance(&mut self, target: u32) -> Result<Option<u32>>;

    /// Query-planner estimate: the term's document frequency, fetched once
    /// and memoized for the lifetime of the cursor.
    fn cost(&mut self) -> Result<u64>;

    /// Presence-only postings: always 1.
    fn freq(&self) -> u32 {
        1
    }
}

/// [`TermCursor`] backed by lexicographic range queries on the terms set.
pub struct RemoteTermCursor {
    service: Arc<RemoteIndexService>,
    prefix: Arc<SegmentPrefix>,
    segment: String,
    field: String,
    current: Option<String>,
    ended: bool,
}

impl RemoteTermCursor {
    pub fn new(
        service: Arc<RemoteIndexService>,
        prefix: Arc<SegmentPrefix>,
        segment: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        RemoteTermCursor {
            service,
            prefix,
            segment: segment.into(),
            field: field.into(),
            current: None,
            ended: false,
        }
    }

    /// Postings cursor for the current term.
    pub fn postings(&self) -> Result<RemotePostingsCursor> {
        let term = self.current.as_deref().ok_or_else(|| {
            RemoraError::invariant("postings requested from an unpositioned term cursor")
        })?;
        Ok(RemotePostingsCursor::new(
            self.service.clone(),
            self.prefix.clone(),
            self.segment.clone(),
            self.field.clone(),
            term,
            self.service.postings_batch_size(),
        ))
    }
}

impl TermCursor for RemoteTermCursor {
    fn seek_ceil(&mut self, term: Option<&str>) -> Result<SeekOutcome> {
        let ceil = self
            .service
            .seek_ceil(&self.prefix, &self.segment, &self.field, term)?;
        match ceil {
            None => {
                self.current = None;
                self.ended = true;
                Ok(SeekOutcome::End)
            }
            Some(ceil) => {
                let outcome = if term == Some(ceil.as_str()) {
                    SeekOutcome::Found
                } else {
                    SeekOutcome::NotFound
                };
                self.current = Some(ceil);
                self.ended = false;
                Ok(outcome)
            }
        }
    }

    fn next(&mut self) -> Result<Option<&str>> {
        if self.ended {
            return Ok(None);
        }
        let next = match &self.current {
            None => self
                .service
                .seek_ceil(&self.prefix, &self.segment, &self.field, None)?,
            Some(current) => {
                self.service
                    .next_term(&self.prefix, &self.segment, &self.field, current)?
            }
        };
        match next {
            None => {
                self.current = None;
                self.ended = true;
                Ok(None)
            }
            Some(term) => {
                self.current = Some(term);
                Ok(self.current.as_deref())
            }
        }
    }

    fn term(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn doc_freq(&self) -> Result<u64> {
        let term = self.current.as_deref().ok_or_else(|| {
            RemoraError::invariant("doc_freq requested from an unpositioned term cursor")
        })?;
        self.service
            .get_doc_count_for_term(&self.prefix, &self.segment, &self.field, term)
    }
}

/// [`PostingsCursor`] fetching batches of ordinals by score pagination.
///
/// A batch shorter than the batch size is the final one; from that point on
/// the cursor issues no further remote calls.
pub struct RemotePostingsCursor {
    service: Arc<RemoteIndexService>,
    prefix: Arc<SegmentPrefix>,
    segment: String,
    field: String,
    term: String,
    batch_size: usize,
    docs: Vec<u32>,
    position: usize,
    initialized: bool,
    last_batch: bool,
    cost: Option<u64>,
}

impl RemotePostingsCursor {
    pub fn new(
        service: Arc<RemoteIndexService>,
        prefix: Arc<SegmentPrefix>,
        segment: impl Into<String>,
        field: impl Into<String>,
        term: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        RemotePostingsCursor {
            service,
            prefix,
            segment: segment.into(),
            field: field.into(),
            term: term.into(),
            batch_size: batch_size.max(1),
            docs: Vec::new(),
            position: 0,
            initialized: false,
            last_batch: false,
            cost: None,
        }
    }

    fn fetch_batch(&mut self, after: Option<u32>) -> Result<()> {
        self.docs = self.service.get_doc_after(
            &self.prefix,
            &self.segment,
            &self.field,
            &self.term,
            after,
            self.batch_size,
        )?;
        self.position = 0;
        if self.docs.len() < self.batch_size {
            self.last_batch = true;
        }
        Ok(())
    }

    fn init_if_required(&mut self) -> Result<()> {
        if !self.initialized {
            self.initialized = true;
            self.fetch_batch(None)?;
        }
        Ok(())
    }
}

impl PostingsCursor for RemotePostingsCursor {
    fn doc_id(&self) -> Option<u32> {
        if !self.initialized {
            return None;
        }
        self.docs.get(self.position).copied()
    }

    fn next_doc(&mut self) -> Result<Option<u32>> {
        if !self.initialized {
            return self.advance(0);
        }
        match self.doc_id() {
            Some(doc) if doc == u32::MAX => {
                self.position = self.docs.len();
                Ok(None)
            }
            Some(doc) => self.advance(doc + 1),
            None => Ok(None),
        }
    }

    fn advance(&mut self, target: u32) -> Result<Option<u32>> {
        self.init_if_required()?;
        let mut index = self.docs.partition_point(|doc| *doc < target);
        while index == self.docs.len() {
            if self.last_batch {
                break;
            }
            let after = self.docs.last().copied();
            self.fetch_batch(after)?;
            if self.docs.is_empty() {
                break;
            }
            index = self.docs.partition_point(|doc| *doc < target);
        }
        if index == self.docs.len() {
            self.position = self.docs.len();
            return Ok(None);
        }
        self.position = index;
        Ok(Some(self.docs[index]))
    }

    fn cost(&mut self) -> Result<u64> {
        if let Some(cost) = self.cost {
            return Ok(cost);
        }
        let cost = self.service.get_doc_count_for_term(
            &self.prefix,
            &self.segment,
            &self.field,
            &self.term,
        )?;
        self.cost = Some(cost);
        Ok(cost)
    }
}
