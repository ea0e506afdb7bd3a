//! Remote-backed inverted index: key layout, write path, read path.
//!
//! - `keys`: remote key construction for postings, terms, doc values, and
//!   segment summaries
//! - `writer`: in-memory postings accumulation flushed at segment finish
//! - `reader`: term and postings cursors over the stored sets

pub mod keys;
pub mod reader;
pub mod writer;

// Re-exports
pub use reader::{
    PostingsCursor, RemotePostingsCursor, RemoteTermCursor, SeekOutcome, TermCursor,
};
pub use writer::PostingsWriter;
