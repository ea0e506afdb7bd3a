//! Deterministic remote-store key templates.
//!
//! Every key is scoped by `(prefix, segment, field)`; the same four-tuple
//! always maps to the same key string, and no two `(field, segment)` pairs
//! collide because the prefix is unique per physical segment.

use crate::segment::prefix::SegmentPrefix;

/// Set of value strings for one document: `dV/{prefix}/{segment}/{field}/{docId}`.
pub fn doc_values_key(prefix: &SegmentPrefix, segment: &str, field: &str, doc_id: u32) -> String {
    format!("dV/{prefix}/{segment}/{field}/{doc_id}")
}

/// Sorted set of all distinct terms for a field: `T/{prefix}/{segment}/{field}`.
pub fn terms_key(prefix: &SegmentPrefix, segment: &str, field: &str) -> String {
    format!("T/{prefix}/{segment}/{field}")
}

/// Postings sorted set for one term: `iD/{prefix}/{segment}/{field}/{term}`.
pub fn postings_key(prefix: &SegmentPrefix, segment: &str, field: &str, term: &str) -> String {
    format!("iD/{prefix}/{segment}/{field}/{term}")
}

/// Scalar distinct-document count: `S/{prefix}/{segment}/{field}`.
pub fn segment_summary_key(prefix: &SegmentPrefix, segment: &str, field: &str) -> String {
    format!("S/{prefix}/{segment}/{field}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formats() {
        let prefix: SegmentPrefix = "posts-1/abc123".parse().unwrap();
        assert_eq!(
            doc_values_key(&prefix, "seg0", "tag_ids", 7),
            "dV/posts-1/abc123/seg0/tag_ids/7"
        );
        assert_eq!(terms_key(&prefix, "seg0", "tag_ids"), "T/posts-1/abc123/seg0/tag_ids");
        assert_eq!(
            postings_key(&prefix, "seg0", "tag_ids", "cat"),
            "iD/posts-1/abc123/seg0/tag_ids/cat"
        );
        assert_eq!(
            segment_summary_key(&prefix, "seg0", "tag_ids"),
            "S/posts-1/abc123/seg0/tag_ids"
        );
    }

    #[test]
    fn test_distinct_tuples_never_collide() {
        let a: SegmentPrefix = "posts-1/aaaa".parse().unwrap();
        let b: SegmentPrefix = "posts-1/bbbb".parse().unwrap();
        assert_ne!(terms_key(&a, "seg0", "f"), terms_key(&b, "seg0", "f"));
        assert_ne!(terms_key(&a, "seg0", "f"), terms_key(&a, "seg1", "f"));
        assert_ne!(terms_key(&a, "seg0", "f"), terms_key(&a, "seg0", "g"));
    }
}
