use std::sync::Arc;

use remora::remote::MemoryStore;
use remora::{
    ClusterConfig, DocValuesReader, DocValuesWriter, PostingsCursor, PostingsWriter,
    RemoraConfig, RemoteClientRegistry, RemoteDocValuesReader, RemoteIndexService, RemoteStore,
    RemoteTermCursor, Result, SEGMENT_ID_LEN, SeekOutcome, TermCursor, read_sidecar,
};

fn test_config(postings_batch_size: usize) -> Arc<RemoraConfig> {
    let mut config = RemoraConfig::new("posts")
        .add_cluster("tags", ClusterConfig::new("127.0.0.1:6379"))
        .route_field("tag_ids", "tags")
        .route_field("color", "tags")
        .route_field("price", "tags");
    config.postings_batch_size = postings_batch_size;
    Arc::new(config)
}

/// A service whose clients all share one in-process store, so separately
/// constructed services observe each other's writes like real remote nodes.
fn memory_service(config: Arc<RemoraConfig>, store: Arc<MemoryStore>) -> Arc<RemoteIndexService> {
    let registry = Arc::new(RemoteClientRegistry::with_factory(
        config.clone(),
        Arc::new(move |_| store.clone() as Arc<dyn RemoteStore>),
    ));
    Arc::new(RemoteIndexService::new(config, registry))
}

#[test]
fn test_postings_write_then_read_through_separate_services() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let segment_id = [9u8; SEGMENT_ID_LEN];

    // 1. Write path: its own service instance, as at segment flush time.
    let writer_service = memory_service(test_config(10_000), store.clone());
    let prefix = writer_service.get_or_create_prefix("posts-0", &segment_id);
    let mut writer = PostingsWriter::new(prefix.clone(), "seg_0", "tag_ids");
    for doc in [3, 1, 4, 1, 5] {
        writer.push("cat", doc);
    }
    writer.push("dog", 2);
    assert_eq!(writer.term_count(), 2);

    let mut sidecar = Vec::new();
    writer.finish(&writer_service, &segment_id, &mut sidecar)?;

    // 2. Read path: a fresh service rediscovers the namespace from the
    //    sidecar alone.
    let reader_service = memory_service(test_config(10_000), store);
    let meta = read_sidecar(&mut &sidecar[..], &segment_id)?;
    assert_eq!(meta.field, "tag_ids");
    let recovered = Arc::new(meta.prefix);
    reader_service.register_segment(&recovered, &segment_id)?;
    assert_eq!(recovered.as_ref(), prefix.as_ref());

    // 3. Duplicates collapse: "cat" was fed [3, 1, 4, 1, 5].
    assert_eq!(
        reader_service.get_doc_count_for_term(&recovered, "seg_0", "tag_ids", "cat")?,
        4
    );
    assert_eq!(
        reader_service.get_doc_after(&recovered, "seg_0", "tag_ids", "cat", None, 10)?,
        vec![1, 3, 4, 5]
    );
    assert_eq!(
        reader_service.get_doc_after(&recovered, "seg_0", "tag_ids", "cat", Some(3), 10)?,
        vec![4, 5]
    );

    let mut cursor =
        RemoteTermCursor::new(reader_service.clone(), recovered.clone(), "seg_0", "tag_ids");
    assert_eq!(cursor.seek_ceil(None)?, SeekOutcome::NotFound);
    assert_eq!(cursor.term(), Some("cat"));

    // 4. The summary counts distinct documents across all terms.
    assert_eq!(
        reader_service.get_doc_count(&recovered, "seg_0", "tag_ids")?,
        Some(5)
    );
    assert_eq!(
        reader_service.terms_size(&recovered, "seg_0", "tag_ids")?,
        2
    );

    // 5. A segment never written has no summary at all.
    assert_eq!(
        reader_service.get_doc_count(&recovered, "seg_missing", "tag_ids")?,
        None
    );
    Ok(())
}

#[test]
fn test_term_cursor_enumerates_lexicographically() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let service = memory_service(test_config(10_000), store);
    let segment_id = [1u8; SEGMENT_ID_LEN];
    let prefix = service.get_or_create_prefix("posts-0", &segment_id);

    let mut writer = PostingsWriter::new(prefix.clone(), "seg_0", "tag_ids");
    writer.push("banana", 1);
    writer.push("apple", 2);
    writer.push("cherry", 3);
    let mut sidecar = Vec::new();
    writer.finish(&service, &segment_id, &mut sidecar)?;

    // Insertion order does not matter; enumeration is lexicographic.
    let mut cursor = RemoteTermCursor::new(service.clone(), prefix.clone(), "seg_0", "tag_ids");
    assert_eq!(cursor.next()?, Some("apple"));
    assert_eq!(cursor.next()?, Some("banana"));
    assert_eq!(cursor.doc_freq()?, 1);
    assert_eq!(cursor.next()?, Some("cherry"));
    assert_eq!(cursor.next()?, None);
    assert_eq!(cursor.next()?, None, "stays exhausted");

    // Seeking repositions an exhausted cursor.
    assert_eq!(cursor.seek_ceil(Some("banana"))?, SeekOutcome::Found);
    assert_eq!(cursor.term(), Some("banana"));
    assert_eq!(cursor.seek_ceil(Some("bb"))?, SeekOutcome::NotFound);
    assert_eq!(cursor.term(), Some("cherry"));
    assert_eq!(cursor.seek_ceil(Some("zzz"))?, SeekOutcome::End);
    assert_eq!(cursor.term(), None);
    assert_eq!(cursor.seek_ceil(None)?, SeekOutcome::NotFound);
    assert_eq!(cursor.term(), Some("apple"));
    Ok(())
}

#[test]
fn test_postings_cursor_paginates_with_small_batches() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    // Batch size 2 forces several round trips for 5 postings.
    let service = memory_service(test_config(2), store);
    let segment_id = [2u8; SEGMENT_ID_LEN];
    let prefix = service.get_or_create_prefix("posts-0", &segment_id);

    let mut writer = PostingsWriter::new(prefix.clone(), "seg_0", "tag_ids");
    for doc in [10, 20, 30, 40, 50] {
        writer.push("cat", doc);
    }
    let mut sidecar = Vec::new();
    writer.finish(&service, &segment_id, &mut sidecar)?;

    let mut cursor = RemoteTermCursor::new(service.clone(), prefix.clone(), "seg_0", "tag_ids");
    assert_eq!(cursor.seek_ceil(Some("cat"))?, SeekOutcome::Found);
    let mut postings = cursor.postings()?;

    assert_eq!(postings.doc_id(), None, "unpositioned before first advance");
    assert_eq!(postings.cost()?, 5);
    let mut seen = Vec::new();
    while let Some(doc) = postings.next_doc()? {
        seen.push(doc);
    }
    assert_eq!(seen, vec![10, 20, 30, 40, 50]);
    assert_eq!(postings.next_doc()?, None);

    // advance() skips across batch boundaries.
    let mut postings = cursor.postings()?;
    assert_eq!(postings.advance(35)?, Some(40));
    assert_eq!(postings.doc_id(), Some(40));
    assert_eq!(postings.next_doc()?, Some(50));
    assert_eq!(postings.advance(60)?, None);
    assert_eq!(postings.freq(), 1);
    Ok(())
}

#[test]
fn test_doc_values_presence_semantics() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let service = memory_service(test_config(10_000), store);
    let segment_id = [3u8; SEGMENT_ID_LEN];
    let prefix = service.get_or_create_prefix("posts-0", &segment_id);

    let mut writer = DocValuesWriter::new(prefix.clone(), "seg_0", "price");
    writer.add_numeric(0, 42);
    writer.add_numeric(1, 7);
    writer.add_numeric(1, 3);
    writer.add_text(2, "red");
    assert!(writer.add_sorted(3, 0).is_err());
    let mut sidecar = Vec::new();
    writer.finish(&service, &segment_id, &mut sidecar)?;

    let reader = RemoteDocValuesReader::new(service.clone(), prefix.clone(), "seg_0", "price");
    assert_eq!(reader.numeric(0)?, Some(42));
    assert_eq!(reader.sorted_numeric(1)?, vec![3, 7]);
    assert_eq!(reader.binary(2)?, Some(b"red".to_vec()));
    assert!(reader.has_value(0)?);

    // Document 9 was never written: absent, not zero.
    assert_eq!(reader.numeric(9)?, None);
    assert_eq!(reader.numeric_or_zero(9)?, 0);
    assert!(reader.sorted_numeric(9)?.is_empty());
    assert_eq!(reader.binary(9)?, None);
    assert!(!reader.has_value(9)?);
    assert!(reader.sorted_ord(0).is_err());
    Ok(())
}

#[test]
fn test_unrouted_field_is_a_config_error() {
    let store = Arc::new(MemoryStore::new());
    let service = memory_service(test_config(10_000), store);
    let segment_id = [4u8; SEGMENT_ID_LEN];
    let prefix = service.get_or_create_prefix("posts-0", &segment_id);

    let err = service
        .get_doc_count(&prefix, "seg_0", "unrouted_field")
        .unwrap_err();
    assert!(matches!(err, remora::RemoraError::Config(_)));
}

#[test]
fn test_close_releases_unused_clients() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let config = test_config(10_000);
    let registry = {
        let store = store.clone();
        Arc::new(RemoteClientRegistry::with_factory(
            config.clone(),
            Arc::new(move |_| store.clone() as Arc<dyn RemoteStore>),
        ))
    };
    let service = RemoteIndexService::new(config, registry.clone());
    let segment_id = [5u8; SEGMENT_ID_LEN];
    let prefix = service.get_or_create_prefix("posts-0", &segment_id);

    let mut writer = PostingsWriter::new(prefix.clone(), "seg_0", "tag_ids");
    writer.push("cat", 1);
    let mut sidecar = Vec::new();
    writer.finish(&service, &segment_id, &mut sidecar)?;
    assert_eq!(registry.len(), 1);

    service.close();
    assert!(registry.is_empty());
    Ok(())
}
