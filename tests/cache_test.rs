use remora::{
    DocIdSet, QueryPlanCache, RemoraConfig, ResultCacheConfig, SegmentIdentity,
    SegmentResultCache,
};

fn result_cache() -> SegmentResultCache {
    SegmentResultCache::new(&RemoraConfig::new("posts").result_cache)
}

#[test]
fn test_result_cache_search_flow() {
    let cache = result_cache();
    let segment = SegmentIdentity::next();
    let fingerprint = "tag_ids:cat";

    // 1. First execution misses and caches the materialized set.
    assert!(cache.get(segment, fingerprint).is_none());
    cache.put(segment, fingerprint, DocIdSet::new(vec![3, 1, 4, 1, 5]));

    // 2. Re-execution of the same query against the same segment hits.
    let hit = cache.get(segment, fingerprint).unwrap();
    assert_eq!(hit.iter().collect::<Vec<_>>(), vec![1, 3, 4, 5]);
    assert!(hit.contains(4));

    // 3. The same query against a different segment instance is a miss.
    let other_segment = SegmentIdentity::next();
    assert!(cache.get(other_segment, fingerprint).is_none());

    let stats = cache.stats(segment).unwrap();
    assert_eq!(stats.hit_count, 1);
    assert_eq!(stats.miss_count, 1);
}

#[test]
fn test_result_cache_segment_close_invalidates() {
    let cache = result_cache();
    let closing = SegmentIdentity::next();
    let surviving = SegmentIdentity::next();
    cache.put(closing, "q1", DocIdSet::new(vec![1]));
    cache.put(closing, "q2", DocIdSet::new(vec![2]));
    cache.put(surviving, "q1", DocIdSet::new(vec![3]));

    cache.clear_segment(closing);

    assert!(cache.get(closing, "q1").is_none());
    assert!(cache.get(closing, "q2").is_none());
    assert!(cache.get(surviving, "q1").is_some());
    assert!(cache.stats(closing).is_none(), "counters go with the segment");
}

#[test]
fn test_result_cache_query_invalidation_spans_segments() {
    let cache = result_cache();
    let seg_a = SegmentIdentity::next();
    let seg_b = SegmentIdentity::next();
    cache.put(seg_a, "stale", DocIdSet::new(vec![1]));
    cache.put(seg_b, "stale", DocIdSet::new(vec![2]));
    cache.put(seg_b, "live", DocIdSet::new(vec![3]));

    cache.clear_query("stale");

    assert!(cache.get(seg_a, "stale").is_none());
    assert!(cache.get(seg_b, "stale").is_none());
    assert!(cache.get(seg_b, "live").is_some());
}

#[test]
fn test_result_cache_stays_under_weight_bound() {
    let mut config = ResultCacheConfig::default();
    config.max_bytes = 512;
    let cache = SegmentResultCache::new(&config);
    let segment = SegmentIdentity::next();

    for i in 0..100u32 {
        cache.put(segment, format!("q{i}"), DocIdSet::new(vec![i, i + 1, i + 2]));
        assert!(cache.weight_bytes() <= 512);
    }
    assert!(cache.len() < 100, "old entries were evicted");
    // The most recent insert always survives.
    assert!(cache.get(segment, "q99").is_some());
}

#[test]
fn test_plan_cache_rewrite_flow() {
    let config = RemoraConfig::new("posts");
    let cache: QueryPlanCache<Vec<String>> = QueryPlanCache::new(&config.plan_cache);
    assert!(cache.is_enabled());

    let source = r#"{"term": {"tag_ids": "cat"}}"#;
    assert!(cache.get(source).is_none());
    cache.put(source, vec!["term(tag_ids=cat)".to_string()]);
    assert_eq!(
        cache.get(source).unwrap(),
        vec!["term(tag_ids=cat)".to_string()]
    );

    let stats = cache.stats();
    assert_eq!(stats.hit_count, 1);
    assert_eq!(stats.miss_count, 1);
    assert_eq!(stats.entry_count, 1);

    // clear() drops entries and counters together.
    cache.clear();
    let stats = cache.stats();
    assert_eq!(stats.hit_count, 0);
    assert_eq!(stats.miss_count, 0);
    assert_eq!(stats.entry_count, 0);
}
