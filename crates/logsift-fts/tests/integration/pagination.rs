//! Paging windows, argument validation and keyword searches end to end.

use logsift_core::Error;
use logsift_fts::{LogSort, LogStore, SearchConfig, SearchParams};

use crate::common::{TestHarness, record, request};

async fn seeded(count: i64) -> TestHarness {
    let harness = TestHarness::with_config(SearchConfig {
        default_limit: 10,
        ..Default::default()
    });
    let records = (0..count)
        .map(|i| record(&format!("r-{i:02}"), "paged entry", i))
        .collect();
    harness.store.add_records(records).await.unwrap();
    harness
}

fn ids(page: &logsift_fts::SearchResults<logsift_fts::LogRecord>) -> Vec<String> {
    page.found_items.iter().map(|r| r.id.clone()).collect()
}

#[tokio::test]
async fn test_pages_walk_the_full_hit_list() {
    let harness = seeded(25).await;

    let mut seen = Vec::new();
    let mut offset = 0;
    loop {
        let page = harness
            .store
            .search(SearchParams {
                sort: LogSort::OldestFirst,
                limit: Some(10),
                offset,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.max_items_number, 25);
        assert_eq!(page.offset, offset);
        seen.extend(ids(&page));
        if !page.has_more() {
            break;
        }
        offset += 10;
    }

    let expected: Vec<_> = (0..25).map(|i| format!("r-{i:02}")).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_last_page_is_short() {
    let harness = seeded(25).await;
    let page = harness
        .store
        .search(SearchParams {
            sort: LogSort::NewestFirst,
            limit: Some(10),
            offset: 20,
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(ids(&page), vec!["r-04", "r-03", "r-02", "r-01", "r-00"]);
    assert_eq!(page.items_to_return, 10);
}

#[tokio::test]
async fn test_offset_past_hits_reports_true_total() {
    let harness = seeded(7).await;
    let page = harness
        .store
        .search(SearchParams {
            offset: 50,
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(page.found_items.is_empty());
    assert_eq!(page.max_items_number, 7);
    assert_eq!(page.offset, 50);
}

#[tokio::test]
async fn test_invalid_page_leaves_store_untouched() {
    let harness = seeded(3).await;
    let before = harness.store.engine().snapshot();

    let zero = harness
        .store
        .search(SearchParams {
            limit: Some(0),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(zero, Error::InvalidArgument { .. }));

    let overflow = harness
        .engine_search_with_offset(usize::MAX)
        .await
        .unwrap_err();
    assert!(matches!(overflow, Error::InvalidArgument { .. }));

    let after = harness.store.engine().snapshot();
    assert!(before.same_generation(&after));
    assert_eq!(harness.store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_keyword_search_end_to_end() {
    let harness = TestHarness::new();
    harness
        .store
        .add_records(vec![
            request("a", "/orders/checkout", 500, "10.0.0.1", "orders api"),
            request("b", "/orders/checkout", 200, "10.0.0.2", "orders api"),
            request("c", "/catalog/list", 500, "10.0.0.1", "catalog api"),
            request("d", "/catalog/list", 404, "10.0.0.3", "catalog api"),
        ])
        .await
        .unwrap();

    let search = |text: &'static str| {
        let store = harness.store.clone();
        async move {
            let mut found: Vec<_> = store
                .search(SearchParams::new(text))
                .await
                .unwrap()
                .found_items
                .into_iter()
                .map(|r| r.id)
                .collect();
            found.sort();
            found
        }
    };

    assert_eq!(search("http:500").await, vec!["a", "c"]);
    assert_eq!(search("http:500 ip:10.0.0.1 url:/catalog").await, vec!["c"]);
    assert_eq!(search("service:'orders api'").await, vec!["a", "b"]);
    assert_eq!(search("url:'/catalog/list' 404").await, vec!["d"]);
    // Embedded keyword is plain text and matches nothing.
    assert!(search("ghttp:sdfsf").await.is_empty());
}

#[tokio::test]
async fn test_filters_combine_with_keywords() {
    let harness = TestHarness::new();
    harness
        .store
        .add_records(vec![
            request("a", "/orders/checkout", 500, "10.0.0.1", "orders api"),
            request("b", "/orders/checkout", 200, "10.0.0.2", "orders api"),
        ])
        .await
        .unwrap();

    let page = harness
        .store
        .search(SearchParams {
            query: "url:/orders".to_string(),
            levels: vec!["Error".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(ids(&page), vec!["a"]);
}

impl TestHarness {
    async fn engine_search_with_offset(
        &self,
        offset: usize,
    ) -> logsift_core::Result<logsift_fts::SearchResults<tantivy::TantivyDocument>> {
        self.store
            .engine()
            .search(
                Box::new(tantivy::query::AllQuery),
                logsift_fts::SortOrder::Relevance,
                1,
                offset,
            )
            .await
    }
}
