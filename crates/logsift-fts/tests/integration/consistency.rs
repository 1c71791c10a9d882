//! Read-your-writes, snapshot isolation and writer serialization.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use logsift_fts::{LogStore, SearchParams};
use tantivy::collector::Count;
use tantivy::query::AllQuery;

use crate::common::{TestHarness, record};

#[tokio::test]
async fn test_saved_record_found_by_next_search() {
    let harness = TestHarness::new();

    for i in 0..5 {
        let id = format!("rec-{i}");
        harness
            .store
            .add_record(record(&id, &format!("checkout step {i} finished"), i))
            .await
            .unwrap();

        let page = harness
            .store
            .search(SearchParams::new(format!("step {i}")))
            .await
            .unwrap();
        assert!(
            page.found_items.iter().any(|r| r.id == id),
            "record {id} not visible after save returned"
        );
    }
}

#[tokio::test]
async fn test_held_snapshot_ignores_later_commits() {
    let harness = TestHarness::new();
    harness
        .store
        .add_record(record("before", "first", 0))
        .await
        .unwrap();

    let held = harness.store.engine().snapshot();
    harness
        .store
        .add_record(record("after", "second", 1))
        .await
        .unwrap();

    let held_count = held.searcher().search(&AllQuery, &Count).unwrap();
    assert_eq!(held_count, 1);
    assert_eq!(held.generation() + 1, harness.store.engine().snapshot().generation());
    assert_eq!(harness.store.count().await.unwrap(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_all_commit_once_each() {
    let harness = TestHarness::new();
    let start = harness.store.engine().snapshot().generation();

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let store = Arc::clone(&harness.store);
            tokio::spawn(async move {
                store
                    .add_record(record(&format!("c-{i}"), "concurrent", i))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(harness.store.count().await.unwrap(), 16);
    // One reopen may adopt several commits that landed before it ran.
    let end = harness.store.engine().snapshot().generation();
    assert!(end > start && end <= start + 16, "generation {start} -> {end}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_replace_never_exposes_zero_or_two_copies() {
    let harness = Arc::new(TestHarness::new());
    harness
        .store
        .add_record(record("target", "version 0", 0))
        .await
        .unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let harness = Arc::clone(&harness);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    assert_eq!(harness.copies_of("target"), 1);
                }
            })
        })
        .collect();

    for version in 1..=20 {
        harness
            .store
            .replace_record("target", record("target", &format!("version {version}"), version))
            .await
            .unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        reader.join().unwrap();
    }

    let latest = harness.store.get_record("target").await.unwrap().unwrap();
    assert_eq!(latest.message.as_deref(), Some("version 20"));
    assert_eq!(harness.copies_of("target"), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_searches_run_during_writes() {
    let harness = TestHarness::new();
    for i in 0..10 {
        harness
            .store
            .add_record(record(&format!("seed-{i}"), "seed", i))
            .await
            .unwrap();
    }

    let writer = {
        let store = Arc::clone(&harness.store);
        tokio::spawn(async move {
            for i in 10..30 {
                store
                    .add_record(record(&format!("w-{i}"), "written", i))
                    .await
                    .unwrap();
            }
        })
    };

    let mut last_total = 0;
    for _ in 0..20 {
        let page = harness
            .store
            .search(SearchParams::default())
            .await
            .unwrap();
        // Totals only grow, and every page is consistent with its own total.
        assert!(page.max_items_number >= last_total);
        assert!(page.found_items.len() <= page.max_items_number);
        last_total = page.max_items_number;
    }

    writer.await.unwrap();
    assert_eq!(harness.store.count().await.unwrap(), 30);
}
