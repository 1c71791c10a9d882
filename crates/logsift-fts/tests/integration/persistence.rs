//! On-disk index creation, reopening and configuration loading.

use std::io::Write;

use logsift_fts::{
    LogStore, QueryMode, SearchConfig, SearchParams, TantivyLogStore, create_log_store,
};
use tempfile::{NamedTempFile, TempDir};

use crate::common::record;

fn disk_config(dir: &TempDir) -> SearchConfig {
    SearchConfig {
        index_path: Some(dir.path().join("index").to_string_lossy().to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_missing_index_is_created_empty() {
    let dir = TempDir::new().unwrap();
    let config = disk_config(&dir);
    let path = dir.path().join("index");
    assert!(!TantivyLogStore::index_exists(&path));

    let store = create_log_store(&config).await.unwrap();

    assert!(TantivyLogStore::index_exists(&path));
    assert_eq!(store.count().await.unwrap(), 0);
    let page = store.search(SearchParams::default()).await.unwrap();
    assert_eq!(page.max_items_number, 0);
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let config = disk_config(&dir);

    {
        let store = TantivyLogStore::new(&config).unwrap();
        store
            .add_records(vec![
                record("p-1", "persisted first", 1),
                record("p-2", "persisted second", 2),
            ])
            .await
            .unwrap();
        store.delete_record("p-1").await.unwrap();
    }

    let reopened = TantivyLogStore::new(&config).unwrap();
    assert_eq!(reopened.count().await.unwrap(), 1);

    let found = reopened.get_record("p-2").await.unwrap().unwrap();
    assert_eq!(found.message.as_deref(), Some("persisted second"));
    assert_eq!(found.logger_name, "Shop.Orders.Api");
    assert!(reopened.get_record("p-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_store_from_toml_file() {
    let dir = TempDir::new().unwrap();
    let index_dir = dir.path().join("from-toml");

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "backend = \"tantivy\"\nindex_path = {:?}\nquery_mode = \"or\"\nmax_limit = 5",
        index_dir.to_string_lossy()
    )
    .unwrap();

    let config = SearchConfig::load(file.path()).unwrap();
    assert_eq!(config.query_mode, QueryMode::Or);
    assert_eq!(config.max_limit, 5);

    let store = create_log_store(&config).await.unwrap();
    for i in 0..8 {
        store
            .add_record(record(&format!("t-{i}"), "alpha", i))
            .await
            .unwrap();
    }
    store
        .add_record(record("beta", "beta", 9))
        .await
        .unwrap();

    // OR mode: either word matches; the page is capped by max_limit.
    let page = store
        .search(SearchParams {
            query: "alpha beta".to_string(),
            limit: Some(50),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.max_items_number, 9);
    assert_eq!(page.found_items.len(), 5);
    assert!(index_dir.join("meta.json").exists());
}
