//! Common test utilities for logsift integration tests.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use logsift_fts::{LogRecord, SearchConfig, TantivyLogStore};
use tantivy::Term;
use tantivy::collector::Count;
use tantivy::query::TermQuery;
use tantivy::schema::IndexRecordOption;

/// Test harness owning an in-memory log store.
pub struct TestHarness {
    /// Store under test.
    pub store: Arc<TantivyLogStore>,
}

impl TestHarness {
    /// Creates a harness with the default configuration.
    pub fn new() -> Self {
        Self::with_config(SearchConfig::default())
    }

    /// Creates a harness with a custom configuration.
    pub fn with_config(config: SearchConfig) -> Self {
        let store = TantivyLogStore::in_memory(&config).expect("in-memory store");
        Self {
            store: Arc::new(store),
        }
    }

    /// Number of documents stored under `id` in the current snapshot.
    pub fn copies_of(&self, id: &str) -> usize {
        let snapshot = self.store.engine().snapshot();
        let term = Term::from_field_text(self.store.schema().id, id);
        snapshot
            .searcher()
            .search(&TermQuery::new(term, IndexRecordOption::Basic), &Count)
            .expect("count by id")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed timestamp `minute` minutes into the test day.
pub fn at_minute(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(minute)
}

/// Record with an id, a message and a timestamp.
pub fn record(id: &str, message: &str, minute: i64) -> LogRecord {
    LogRecord::builder()
        .id(id)
        .logger_name("Shop.Orders.Api")
        .log_level("Info")
        .server("web-01")
        .time_utc(at_minute(minute))
        .message(message)
        .build()
}

/// Web request record carrying the keyword fields.
pub fn request(id: &str, url: &str, status: u16, ip: &str, service: &str) -> LogRecord {
    LogRecord::builder()
        .id(id)
        .logger_name("Shop.Web.Requests")
        .log_level(if status >= 500 { "Error" } else { "Info" })
        .server("web-02")
        .time_utc(at_minute(0))
        .message(format!("{status} {url}"))
        .url(url)
        .http_status(status)
        .client_ip(ip)
        .service(service)
        .build()
}
