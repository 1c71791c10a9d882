//! Log record representation.
//!
//! This module defines `LogRecord`, the document shape collected from
//! applications and stored in the index. It maps directly to the schema
//! fields defined in `schema.rs`.
//!
//! # Creating Records
//!
//! ```rust
//! use logsift_fts::LogRecord;
//!
//! let record = LogRecord::builder()
//!     .logger_name("Shop.Orders.Checkout")
//!     .log_level("Error")
//!     .server("web-01")
//!     .message("Payment gateway timed out")
//!     .url("/orders/checkout")
//!     .http_status(504)
//!     .build();
//!
//! assert_eq!(record.url(), Some("/orders/checkout"));
//! assert_eq!(record.http_status().as_deref(), Some("504"));
//! ```
//!
//! # Additional Fields
//!
//! Web and service logs carry request data in `additional_fields`. Four keys
//! are promoted to their own index fields so the search-box keywords can
//! filter on them: `url`, `http_status`, `client_ip` and `service`.

use std::collections::BTreeMap;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Additional-field key holding the request URL.
pub const FIELD_URL: &str = "url";
/// Additional-field key holding the HTTP status code.
pub const FIELD_HTTP_STATUS: &str = "http_status";
/// Additional-field key holding the client IP address.
pub const FIELD_CLIENT_IP: &str = "client_ip";
/// Additional-field key holding the service name.
pub const FIELD_SERVICE: &str = "service";

/// A single application log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Unique record key. Generated on save when empty.
    #[serde(default)]
    pub id: String,
    /// Logger (usually a dotted type name).
    pub logger_name: String,
    /// Level such as "Info" or "Error".
    pub log_level: String,
    /// When the record was produced.
    ///
    /// The index keeps millisecond precision. The builder and `Default`
    /// truncate to milliseconds so a stored record reads back unchanged.
    pub time_utc: DateTime<Utc>,
    /// Producing process id.
    #[serde(default)]
    pub process_id: Option<i64>,
    /// Producing process name.
    #[serde(default)]
    pub process_name: Option<String>,
    /// Producing thread id.
    #[serde(default)]
    pub thread_id: Option<i64>,
    /// Host the record came from.
    #[serde(default)]
    pub server: Option<String>,
    /// Application path on the host.
    #[serde(default)]
    pub application_path: Option<String>,
    /// User or service identity.
    #[serde(default)]
    pub identity: Option<String>,
    /// Correlation id linking related records.
    #[serde(default)]
    pub correlation_id: Option<String>,
    /// Log message.
    #[serde(default)]
    pub message: Option<String>,
    /// Exception type name.
    #[serde(default)]
    pub exception_type: Option<String>,
    /// Exception message.
    #[serde(default)]
    pub exception_message: Option<String>,
    /// Stack trace or other exception details.
    #[serde(default)]
    pub exception_additional_info: Option<String>,
    /// Extra data describing the record, such as url or referer.
    #[serde(default)]
    pub additional_fields: BTreeMap<String, Value>,
    /// Samples for records produced from performance counters.
    #[serde(default)]
    pub performance_data: BTreeMap<String, f32>,
}

impl Default for LogRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            logger_name: String::new(),
            log_level: String::new(),
            time_utc: Utc::now().trunc_subsecs(3),
            process_id: None,
            process_name: None,
            thread_id: None,
            server: None,
            application_path: None,
            identity: None,
            correlation_id: None,
            message: None,
            exception_type: None,
            exception_message: None,
            exception_additional_info: None,
            additional_fields: BTreeMap::new(),
            performance_data: BTreeMap::new(),
        }
    }
}

impl LogRecord {
    /// Create a new record builder.
    pub fn builder() -> LogRecordBuilder {
        LogRecordBuilder::default()
    }

    /// Assign a fresh id when the record has none.
    pub fn ensure_id(&mut self) -> &str {
        if self.id.is_empty() {
            self.id = uuid::Uuid::new_v4().to_string();
        }
        &self.id
    }

    /// Request URL, if recorded.
    pub fn url(&self) -> Option<&str> {
        self.additional_fields.get(FIELD_URL).and_then(Value::as_str)
    }

    /// HTTP status, if recorded.
    ///
    /// Numbers and strings are both accepted in the source data.
    pub fn http_status(&self) -> Option<String> {
        self.additional_field_text(FIELD_HTTP_STATUS)
    }

    /// Client IP address, if recorded.
    pub fn client_ip(&self) -> Option<&str> {
        self.additional_fields
            .get(FIELD_CLIENT_IP)
            .and_then(Value::as_str)
    }

    /// Service name, if recorded.
    pub fn service(&self) -> Option<&str> {
        self.additional_fields
            .get(FIELD_SERVICE)
            .and_then(Value::as_str)
    }

    /// Render an additional field as plain text.
    ///
    /// Strings are returned as-is, numbers and booleans are formatted,
    /// null and structured values yield `None`.
    pub fn additional_field_text(&self, key: &str) -> Option<String> {
        match self.additional_fields.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// True when the record carries exception details.
    pub fn has_exception(&self) -> bool {
        self.exception_type.is_some() || self.exception_message.is_some()
    }
}

/// Builder for LogRecord.
#[derive(Debug, Default)]
pub struct LogRecordBuilder {
    record: LogRecord,
}

impl LogRecordBuilder {
    /// Set the record id.
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.record.id = id.into();
        self
    }

    /// Set the logger name.
    pub fn logger_name(mut self, logger_name: impl Into<String>) -> Self {
        self.record.logger_name = logger_name.into();
        self
    }

    /// Set the level.
    pub fn log_level(mut self, log_level: impl Into<String>) -> Self {
        self.record.log_level = log_level.into();
        self
    }

    /// Set the timestamp, truncated to milliseconds.
    pub fn time_utc(mut self, time_utc: DateTime<Utc>) -> Self {
        self.record.time_utc = time_utc.trunc_subsecs(3);
        self
    }

    /// Set the process id and name.
    pub fn process(mut self, process_id: i64, process_name: impl Into<String>) -> Self {
        self.record.process_id = Some(process_id);
        self.record.process_name = Some(process_name.into());
        self
    }

    /// Set the thread id.
    pub fn thread_id(mut self, thread_id: i64) -> Self {
        self.record.thread_id = Some(thread_id);
        self
    }

    /// Set the server.
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.record.server = Some(server.into());
        self
    }

    /// Set the application path.
    pub fn application_path(mut self, application_path: impl Into<String>) -> Self {
        self.record.application_path = Some(application_path.into());
        self
    }

    /// Set the identity.
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.record.identity = Some(identity.into());
        self
    }

    /// Set the correlation id.
    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.record.correlation_id = Some(correlation_id.into());
        self
    }

    /// Set the message.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.record.message = Some(message.into());
        self
    }

    /// Set the exception details.
    pub fn exception(
        mut self,
        exception_type: impl Into<String>,
        exception_message: impl Into<String>,
    ) -> Self {
        self.record.exception_type = Some(exception_type.into());
        self.record.exception_message = Some(exception_message.into());
        self
    }

    /// Set the exception stack trace or extra info.
    pub fn exception_additional_info(mut self, info: impl Into<String>) -> Self {
        self.record.exception_additional_info = Some(info.into());
        self
    }

    /// Add an additional field.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.record.additional_fields.insert(key.into(), value.into());
        self
    }

    /// Set the request URL.
    pub fn url(self, url: impl Into<String>) -> Self {
        self.field(FIELD_URL, url.into())
    }

    /// Set the HTTP status.
    pub fn http_status(self, status: u16) -> Self {
        self.field(FIELD_HTTP_STATUS, status)
    }

    /// Set the client IP.
    pub fn client_ip(self, ip: impl Into<String>) -> Self {
        self.field(FIELD_CLIENT_IP, ip.into())
    }

    /// Set the service name.
    pub fn service(self, service: impl Into<String>) -> Self {
        self.field(FIELD_SERVICE, service.into())
    }

    /// Add a performance counter sample.
    pub fn performance(mut self, counter: impl Into<String>, value: f32) -> Self {
        self.record.performance_data.insert(counter.into(), value);
        self
    }

    /// Build the record.
    pub fn build(self) -> LogRecord {
        self.record
    }
}

// ============================================================================
// Tests
// ============================================================================
