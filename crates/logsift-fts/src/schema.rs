//! Tantivy schema definition for log records.
//!
//! # Schema Fields
//!
//! ## Identity
//! - `id`: Unique record key (STRING | STORED), used for replace/delete
//!
//! ## Analyzed fields (`dotted` tokenizer, positions for phrase queries)
//! - `logger_name`, `process_name`, `identity`
//! - `message`, `exception_type`, `exception_message`, `exception_additional_info`
//! - `url`, `service` (promoted from additional fields)
//!
//! ## Exact-match fields (raw STRING terms)
//! - `log_level`, `server`, `application_path`, `correlation_id`
//! - `http_status`, `client_ip` (promoted from additional fields)
//!
//! ## Numeric fields
//! - `time_utc`: milliseconds since the epoch (INDEXED | FAST | STORED),
//!   used for sorting and range filters
//! - `process_id`, `thread_id` (INDEXED | STORED)
//!
//! ## Stored-only JSON
//! - `additional_fields`, `performance_data`
//!
//! # Tokenizer
//!
//! The `dotted` analyzer splits on every character that is not a letter or
//! digit, lower-cases and folds to ASCII:
//! `Shop.Orders.Checkout` → `shop`, `orders`, `checkout`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use logsift_core::{Error, Result};
use tantivy::schema::{
    FAST, Field, INDEXED, IndexRecordOption, STORED, STRING, Schema, SchemaBuilder,
    TextFieldIndexing, TextOptions, Value,
};
use tantivy::tokenizer::{AsciiFoldingFilter, LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::{Index, TantivyDocument};

use crate::document::{FIELD_CLIENT_IP, FIELD_HTTP_STATUS, FIELD_SERVICE, FIELD_URL, LogRecord};

/// Name under which the dotted-name analyzer is registered.
pub const DOTTED_TOKENIZER: &str = "dotted";

/// Name of the timestamp fast field.
pub const TIME_FIELD: &str = crate::backend::SORT_FIELD;

/// Everything the search engine needs to know to open an index.
pub trait IndexLayout: Send + Sync {
    /// Schema used when the index has to be created.
    fn schema(&self) -> Schema;

    /// Register custom tokenizers with an opened index.
    ///
    /// Called before any writer or query parser touches the index.
    fn register_tokenizers(&self, index: &Index);
}

/// Log schema holding field references and the Tantivy schema.
#[derive(Clone)]
pub struct LogSchema {
    schema: Schema,

    /// Unique record key.
    pub id: Field,

    /// Logger name.
    pub logger_name: Field,
    /// Level.
    pub log_level: Field,
    /// Timestamp in milliseconds.
    pub time_utc: Field,
    /// Process id.
    pub process_id: Field,
    /// Process name.
    pub process_name: Field,
    /// Thread id.
    pub thread_id: Field,
    /// Host.
    pub server: Field,
    /// Application path.
    pub application_path: Field,
    /// Identity.
    pub identity: Field,
    /// Correlation id.
    pub correlation_id: Field,

    /// Message.
    pub message: Field,
    /// Exception type.
    pub exception_type: Field,
    /// Exception message.
    pub exception_message: Field,
    /// Exception details.
    pub exception_additional_info: Field,

    /// Request URL.
    pub url: Field,
    /// HTTP status.
    pub http_status: Field,
    /// Client IP.
    pub client_ip: Field,
    /// Service name.
    pub service: Field,

    /// All additional fields as JSON.
    pub additional_fields: Field,
    /// Performance samples as JSON.
    pub performance_data: Field,
}

impl LogSchema {
    /// Build the log schema.
    pub fn build() -> Self {
        let mut builder = SchemaBuilder::new();

        let analyzed = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer(DOTTED_TOKENIZER)
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();

        let id = builder.add_text_field("id", STRING | STORED);

        let logger_name = builder.add_text_field("logger_name", analyzed.clone());
        let log_level = builder.add_text_field("log_level", STRING | STORED);
        let time_utc = builder.add_i64_field(TIME_FIELD, INDEXED | FAST | STORED);
        let process_id = builder.add_i64_field("process_id", INDEXED | STORED);
        let process_name = builder.add_text_field("process_name", analyzed.clone());
        let thread_id = builder.add_i64_field("thread_id", INDEXED | STORED);
        let server = builder.add_text_field("server", STRING | STORED);
        let application_path = builder.add_text_field("application_path", STRING | STORED);
        let identity = builder.add_text_field("identity", analyzed.clone());
        let correlation_id = builder.add_text_field("correlation_id", STRING | STORED);

        let message = builder.add_text_field("message", analyzed.clone());
        let exception_type = builder.add_text_field("exception_type", analyzed.clone());
        let exception_message = builder.add_text_field("exception_message", analyzed.clone());
        let exception_additional_info =
            builder.add_text_field("exception_additional_info", analyzed.clone());

        let url = builder.add_text_field(FIELD_URL, analyzed.clone());
        let http_status = builder.add_text_field(FIELD_HTTP_STATUS, STRING | STORED);
        let client_ip = builder.add_text_field(FIELD_CLIENT_IP, STRING | STORED);
        let service = builder.add_text_field(FIELD_SERVICE, analyzed);

        let additional_fields = builder.add_text_field("additional_fields", STORED);
        let performance_data = builder.add_text_field("performance_data", STORED);

        Self {
            schema: builder.build(),
            id,
            logger_name,
            log_level,
            time_utc,
            process_id,
            process_name,
            thread_id,
            server,
            application_path,
            identity,
            correlation_id,
            message,
            exception_type,
            exception_message,
            exception_additional_info,
            url,
            http_status,
            client_ip,
            service,
            additional_fields,
            performance_data,
        }
    }

    /// Get the underlying Tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Build the dotted-name analyzer.
    pub fn dotted_analyzer() -> TextAnalyzer {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(AsciiFoldingFilter)
            .build()
    }

    /// Fields searched by free text, with their boosts.
    pub fn free_text_fields(&self) -> Vec<(Field, f32)> {
        vec![
            (self.message, 2.0),
            (self.exception_type, 1.5),
            (self.exception_message, 1.5),
            (self.exception_additional_info, 1.0),
            (self.logger_name, 1.0),
            (self.url, 1.0),
            (self.service, 1.0),
            (self.identity, 1.0),
            (self.process_name, 1.0),
        ]
    }

    /// Convert a record into an index document.
    ///
    /// The record must already have an id.
    pub fn to_document(&self, record: &LogRecord) -> Result<TantivyDocument> {
        if record.id.is_empty() {
            return Err(Error::invalid_argument("record.id", "must not be empty"));
        }

        let mut doc = TantivyDocument::new();

        doc.add_text(self.id, &record.id);
        doc.add_text(self.logger_name, &record.logger_name);
        doc.add_text(self.log_level, &record.log_level);
        doc.add_i64(self.time_utc, record.time_utc.timestamp_millis());

        if let Some(pid) = record.process_id {
            doc.add_i64(self.process_id, pid);
        }
        if let Some(tid) = record.thread_id {
            doc.add_i64(self.thread_id, tid);
        }

        let optional_text = [
            (self.process_name, &record.process_name),
            (self.server, &record.server),
            (self.application_path, &record.application_path),
            (self.identity, &record.identity),
            (self.correlation_id, &record.correlation_id),
            (self.message, &record.message),
            (self.exception_type, &record.exception_type),
            (self.exception_message, &record.exception_message),
            (
                self.exception_additional_info,
                &record.exception_additional_info,
            ),
        ];
        for (field, value) in optional_text {
            if let Some(value) = value {
                doc.add_text(field, value);
            }
        }

        // Promoted additional fields
        if let Some(url) = record.url() {
            doc.add_text(self.url, url);
        }
        if let Some(status) = record.http_status() {
            doc.add_text(self.http_status, status);
        }
        if let Some(ip) = record.client_ip() {
            doc.add_text(self.client_ip, ip);
        }
        if let Some(service) = record.service() {
            doc.add_text(self.service, service);
        }

        if !record.additional_fields.is_empty() {
            doc.add_text(
                self.additional_fields,
                serde_json::to_string(&record.additional_fields)?,
            );
        }
        if !record.performance_data.is_empty() {
            doc.add_text(
                self.performance_data,
                serde_json::to_string(&record.performance_data)?,
            );
        }

        Ok(doc)
    }

    /// Decode a stored index document back into a record.
    pub fn from_document(&self, doc: &TantivyDocument) -> Result<LogRecord> {
        let id = stored_text(doc, self.id)
            .ok_or_else(|| Error::operation("stored document has no id"))?;
        let millis = stored_i64(doc, self.time_utc)
            .ok_or_else(|| Error::operation(format!("stored document {id} has no time_utc")))?;
        let time_utc = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            Error::operation(format!("stored document {id} has invalid time_utc {millis}"))
        })?;

        let additional_fields = match stored_text(doc, self.additional_fields) {
            Some(json) => serde_json::from_str(&json)?,
            None => BTreeMap::new(),
        };
        let performance_data = match stored_text(doc, self.performance_data) {
            Some(json) => serde_json::from_str(&json)?,
            None => BTreeMap::new(),
        };

        Ok(LogRecord {
            id,
            logger_name: stored_text(doc, self.logger_name).unwrap_or_default(),
            log_level: stored_text(doc, self.log_level).unwrap_or_default(),
            time_utc,
            process_id: stored_i64(doc, self.process_id),
            process_name: stored_text(doc, self.process_name),
            thread_id: stored_i64(doc, self.thread_id),
            server: stored_text(doc, self.server),
            application_path: stored_text(doc, self.application_path),
            identity: stored_text(doc, self.identity),
            correlation_id: stored_text(doc, self.correlation_id),
            message: stored_text(doc, self.message),
            exception_type: stored_text(doc, self.exception_type),
            exception_message: stored_text(doc, self.exception_message),
            exception_additional_info: stored_text(doc, self.exception_additional_info),
            additional_fields,
            performance_data,
        })
    }
}

impl IndexLayout for LogSchema {
    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    fn register_tokenizers(&self, index: &Index) {
        index
            .tokenizers()
            .register(DOTTED_TOKENIZER, Self::dotted_analyzer());
    }
}

impl Default for LogSchema {
    fn default() -> Self {
        Self::build()
    }
}

impl std::fmt::Debug for LogSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogSchema")
            .field("field_count", &self.schema.fields().count())
            .finish()
    }
}

fn stored_text(doc: &TantivyDocument, field: Field) -> Option<String> {
    doc.get_first(field)
        .and_then(|value| value.as_str())
        .map(str::to_string)
}

fn stored_i64(doc: &TantivyDocument, field: Field) -> Option<i64> {
    doc.get_first(field).and_then(|value| value.as_i64())
}

// ============================================================================
// Tests
// ============================================================================
