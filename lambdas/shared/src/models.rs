//! Domain models for QueryBridge
//!
//! - Event: the queue payload, an ordered list of records
//! - Record: one message with a body to translate
//! - Reports: what the handler returns to the Lambda runtime

use aws_lambda_events::event::sqs::BatchItemFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Error, Result};
use crate::query::Query;

pub const NO_EVENT_MESSAGE: &str = "No event was received";

/// One queue message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, rename = "messageId", alias = "message_id")]
    pub message_id: Option<String>,
    #[serde(default, rename = "eventSourceARN", alias = "event_source_arn")]
    pub event_source_arn: Option<String>,
    /// Message payload, shape defined by the producer
    #[serde(default)]
    pub body: Value,
}

impl Record {
    /// Body as prompt input: strings verbatim, other values as compact JSON
    pub fn body_text(&self) -> Option<String> {
        match &self.body {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Payload delivered by the queue trigger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Event {
    pub records: Vec<Record>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EventShape {
    Records(Vec<Record>),
    Envelope {
        #[serde(default, rename = "Records")]
        records: Vec<Record>,
    },
}

impl Event {
    /// Accepts `null`, a bare array of records, or the SQS `{"Records": [...]}` envelope
    pub fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }

        let shape: EventShape = serde_json::from_value(value)
            .map_err(|e| Error::InvalidEvent(e.to_string()))?;

        let records = match shape {
            EventShape::Records(records) => records,
            EventShape::Envelope { records } => records,
        };

        Ok(Self { records })
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A record that could not be turned into an executed query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub record_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    pub code: String,
    pub error: String,
    /// Whether SQS should redeliver the message
    pub retryable: bool,
}

impl RecordFailure {
    pub fn new(record_index: usize, message_id: Option<String>, error: &Error) -> Self {
        Self {
            record_index,
            message_id,
            code: error.code().to_string(),
            error: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// A query that ran successfully
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedQuery {
    #[serde(flatten)]
    pub query: Query,
    /// Items returned by the statement (SELECT only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Value>,
}

/// Outcome of one handler invocation
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Number of records in the event
    pub processed: usize,
    pub executed: Vec<ExecutedQuery>,
    pub failures: Vec<RecordFailure>,
    /// Read by SQS when ReportBatchItemFailures is enabled
    #[serde(rename = "batchItemFailures")]
    pub batch_item_failures: Vec<BatchItemFailure>,
    pub completed_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn new(processed: usize, executed: Vec<ExecutedQuery>, failures: Vec<RecordFailure>) -> Self {
        let batch_item_failures = failures
            .iter()
            .filter(|f| f.retryable)
            .filter_map(|f| f.message_id.clone())
            .map(|item_identifier| BatchItemFailure { item_identifier })
            .collect();

        Self {
            processed,
            executed,
            failures,
            batch_item_failures,
            completed_at: Utc::now(),
        }
    }
}

/// Returned when the event carries no records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoEventResponse {
    pub message: String,
}

impl Default for NoEventResponse {
    fn default() -> Self {
        Self {
            message: NO_EVENT_MESSAGE.to_string(),
        }
    }
}

/// Handler response
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum HandlerResponse {
    NoEvent(NoEventResponse),
    Processed(BatchReport),
}
