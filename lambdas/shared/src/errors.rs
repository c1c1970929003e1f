//! Error types for QueryBridge

use thiserror::Error;

/// Result type alias using QueryBridge Error
pub type Result<T> = std::result::Result<T, Error>;

/// QueryBridge error types
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Event payload could not be interpreted
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Record carries no body
    #[error("Record {0} has no body")]
    MissingBody(usize),

    /// Record was delivered by a queue other than the configured trigger
    #[error("Unexpected event source: {0}")]
    UnexpectedSource(String),

    /// Inference API transport or HTTP error
    #[error("Inference API error: {0}")]
    Inference(String),

    /// HTTP client for the inference API could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Inference API answered with something unusable
    #[error("Invalid inference response: {0}")]
    InferenceResponse(String),

    /// Model picked a table that is not a candidate
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// No candidate tables available
    #[error("No tables available for selection")]
    NoTables,

    /// Generated statement failed validation
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Generated statement kind is not allowed
    #[error("Statement not allowed: {0}")]
    StatementNotAllowed(String),

    /// DynamoDB error
    #[error("Database error: {0}")]
    Database(String),

    /// JSON Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// DynamoDB serialization error
    #[error("DynamoDB serialization error: {0}")]
    DynamoSerialization(String),
}

impl Error {
    /// Returns the error code used in batch reports
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::InvalidEvent(_) => "invalid_event",
            Error::MissingBody(_) => "missing_body",
            Error::UnexpectedSource(_) => "unexpected_source",
            Error::Inference(_) => "inference_error",
            Error::HttpClient(_) => "http_client_error",
            Error::InferenceResponse(_) => "invalid_inference_response",
            Error::UnknownTable(_) => "unknown_table",
            Error::NoTables => "no_tables",
            Error::InvalidQuery(_) => "invalid_query",
            Error::StatementNotAllowed(_) => "statement_not_allowed",
            Error::Database(_) => "database_error",
            Error::Serialization(_) => "serialization_error",
            Error::DynamoSerialization(_) => "serialization_error",
        }
    }

    /// Whether redelivering the message could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Inference(_) | Error::Database(_) | Error::NoTables)
    }
}
