//! QueryBridge Core Library
//!
//! Shared functionality for the QueryBridge Lambda including:
//! - Configuration
//! - Domain models
//! - AI inference client
//! - Query validation
//! - DynamoDB operations
//! - The record processing pipeline
//! - Error types

pub mod config;
pub mod models;
pub mod prompts;
pub mod inference;
pub mod query;
pub mod dynamo;
pub mod processor;
pub mod logging;
pub mod errors;

pub use config::{AppConfig, LogFormat};
pub use models::*;
pub use inference::{ChatCompletionsClient, InferenceClient};
pub use query::{Query, QueryKind};
pub use dynamo::{ConnectionSettings, Database, DynamoClient};
pub use processor::{PreparedBatch, Processor, UpdateOutcome};
pub use logging::init_logging;
pub use errors::{Error, Result};
