//! Process-wide configuration
//!
//! Read once from the environment when the Lambda starts and never mutated
//! afterwards.

use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::prompts::{DEFAULT_CREATE_QUERY_PROMPT, DEFAULT_SELECT_TABLE_PROMPT};
use crate::query::QueryKind;

const DEFAULT_LOG_LEVEL: u8 = 10;
const DEFAULT_AI_API_URL: &str = "https://api.openai.com/v1";
const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 30;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(Error::Config(format!("unknown LOG_FORMAT: {}", other))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Numeric level, 10 = debug, 20 = info, 30 = warning, 40 = error
    pub log_level: u8,
    pub log_format: LogFormat,
    pub aws_region: String,
    /// Queue name or ARN of the SQS trigger
    pub sqs_trigger: String,
    pub ai_api_url: String,
    pub ai_api_key: Option<String>,
    pub ai_model: String,
    pub ai_timeout_secs: u64,
    pub prompt_select_table: String,
    pub prompt_create_query: String,
    /// Candidate tables; empty means discover them with ListTables
    pub db_tables: Vec<String>,
    /// Endpoint override, e.g. DynamoDB Local
    pub db_endpoint: Option<String>,
    pub allowed_statements: Vec<QueryKind>,
}

impl AppConfig {
    /// Load configuration from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| {
            get(key).ok_or_else(|| Error::Config(format!("{} is required", key)))
        };

        let log_level = match get("LOG_LEVEL") {
            Some(v) => v
                .parse::<u8>()
                .map_err(|_| Error::Config(format!("LOG_LEVEL must be numeric, got {}", v)))?,
            None => DEFAULT_LOG_LEVEL,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(v) => v.parse()?,
            None => LogFormat::default(),
        };

        let ai_timeout_secs = match get("AI_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>().map_err(|_| {
                Error::Config(format!("AI_TIMEOUT_SECS must be numeric, got {}", v))
            })?,
            None => DEFAULT_AI_TIMEOUT_SECS,
        };

        let allowed_statements = match get("ALLOWED_STATEMENTS") {
            Some(v) => split_list(&v)
                .iter()
                .map(|kind| {
                    kind.parse::<QueryKind>().map_err(|_| {
                        Error::Config(format!("unknown statement kind in ALLOWED_STATEMENTS: {}", kind))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            None => QueryKind::ALL.to_vec(),
        };

        Ok(Self {
            log_level,
            log_format,
            aws_region: require("AWS_REGION")?,
            sqs_trigger: require("SQS_TRIGGER")?,
            ai_api_url: get("AI_API_URL")
                .unwrap_or_else(|| DEFAULT_AI_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            ai_api_key: get("AI_API_KEY"),
            ai_model: get("AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
            ai_timeout_secs,
            prompt_select_table: get("PROMPT_SELECT_TABLE")
                .unwrap_or_else(|| DEFAULT_SELECT_TABLE_PROMPT.to_string()),
            prompt_create_query: get("PROMPT_CREATE_QUERY")
                .unwrap_or_else(|| DEFAULT_CREATE_QUERY_PROMPT.to_string()),
            db_tables: get("DB_TABLES").map(|v| split_list(&v)).unwrap_or_default(),
            db_endpoint: get("DB_ENDPOINT"),
            allowed_statements,
        })
    }

    /// Map the numeric log level onto a tracing level
    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level {
            0..=9 => tracing::Level::TRACE,
            10..=19 => tracing::Level::DEBUG,
            20..=29 => tracing::Level::INFO,
            30..=39 => tracing::Level::WARN,
            _ => tracing::Level::ERROR,
        }
    }

    /// Whether a record's `eventSourceARN` belongs to the configured trigger
    pub fn accepts_source(&self, event_source_arn: &str) -> bool {
        event_source_arn == self.sqs_trigger
            || event_source_arn.ends_with(&format!(":{}", self.sqs_trigger))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
