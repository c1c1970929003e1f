//! Tracing subscriber setup for the Lambda binary

use crate::config::{AppConfig, LogFormat};

/// Install the global subscriber using the configured level and format
pub fn init_logging(config: &AppConfig) {
    let builder = tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .with_target(false)
        .without_time();

    match config.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
