//! QueryBridge Lambda
//!
//! Triggered by SQS. Each record body is routed to a table and translated
//! into a PartiQL statement by the inference API, then executed against
//! DynamoDB.

use lambda_runtime::{run, service_fn, Error as LambdaError, LambdaEvent};
use querybridge_core::{
    init_logging, AppConfig, ChatCompletionsClient, ConnectionSettings, DynamoClient, Processor,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

async fn lambda_handler(processor: &Processor, event: LambdaEvent<Value>) -> Result<Value, LambdaError> {
    let (payload, context) = event.into_parts();

    info!(request_id = %context.request_id, "Starting execution...");
    debug!(event = %payload, "Received event");

    let response = processor.handle_event(payload).await?;

    Ok(serde_json::to_value(response)?)
}

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    let config = Arc::new(AppConfig::from_env()?);
    init_logging(&config);

    info!(
        region = %config.aws_region,
        trigger = %config.sqs_trigger,
        model = %config.ai_model,
        "Loaded configuration"
    );

    let database = DynamoClient::create_connection(&ConnectionSettings::from_config(&config)).await;
    let inference = ChatCompletionsClient::new(&config)?;
    let processor = Arc::new(Processor::new(
        Arc::clone(&config),
        Arc::new(inference),
        Arc::new(database),
    ));

    run(service_fn(move |event: LambdaEvent<Value>| {
        let processor = Arc::clone(&processor);
        async move { lambda_handler(&processor, event).await }
    }))
    .await
}
