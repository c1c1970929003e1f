//! DynamoDB access for QueryBridge
//!
//! Generated queries are PartiQL statements run through `ExecuteStatement`.
//! Candidate tables can be discovered with `ListTables` when none are
//! configured.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::Client;
use serde_dynamo::from_items;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::errors::{Error, Result};
use crate::query::Query;

/// Database seam used by the processor
#[async_trait]
pub trait Database: Send + Sync {
    /// Names of the tables queries may target
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Run one statement, returning any items it produced
    async fn execute(&self, query: &Query) -> Result<Vec<Value>>;
}

/// Where and how to reach DynamoDB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub region: String,
    /// Explicit endpoint, e.g. `http://localhost:8000` for DynamoDB Local
    pub endpoint: Option<String>,
}

impl ConnectionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            region: config.aws_region.clone(),
            endpoint: config.db_endpoint.clone(),
        }
    }

    /// Effective endpoint URL for this connection
    pub fn create_conn_string(&self) -> String {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }

        let suffix = if self.region.starts_with("cn-") {
            "amazonaws.com.cn"
        } else {
            "amazonaws.com"
        };
        format!("https://dynamodb.{}.{}", self.region, suffix)
    }
}

/// DynamoDB client for QueryBridge operations
pub struct DynamoClient {
    client: Client,
    /// Items per ExecuteStatement page; None leaves the 1 MB service limit
    page_size: Option<i32>,
}

impl DynamoClient {
    /// Wrap an existing SDK client
    pub fn new(client: Client) -> Self {
        Self {
            client,
            page_size: None,
        }
    }

    /// Cap the number of items ExecuteStatement returns per page
    pub fn with_page_size(mut self, page_size: i32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Build an SDK client for the given settings
    pub async fn create_connection(settings: &ConnectionSettings) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&shared);
        if settings.endpoint.is_some() {
            builder = builder.endpoint_url(settings.create_conn_string());
        }

        info!(
            region = %settings.region,
            endpoint = %settings.create_conn_string(),
            "Created DynamoDB connection"
        );

        Self::new(Client::from_conf(builder.build()))
    }

    /// Access the underlying SDK client
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Database for DynamoClient {
    async fn list_tables(&self) -> Result<Vec<String>> {
        let tables = collect_pages(|start| {
            let request = self
                .client
                .list_tables()
                .set_exclusive_start_table_name(start);
            async move {
                let result = request
                    .send()
                    .await
                    .map_err(|e| Error::Database(e.to_string()))?;
                Ok((
                    result.table_names.unwrap_or_default(),
                    result.last_evaluated_table_name,
                ))
            }
        })
        .await?;

        debug!(count = tables.len(), "Listed DynamoDB tables");

        Ok(tables)
    }

    async fn execute(&self, query: &Query) -> Result<Vec<Value>> {
        let items = collect_pages(|next_token| {
            let request = self
                .client
                .execute_statement()
                .statement(&query.statement)
                .set_next_token(next_token)
                .set_limit(self.page_size);
            async move {
                let result = request
                    .send()
                    .await
                    .map_err(|e| Error::Database(e.to_string()))?;
                Ok((result.items.unwrap_or_default(), result.next_token))
            }
        })
        .await?;

        from_items(items).map_err(|e| Error::DynamoSerialization(e.to_string()))
    }
}

/// Fetch pages until no continuation token is returned
async fn collect_pages<T, F, Fut>(mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>)>>,
{
    let mut collected = Vec::new();
    let mut token: Option<String> = None;

    loop {
        let (page, next) = fetch(token.take()).await?;
        collected.extend(page);

        match next {
            Some(next) => token = Some(next),
            None => break,
        }
    }

    Ok(collected)
}
