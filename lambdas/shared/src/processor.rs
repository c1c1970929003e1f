//! Record processing pipeline
//!
//! For every record in an event, in order:
//! 1. ask the model which table the body belongs to
//! 2. ask the model for a statement applying the body to that table
//! 3. run the statements against the database
//!
//! A failing record never stops the rest of the batch.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::dynamo::Database;
use crate::errors::{Error, Result};
use crate::inference::InferenceClient;
use crate::models::{
    BatchReport, Event, ExecutedQuery, HandlerResponse, NoEventResponse, Record, RecordFailure,
};
use crate::prompts::render;
use crate::query::{prepare_statement, Query};

/// Queries prepared from an event, plus the records that could not be prepared
#[derive(Debug, Default)]
pub struct PreparedBatch {
    pub queries: Vec<Query>,
    pub failures: Vec<RecordFailure>,
}

/// Result of running prepared queries
#[derive(Debug, Default)]
pub struct UpdateOutcome {
    pub executed: Vec<ExecutedQuery>,
    pub failures: Vec<RecordFailure>,
}

pub struct Processor {
    config: Arc<AppConfig>,
    inference: Arc<dyn InferenceClient>,
    database: Arc<dyn Database>,
}

impl Processor {
    pub fn new(
        config: Arc<AppConfig>,
        inference: Arc<dyn InferenceClient>,
        database: Arc<dyn Database>,
    ) -> Self {
        Self {
            config,
            inference,
            database,
        }
    }

    /// Run the whole pipeline for one Lambda payload
    pub async fn handle_event(&self, payload: Value) -> Result<HandlerResponse> {
        let event = Event::from_value(payload)?;

        if event.is_empty() {
            info!("No records in event");
            return Ok(HandlerResponse::NoEvent(NoEventResponse::default()));
        }

        info!(record_count = event.records.len(), "Processing SQS batch");

        let prepared = self.process_data(&event).await?;
        let outcome = self.update_db(&prepared.queries).await;

        let mut failures = prepared.failures;
        failures.extend(outcome.failures);
        failures.sort_by_key(|f| f.record_index);

        let report = BatchReport::new(event.records.len(), outcome.executed, failures);

        info!(
            processed = report.processed,
            executed = report.executed.len(),
            failed = report.failures.len(),
            redeliver = report.batch_item_failures.len(),
            "Batch complete"
        );

        Ok(HandlerResponse::Processed(report))
    }

    /// Turn every record into a query
    ///
    /// Fails as a whole only when the candidate tables cannot be determined.
    pub async fn process_data(&self, event: &Event) -> Result<PreparedBatch> {
        let tables = self.candidate_tables().await?;
        let mut batch = PreparedBatch::default();

        for (index, record) in event.records.iter().enumerate() {
            match self.prepare_record(index, record, &tables).await {
                Ok(query) => {
                    debug!(
                        record_index = index,
                        table_name = %query.table_name,
                        kind = %query.kind,
                        "Prepared query"
                    );
                    batch.queries.push(query);
                }
                Err(e) => {
                    warn!(record_index = index, error = %e, "Failed to prepare record");
                    batch
                        .failures
                        .push(RecordFailure::new(index, record.message_id.clone(), &e));
                }
            }
        }

        Ok(batch)
    }

    async fn prepare_record(&self, index: usize, record: &Record, tables: &[String]) -> Result<Query> {
        if let Some(arn) = &record.event_source_arn {
            if !self.config.accepts_source(arn) {
                return Err(Error::UnexpectedSource(arn.clone()));
            }
        }

        let body = record.body_text().ok_or(Error::MissingBody(index))?;
        let table_name = self.select_table_name(&body, tables).await?;
        let mut query = self.create_query(&body, &table_name).await?;
        query.record_index = index;
        query.message_id = record.message_id.clone();

        Ok(query)
    }

    /// Tables the model may choose from
    pub async fn candidate_tables(&self) -> Result<Vec<String>> {
        let tables = if self.config.db_tables.is_empty() {
            self.database.list_tables().await?
        } else {
            self.config.db_tables.clone()
        };

        if tables.is_empty() {
            return Err(Error::NoTables);
        }

        Ok(tables)
    }

    /// Ask the model which of `tables` the body belongs to
    pub async fn select_table_name(&self, body: &str, tables: &[String]) -> Result<String> {
        let listing = tables.join(", ");
        let prompt = render(&self.config.prompt_select_table, &[("tables", listing.as_str())]);
        let answer = self.inference.complete(&prompt, body).await?;

        match_table(&answer, tables).ok_or(Error::UnknownTable(answer))
    }

    /// Ask the model for a statement applying the body to `table_name`
    ///
    /// The returned query is not yet bound to a record.
    pub async fn create_query(&self, body: &str, table_name: &str) -> Result<Query> {
        let prompt = render(&self.config.prompt_create_query, &[("table_name", table_name)]);
        let answer = self.inference.complete(&prompt, body).await?;
        let (statement, kind) =
            prepare_statement(&answer, table_name, &self.config.allowed_statements)?;

        Ok(Query {
            message_id: None,
            record_index: 0,
            table_name: table_name.to_string(),
            statement,
            kind,
        })
    }

    /// Execute queries in order; a failing query does not stop the rest
    pub async fn update_db(&self, queries: &[Query]) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();

        for query in queries {
            match self.database.execute(query).await {
                Ok(items) => {
                    info!(
                        record_index = query.record_index,
                        table_name = %query.table_name,
                        kind = %query.kind,
                        items = items.len(),
                        "Executed query"
                    );
                    outcome.executed.push(ExecutedQuery {
                        query: query.clone(),
                        items,
                    });
                }
                Err(e) => {
                    error!(
                        record_index = query.record_index,
                        table_name = %query.table_name,
                        error = %e,
                        "Failed to execute query"
                    );
                    outcome.failures.push(RecordFailure::new(
                        query.record_index,
                        query.message_id.clone(),
                        &e,
                    ));
                }
            }
        }

        outcome
    }
}

/// Resolve a model answer to one of the candidate table names
fn match_table(answer: &str, tables: &[String]) -> Option<String> {
    let cleaned = answer
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '.'))
        .trim();

    tables
        .iter()
        .find(|t| t.as_str() == cleaned)
        .or_else(|| tables.iter().find(|t| t.eq_ignore_ascii_case(cleaned)))
        .cloned()
}
