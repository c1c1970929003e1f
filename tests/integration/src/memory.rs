//! In-memory database that records executed statements

use async_trait::async_trait;
use querybridge_core::{Database, Error, Query, QueryKind, Result};
use serde_json::{json, Value};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingDatabase {
    tables: Vec<String>,
    failing_tables: Vec<String>,
    executed: Mutex<Vec<Query>>,
}

impl RecordingDatabase {
    pub fn with_tables(tables: &[&str]) -> Self {
        Self {
            tables: tables.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Make every statement against `table` fail with a database error
    pub fn failing_on(mut self, table: &str) -> Self {
        self.failing_tables.push(table.to_string());
        self
    }

    /// Statements executed so far, in order
    pub fn executed(&self) -> Vec<Query> {
        self.executed.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl Database for RecordingDatabase {
    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.clone())
    }

    async fn execute(&self, query: &Query) -> Result<Vec<Value>> {
        if self.failing_tables.contains(&query.table_name) {
            return Err(Error::Database(format!(
                "ProvisionedThroughputExceededException on {}",
                query.table_name
            )));
        }

        self.executed.lock().expect("lock poisoned").push(query.clone());

        match query.kind {
            QueryKind::Select => Ok(vec![json!({"table": query.table_name})]),
            _ => Ok(Vec::new()),
        }
    }
}
