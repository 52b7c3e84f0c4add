//! Partition-repair queries against the interactive query service.
//!
//! After an overwrite, the partition list in the catalog is stale; an
//! `MSCK REPAIR TABLE` statement rescans the table location and registers
//! the partitions found there. The job fires the statement and does not
//! wait for it to complete.

mod athena;

pub use athena::AthenaQueryService;

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::QueryError;

/// Build the partition-repair statement for a table.
pub fn repair_table(database: &str, table: &str) -> String {
    format!("MSCK REPAIR TABLE {database}.{table};")
}

/// Starts a query asynchronously, returning the execution id.
#[async_trait]
pub trait QueryService: Send + Sync {
    async fn start_query(
        &self,
        query: &str,
        database: &str,
        output_location: &str,
    ) -> Result<String, QueryError>;
}

/// One recorded query-start request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedQuery {
    pub query: String,
    pub database: String,
    pub output_location: String,
}

/// Query service that records requests instead of running them.
#[derive(Debug, Default)]
pub struct RecordingQueryService {
    queries: Mutex<Vec<RecordedQuery>>,
}

impl RecordingQueryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryService for RecordingQueryService {
    async fn start_query(
        &self,
        query: &str,
        database: &str,
        output_location: &str,
    ) -> Result<String, QueryError> {
        let mut queries = self.queries.lock().unwrap();
        queries.push(RecordedQuery {
            query: query.to_string(),
            database: database.to_string(),
            output_location: output_location.to_string(),
        });
        Ok(format!("query-{}", queries.len()))
    }
}
