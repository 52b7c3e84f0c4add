//! Athena backend for partition-repair queries.

use async_trait::async_trait;
use aws_sdk_athena::error::DisplayErrorContext;
use aws_sdk_athena::types::{QueryExecutionContext, ResultConfiguration};

use super::QueryService;
use crate::error::QueryError;

/// Query service backed by Athena.
pub struct AthenaQueryService {
    client: aws_sdk_athena::Client,
}

impl AthenaQueryService {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_athena::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl QueryService for AthenaQueryService {
    async fn start_query(
        &self,
        query: &str,
        database: &str,
        output_location: &str,
    ) -> Result<String, QueryError> {
        let context = QueryExecutionContext::builder().database(database).build();
        let results = ResultConfiguration::builder()
            .output_location(output_location)
            .build();

        let output = self
            .client
            .start_query_execution()
            .query_string(query)
            .query_execution_context(context)
            .result_configuration(results)
            .send()
            .await
            .map_err(|err| QueryError::QueryStart {
                message: DisplayErrorContext(&err).to_string(),
            })?;

        Ok(output.query_execution_id().unwrap_or_default().to_string())
    }
}
