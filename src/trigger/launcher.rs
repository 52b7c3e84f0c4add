//! Job-start requests against the execution service.

use async_trait::async_trait;
use aws_sdk_glue::error::DisplayErrorContext;
use std::collections::HashMap;

use crate::error::TriggerError;

/// Starts a named job with string arguments, returning the opaque run id.
#[async_trait]
pub trait JobLauncher: Send + Sync {
    async fn start_job_run(
        &self,
        job_name: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<String, TriggerError>;
}

/// Launcher backed by the Glue job execution service.
pub struct GlueJobLauncher {
    client: aws_sdk_glue::Client,
}

impl GlueJobLauncher {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_glue::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl JobLauncher for GlueJobLauncher {
    async fn start_job_run(
        &self,
        job_name: &str,
        arguments: &HashMap<String, String>,
    ) -> Result<String, TriggerError> {
        let output = self
            .client
            .start_job_run()
            .job_name(job_name)
            .set_arguments(Some(arguments.clone()))
            .send()
            .await
            .map_err(|err| TriggerError::JobStart {
                message: DisplayErrorContext(&err).to_string(),
            })?;

        Ok(output.job_run_id().unwrap_or_default().to_string())
    }
}
