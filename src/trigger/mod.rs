//! Ingestion trigger: translates a storage-write notification into a
//! parameterized job-start request.
//!
//! The handler mirrors an HTTP-style contract: it never fails outright,
//! every error is converted into a 500-style response with the error text
//! as body.

mod event;
mod launcher;

pub use event::{EventRecord, ObjectEntity, S3Entity, StorageEvent};
pub use launcher::{GlueJobLauncher, JobLauncher};

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Serialize;
use snafu::prelude::*;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{error, info};

use crate::emit;
use crate::error::{MalformedEventSnafu, PartitionNotFoundSnafu, TriggerError};
use crate::metrics::events::{TriggerInvocation, TriggerStatus};

/// Argument key carrying the partition date to the refine job.
pub const DT_ARGUMENT: &str = "--dt";

/// Response body on a successful dispatch.
pub const SUCCESS_BODY: &str = "Job iniciado com sucesso";

static DT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"dt=(\d{4}-\d{2}-\d{2})").expect("valid dt pattern"));

/// HTTP-style response returned to the hosting runtime.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TriggerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
    #[serde(rename = "jobRunId", skip_serializing_if = "Option::is_none")]
    pub job_run_id: Option<String>,
}

impl TriggerResponse {
    fn success(job_run_id: String) -> Self {
        Self {
            status_code: 200,
            body: SUCCESS_BODY.to_string(),
            job_run_id: Some(job_run_id),
        }
    }

    fn failure(error: &TriggerError) -> Self {
        Self {
            status_code: 500,
            body: error.to_string(),
            job_run_id: None,
        }
    }
}

/// Decode a URL-encoded object key.
///
/// Matches `unquote_plus` semantics: `+` becomes a space, then percent
/// escapes (e.g. `%3D` for `=`) are resolved.
pub fn decode_key(key: &str) -> String {
    let plus_decoded = key.replace('+', " ");
    percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Extract the `dt=YYYY-MM-DD` partition date from a decoded object key.
pub fn extract_partition_date(decoded_key: &str) -> Option<&str> {
    DT_PATTERN
        .captures(decoded_key)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

/// Handle one storage-write notification.
///
/// Exactly one job-start request is issued per successfully parsed event.
/// Every failure, including a malformed payload, is caught and reported as
/// a 500-style response; the handler itself never returns an error.
pub async fn handle_event(
    event_json: &str,
    job_name: &str,
    launcher: &dyn JobLauncher,
) -> TriggerResponse {
    match process_event(event_json, job_name, launcher).await {
        Ok(job_run_id) => {
            info!(job_name, %job_run_id, "Job dispatched");
            emit!(TriggerInvocation {
                status: TriggerStatus::Success,
            });
            TriggerResponse::success(job_run_id)
        }
        Err(err) => {
            error!(error = %err, "Failed to process storage event");
            emit!(TriggerInvocation {
                status: TriggerStatus::Failure,
            });
            TriggerResponse::failure(&err)
        }
    }
}

async fn process_event(
    event_json: &str,
    job_name: &str,
    launcher: &dyn JobLauncher,
) -> Result<String, TriggerError> {
    let event: StorageEvent =
        serde_json::from_str(event_json).map_err(|err| TriggerError::MalformedEvent {
            message: err.to_string(),
        })?;

    let record = event.records.first().context(MalformedEventSnafu {
        message: "no records in event".to_string(),
    })?;

    let key = &record.s3.object.key;
    let decoded_key = decode_key(key);
    info!(%decoded_key, "Decoded object key");

    let partition_dt = extract_partition_date(&decoded_key)
        .context(PartitionNotFoundSnafu { key: key.clone() })?;

    let arguments = HashMap::from([(DT_ARGUMENT.to_string(), partition_dt.to_string())]);
    let job_run_id = launcher.start_job_run(job_name, &arguments).await?;

    info!(job_name, partition_dt, "Job run started for partition");
    Ok(job_run_id)
}
