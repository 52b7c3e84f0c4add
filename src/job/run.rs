//! The refine job: read raw, transform, overwrite refined, reconcile the
//! catalog, repair partitions.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::catalog::{Catalog, ReconcileAction, TableSpec, reconcile};
use crate::config::JobConfig;
use crate::emit;
use crate::error::JobError;
use crate::metrics::events::{
    CatalogReconciled, RawRecordsRead, RecordsRefined, RepairQueryStarted,
};
use crate::query::{QueryService, repair_table};
use crate::sink::{PartitionedWriter, WriteSummary};
use crate::source::read_raw_dataset;
use crate::storage::StorageProviderRef;
use crate::transform::{TRADE_DATE_FORMAT, refine};

/// Outcome of one refine job run.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub raw_records: usize,
    pub refined_records: usize,
    pub write: WriteSummary,
    pub catalog_action: ReconcileAction,
    pub query_execution_id: String,
}

/// Run the refine job end to end.
///
/// `dt` is the ingestion partition the trigger dispatched for. It scopes
/// the raw listing only when `scope_input_to_dt` is set; otherwise the
/// whole raw dataset is re-read and the refined output fully rewritten,
/// which keeps reruns idempotent.
pub async fn run(
    config: &JobConfig,
    raw_storage: StorageProviderRef,
    refined_storage: StorageProviderRef,
    catalog: &dyn Catalog,
    query: &dyn QueryService,
    dt: Option<NaiveDate>,
) -> Result<JobSummary, JobError> {
    let prefix = match (config.scope_input_to_dt, dt) {
        (true, Some(date)) => Some(format!("dt={}", date.format(TRADE_DATE_FORMAT))),
        (true, None) => {
            warn!("scope_input_to_dt is set but no dt was provided; reading the full raw dataset");
            None
        }
        (false, _) => None,
    };

    info!(
        input = raw_storage.url(),
        prefix = prefix.as_deref().unwrap_or("<all>"),
        "Reading raw dataset"
    );
    let raw_records = read_raw_dataset(&raw_storage, prefix.as_deref()).await?;
    let raw_count = raw_records.len();
    emit!(RawRecordsRead {
        count: raw_count as u64,
    });
    info!(count = raw_count, "Raw records read");

    let refined_records = refine(raw_records);
    emit!(RecordsRefined {
        count: refined_records.len() as u64,
    });
    info!(count = refined_records.len(), "Records refined");

    let writer = PartitionedWriter::new(refined_storage.clone());
    let write = writer.overwrite(&refined_records).await?;
    info!(
        output = refined_storage.url(),
        files = write.files_written,
        partitions = write.partitions,
        "Refined dataset written"
    );

    let spec = TableSpec::refined(&config.table, refined_storage.url());
    let catalog_action = reconcile(catalog, &config.database, &spec).await?;
    emit!(CatalogReconciled {
        action: catalog_action.as_str(),
    });

    let statement = repair_table(&config.database, &config.table);
    let query_execution_id = query
        .start_query(&statement, &config.database, &config.query_results_uri)
        .await?;
    emit!(RepairQueryStarted);
    info!(%query_execution_id, "Partition repair started");

    Ok(JobSummary {
        raw_records: raw_count,
        refined_records: refined_records.len(),
        write,
        catalog_action,
        query_execution_id,
    })
}
