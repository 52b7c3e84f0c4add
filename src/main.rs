use aws_config::BehaviorVersion;
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;

use pregao::catalog::GlueCatalog;
use pregao::job::{JobRun, JobSummary, RunStatus};
use pregao::query::AthenaQueryService;
use pregao::{JobConfig, JobError, StorageProvider, init_tracing};

/// Refine the raw B3 dataset into the partitioned percentage-change table.
#[derive(Debug, Parser)]
#[command(name = "pregao", version)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Ingestion partition date (YYYY-MM-DD) passed by the trigger.
    #[arg(long)]
    dt: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match JobConfig::from_file(&path.to_string_lossy()) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Configuration error: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => JobConfig::default(),
    };

    let run = JobRun::init(&config.job_name);
    match run_job(&config, cli.dt).await {
        Ok(summary) => {
            info!(
                raw = summary.raw_records,
                refined = summary.refined_records,
                files = summary.write.files_written,
                query_execution_id = %summary.query_execution_id,
                "Refine job complete"
            );
            run.commit(RunStatus::Succeeded);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{err}");
            run.commit(RunStatus::Failed);
            ExitCode::FAILURE
        }
    }
}

async fn run_job(config: &JobConfig, dt: Option<NaiveDate>) -> Result<JobSummary, JobError> {
    let raw_storage = Arc::new(
        StorageProvider::for_url_with_options(&config.input_uri, config.storage_options.clone())
            .await?,
    );
    let refined_storage = Arc::new(
        StorageProvider::for_url_with_options(&config.output_uri, config.storage_options.clone())
            .await?,
    );

    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let catalog = GlueCatalog::new(&sdk_config);
    let query = AthenaQueryService::new(&sdk_config);

    pregao::run(config, raw_storage, refined_storage, &catalog, &query, dt).await
}
