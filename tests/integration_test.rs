//! End-to-end refine job tests against local storage.

use arrow::array::{Array, ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, NaiveDate};
use futures::StreamExt;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

use pregao::catalog::{MemoryCatalog, ReconcileAction};
use pregao::query::{RecordingQueryService, repair_table};
use pregao::{JobConfig, StorageProvider, run};

fn days_since_epoch(date: &str) -> i32 {
    let parsed: NaiveDate = date.parse().unwrap();
    parsed.num_days_from_ce() - 719_163
}

/// Write one raw parquet file with (Ticker, Status, Value, Date, dt) rows.
fn write_raw_fixture(path: &Path, rows: &[(&str, &str, f64, &str, &str)]) {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Ticker", DataType::Utf8, false),
        Field::new("Status", DataType::Utf8, false),
        Field::new("Value", DataType::Float64, false),
        Field::new("Date", DataType::Date32, false),
        Field::new("dt", DataType::Date32, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.0))),
        Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.1))),
        Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r.2))),
        Arc::new(Date32Array::from_iter_values(
            rows.iter().map(|r| days_since_epoch(r.3)),
        )),
        Arc::new(Date32Array::from_iter_values(
            rows.iter().map(|r| days_since_epoch(r.4)),
        )),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();

    let mut buffer = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
    writer.write(&batch).unwrap();
    writer.close().unwrap();

    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, buffer).unwrap();
}

async fn storage_for(dir: &Path) -> Arc<StorageProvider> {
    Arc::new(StorageProvider::for_url(dir.to_str().unwrap()).await.unwrap())
}

async fn list_all(storage: &StorageProvider) -> Vec<String> {
    let mut stream = storage.list(true).await.unwrap();
    let mut paths = Vec::new();
    while let Some(result) = stream.next().await {
        paths.push(result.unwrap().to_string());
    }
    paths.sort();
    paths
}

fn test_config(raw: &TempDir, refined: &TempDir) -> JobConfig {
    JobConfig {
        input_uri: raw.path().to_str().unwrap().to_string(),
        output_uri: refined.path().to_str().unwrap().to_string(),
        ..JobConfig::default()
    }
}

#[tokio::test]
async fn test_refine_job_end_to_end() {
    let raw_dir = TempDir::new().unwrap();
    let refined_dir = TempDir::new().unwrap();

    write_raw_fixture(
        &raw_dir.path().join("dt=2025-09-17/b3_stock_info.parquet"),
        &[
            ("PETR4.SA", "Close", 10.0, "2025-09-15", "2025-09-17"),
            ("PETR4.SA", "Close", 12.0, "2025-09-16", "2025-09-17"),
            ("PETR4.SA", "Close", 9.0, "2025-09-17", "2025-09-17"),
            ("PETR4.SA", "Open", 11.0, "2025-09-16", "2025-09-17"),
            ("VALE3.SA", "Close", 60.0, "2025-09-15", "2025-09-17"),
        ],
    );

    let raw_storage = storage_for(raw_dir.path()).await;
    let refined_storage = storage_for(refined_dir.path()).await;
    let config = test_config(&raw_dir, &refined_dir);
    let catalog = MemoryCatalog::new();
    let query = RecordingQueryService::new();

    let summary = run(
        &config,
        raw_storage.clone(),
        refined_storage.clone(),
        &catalog,
        &query,
        Some("2025-09-17".parse().unwrap()),
    )
    .await
    .unwrap();

    assert_eq!(summary.raw_records, 5);
    // The Open row is dropped
    assert_eq!(summary.refined_records, 4);
    assert_eq!(summary.write.files_written, 4);
    assert_eq!(summary.catalog_action, ReconcileAction::Created);

    // Hive-style layout, one file per (data_pregao, ticker) pair
    let paths = list_all(&refined_storage).await;
    assert_eq!(paths.len(), 4);
    assert!(paths[0].starts_with("data_pregao=2025-09-15/ticker=PETR4/"));
    assert!(paths[1].starts_with("data_pregao=2025-09-15/ticker=VALE3/"));
    assert!(paths[2].starts_with("data_pregao=2025-09-16/ticker=PETR4/"));
    assert!(paths[3].starts_with("data_pregao=2025-09-17/ticker=PETR4/"));

    // First trading day of PETR4: next value 12.0, +20%
    let bytes = refined_storage.get(paths[0].as_str()).await.unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .unwrap()
        .build()
        .unwrap();
    let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
    assert_eq!(batches.len(), 1);
    let batch = &batches[0];
    assert_eq!(batch.num_rows(), 1);

    let values = batch
        .column_by_name("Value")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    let next_values = batch
        .column_by_name("prox_valor")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    let percentages = batch
        .column_by_name("percentual")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(values.value(0), 10.0);
    assert_eq!(next_values.value(0), 12.0);
    assert_eq!(percentages.value(0), 20.0);

    // Last trading day has no successor
    let bytes = refined_storage.get(paths[3].as_str()).await.unwrap();
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .unwrap()
        .build()
        .unwrap();
    let batch = reader.into_iter().next().unwrap().unwrap();
    let next_values = batch
        .column_by_name("prox_valor")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert!(next_values.is_null(0));

    // Catalog registered over the refined location
    let table = catalog.table("bovespa", "b3_percentual").unwrap();
    assert_eq!(table.location, refined_storage.url());
    assert_eq!(table.partition_keys.len(), 2);

    // Partition repair dispatched to the configured results location
    let queries = query.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].query, repair_table("bovespa", "b3_percentual"));
    assert_eq!(queries[0].database, "bovespa");
    assert_eq!(queries[0].output_location, "s3://fiapb3/athena-results/");
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let raw_dir = TempDir::new().unwrap();
    let refined_dir = TempDir::new().unwrap();

    write_raw_fixture(
        &raw_dir.path().join("dt=2025-09-17/b3_stock_info.parquet"),
        &[
            ("PETR4.SA", "Close", 10.0, "2025-09-15", "2025-09-17"),
            ("PETR4.SA", "Close", 12.0, "2025-09-16", "2025-09-17"),
        ],
    );

    let raw_storage = storage_for(raw_dir.path()).await;
    let refined_storage = storage_for(refined_dir.path()).await;
    let config = test_config(&raw_dir, &refined_dir);
    let catalog = MemoryCatalog::new();
    let query = RecordingQueryService::new();

    let first = run(
        &config,
        raw_storage.clone(),
        refined_storage.clone(),
        &catalog,
        &query,
        None,
    )
    .await
    .unwrap();
    assert_eq!(first.catalog_action, ReconcileAction::Created);
    assert_eq!(first.write.files_deleted, 0);

    let second = run(
        &config,
        raw_storage.clone(),
        refined_storage.clone(),
        &catalog,
        &query,
        None,
    )
    .await
    .unwrap();

    // The rewrite replaces the previous output instead of appending
    assert_eq!(second.catalog_action, ReconcileAction::Updated);
    assert_eq!(second.write.files_deleted, 2);
    assert_eq!(list_all(&refined_storage).await.len(), 2);
    assert_eq!(query.queries().len(), 2);
}

#[tokio::test]
async fn test_scoped_run_reads_only_the_dispatched_partition() {
    let raw_dir = TempDir::new().unwrap();
    let refined_dir = TempDir::new().unwrap();

    write_raw_fixture(
        &raw_dir.path().join("dt=2025-09-16/b3_stock_info.parquet"),
        &[("PETR4.SA", "Close", 10.0, "2025-09-15", "2025-09-16")],
    );
    write_raw_fixture(
        &raw_dir.path().join("dt=2025-09-17/b3_stock_info.parquet"),
        &[("VALE3.SA", "Close", 60.0, "2025-09-16", "2025-09-17")],
    );

    let raw_storage = storage_for(raw_dir.path()).await;
    let refined_storage = storage_for(refined_dir.path()).await;
    let mut config = test_config(&raw_dir, &refined_dir);
    config.scope_input_to_dt = true;
    let catalog = MemoryCatalog::new();
    let query = RecordingQueryService::new();

    let summary = run(
        &config,
        raw_storage,
        refined_storage.clone(),
        &catalog,
        &query,
        Some("2025-09-17".parse().unwrap()),
    )
    .await
    .unwrap();

    assert_eq!(summary.raw_records, 1);
    let paths = list_all(&refined_storage).await;
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("data_pregao=2025-09-16/ticker=VALE3/"));
}

#[tokio::test]
async fn test_empty_raw_dataset_still_reconciles() {
    let raw_dir = TempDir::new().unwrap();
    let refined_dir = TempDir::new().unwrap();

    let raw_storage = storage_for(raw_dir.path()).await;
    let refined_storage = storage_for(refined_dir.path()).await;
    let config = test_config(&raw_dir, &refined_dir);
    let catalog = MemoryCatalog::new();
    let query = RecordingQueryService::new();

    let summary = run(&config, raw_storage, refined_storage, &catalog, &query, None)
        .await
        .unwrap();

    assert_eq!(summary.raw_records, 0);
    assert_eq!(summary.write.files_written, 0);
    assert!(catalog.table("bovespa", "b3_percentual").is_some());
    assert_eq!(query.queries().len(), 1);
}
