//! Parquet decoding for the raw exchange dataset.
//!
//! The raw files carry `Ticker`, `Status`, `Value` and `Date` columns plus a
//! `dt` ingestion partition. Upstream writers disagree on date encodings, so
//! `Date` and `dt` are accepted as date32, timestamps of any unit, or
//! `yyyy-MM-dd` strings. When `dt` is absent from the file schema it is
//! recovered from the `dt=` segment of the file path.

use arrow::array::{
    Array, ArrayRef, Date32Array, Float64Array, StringArray, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray,
};
use arrow::datatypes::{DataType, TimeUnit};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate};
use futures::StreamExt;
use object_store::path::Path;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use snafu::prelude::*;
use tracing::{debug, warn};

use crate::error::{
    ColumnTypeSnafu, InvalidDateSnafu, ListSnafu, MissingColumnSnafu, MissingPartitionSnafu,
    ObjectStoreSnafu, ParquetDecodeSnafu, ReadFileSnafu, SourceError,
};
use crate::storage::StorageProvider;
use crate::transform::{RawRecord, TRADE_DATE_FORMAT};

const TICKER_COLUMN: &str = "Ticker";
const STATUS_COLUMN: &str = "Status";
const VALUE_COLUMN: &str = "Value";
const DATE_COLUMN: &str = "Date";
const DT_COLUMN: &str = "dt";

/// List the parquet files under the raw location, sorted by path.
///
/// With a prefix (e.g. `dt=2025-09-17`) only that partition is listed.
pub async fn list_parquet_files(
    storage: &StorageProvider,
    prefix: Option<&str>,
) -> Result<Vec<Path>, SourceError> {
    let mut paths = Vec::new();

    match prefix {
        Some(prefix) => {
            let mut stream = storage.list_with_prefix(prefix).await.context(ListSnafu)?;
            while let Some(result) = stream.next().await {
                paths.push(result.context(ObjectStoreSnafu).context(ListSnafu)?);
            }
        }
        None => {
            let mut stream = storage.list(true).await.context(ListSnafu)?;
            while let Some(result) = stream.next().await {
                paths.push(result.context(ObjectStoreSnafu).context(ListSnafu)?);
            }
        }
    }

    paths.retain(|path| path.extension() == Some("parquet"));
    paths.sort_unstable();
    Ok(paths)
}

/// Read every raw record under the raw location.
pub async fn read_raw_dataset(
    storage: &StorageProvider,
    prefix: Option<&str>,
) -> Result<Vec<RawRecord>, SourceError> {
    let paths = list_parquet_files(storage, prefix).await?;
    if paths.is_empty() {
        warn!(url = storage.url(), "No parquet files found under raw location");
    }

    let mut records = Vec::new();
    for path in &paths {
        let bytes = storage.get(path.clone()).await.context(ReadFileSnafu {
            path: path.to_string(),
        })?;
        let file_records = read_raw_records(bytes, path.as_ref())?;
        debug!(path = %path, count = file_records.len(), "Decoded raw file");
        records.extend(file_records);
    }
    Ok(records)
}

/// Decode one parquet file into raw records.
///
/// Rows with a null in any required column are skipped.
pub fn read_raw_records(bytes: Bytes, path: &str) -> Result<Vec<RawRecord>, SourceError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(bytes)
        .context(ParquetDecodeSnafu { path })?
        .build()
        .context(ParquetDecodeSnafu { path })?;

    let path_dt = partition_date_from_path(path);

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch.map_err(|err| SourceError::ParquetDecode {
            path: path.to_string(),
            source: parquet::errors::ParquetError::External(Box::new(err)),
        })?;
        decode_batch(&batch, path, path_dt, &mut records)?;
    }
    Ok(records)
}

/// Recover the ingestion partition from a hive-style `dt=` path segment.
pub fn partition_date_from_path(path: &str) -> Option<NaiveDate> {
    path.split('/').find_map(|segment| {
        segment
            .strip_prefix("dt=")
            .and_then(|value| NaiveDate::parse_from_str(value, TRADE_DATE_FORMAT).ok())
    })
}

fn decode_batch(
    batch: &RecordBatch,
    path: &str,
    path_dt: Option<NaiveDate>,
    records: &mut Vec<RawRecord>,
) -> Result<(), SourceError> {
    let tickers = string_column(batch, TICKER_COLUMN, path)?;
    let statuses = string_column(batch, STATUS_COLUMN, path)?;
    let values = float_column(batch, VALUE_COLUMN, path)?;
    let dates = column(batch, DATE_COLUMN, path)?;
    let dts = batch.column_by_name(DT_COLUMN);

    if dts.is_none() && path_dt.is_none() {
        return MissingPartitionSnafu { path }.fail();
    }

    for row in 0..batch.num_rows() {
        if tickers.is_null(row) || statuses.is_null(row) || values.is_null(row) || dates.is_null(row)
        {
            continue;
        }

        let dt = match dts {
            Some(array) if !array.is_null(row) => date_value(array, row, DT_COLUMN, path)?,
            _ => path_dt.context(MissingPartitionSnafu { path })?,
        };

        records.push(RawRecord {
            ticker: tickers.value(row).to_string(),
            status: statuses.value(row).to_string(),
            value: values.value(row),
            date: date_value(dates, row, DATE_COLUMN, path)?,
            dt,
        });
    }
    Ok(())
}

fn column<'a>(batch: &'a RecordBatch, name: &str, path: &str) -> Result<&'a ArrayRef, SourceError> {
    batch.column_by_name(name).context(MissingColumnSnafu {
        path,
        column: name,
    })
}

fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    path: &str,
) -> Result<&'a StringArray, SourceError> {
    column(batch, name, path)?
        .as_any()
        .downcast_ref::<StringArray>()
        .context(ColumnTypeSnafu {
            path,
            column: name,
            actual: column(batch, name, path)?.data_type().to_string(),
        })
}

fn float_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
    path: &str,
) -> Result<&'a Float64Array, SourceError> {
    column(batch, name, path)?
        .as_any()
        .downcast_ref::<Float64Array>()
        .context(ColumnTypeSnafu {
            path,
            column: name,
            actual: column(batch, name, path)?.data_type().to_string(),
        })
}

/// Interpret a cell as a calendar date.
fn date_value(
    array: &ArrayRef,
    row: usize,
    column: &str,
    path: &str,
) -> Result<NaiveDate, SourceError> {
    match array.data_type() {
        DataType::Date32 => {
            let days = array
                .as_any()
                .downcast_ref::<Date32Array>()
                .context(ColumnTypeSnafu {
                    path,
                    column,
                    actual: array.data_type().to_string(),
                })?
                .value(row);
            // date32 counts days from the unix epoch; chrono counts from CE
            NaiveDate::from_num_days_from_ce_opt(days + 719_163)
                .context(InvalidDateSnafu { path, column })
        }
        DataType::Timestamp(unit, _) => {
            let seconds = timestamp_seconds(array, *unit, row, column, path)?;
            DateTime::from_timestamp(seconds, 0)
                .map(|datetime| datetime.date_naive())
                .context(InvalidDateSnafu { path, column })
        }
        DataType::Utf8 => {
            let text = array
                .as_any()
                .downcast_ref::<StringArray>()
                .context(ColumnTypeSnafu {
                    path,
                    column,
                    actual: array.data_type().to_string(),
                })?
                .value(row);
            NaiveDate::parse_from_str(text, TRADE_DATE_FORMAT)
                .ok()
                .context(InvalidDateSnafu { path, column })
        }
        other => ColumnTypeSnafu {
            path,
            column,
            actual: other.to_string(),
        }
        .fail(),
    }
}

fn timestamp_seconds(
    array: &ArrayRef,
    unit: TimeUnit,
    row: usize,
    column: &str,
    path: &str,
) -> Result<i64, SourceError> {
    let context = ColumnTypeSnafu {
        path,
        column,
        actual: array.data_type().to_string(),
    };
    let any = array.as_any();

    let seconds = match unit {
        TimeUnit::Second => any
            .downcast_ref::<TimestampSecondArray>()
            .context(context)?
            .value(row),
        TimeUnit::Millisecond => {
            any.downcast_ref::<TimestampMillisecondArray>()
                .context(context)?
                .value(row)
                / 1_000
        }
        TimeUnit::Microsecond => {
            any.downcast_ref::<TimestampMicrosecondArray>()
                .context(context)?
                .value(row)
                / 1_000_000
        }
        TimeUnit::Nanosecond => {
            any.downcast_ref::<TimestampNanosecondArray>()
                .context(context)?
                .value(row)
                / 1_000_000_000
        }
    };
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, Schema};
    use parquet::arrow::ArrowWriter;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn days(date: &str) -> i32 {
        use chrono::Datelike;
        let parsed: NaiveDate = date.parse().unwrap();
        parsed.num_days_from_ce() - 719_163
    }

    fn raw_parquet_date32(with_dt: bool) -> Bytes {
        let mut fields = vec![
            Field::new("Ticker", DataType::Utf8, false),
            Field::new("Status", DataType::Utf8, false),
            Field::new("Value", DataType::Float64, false),
            Field::new("Date", DataType::Date32, false),
        ];
        if with_dt {
            fields.push(Field::new("dt", DataType::Date32, false));
        }
        let schema = Arc::new(Schema::new(fields));

        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(StringArray::from(vec!["PETR4.SA", "PETR4.SA"])),
            Arc::new(StringArray::from(vec!["Close", "Open"])),
            Arc::new(Float64Array::from(vec![10.0, 11.0])),
            Arc::new(Date32Array::from(vec![
                days("2025-09-15"),
                days("2025-09-15"),
            ])),
        ];
        if with_dt {
            columns.push(Arc::new(Date32Array::from(vec![
                days("2025-09-17"),
                days("2025-09-17"),
            ])));
        }

        let batch = RecordBatch::try_new(schema.clone(), columns).unwrap();
        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();
        Bytes::from(buffer)
    }

    #[test]
    fn test_read_records_with_dt_column() {
        let records = read_raw_records(raw_parquet_date32(true), "b3_stock_info.parquet").unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].ticker, "PETR4.SA");
        assert_eq!(records[0].status, "Close");
        assert_eq!(records[0].value, 10.0);
        assert_eq!(records[0].date, "2025-09-15".parse::<NaiveDate>().unwrap());
        assert_eq!(records[0].dt, "2025-09-17".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn test_dt_recovered_from_path_segment() {
        let records = read_raw_records(
            raw_parquet_date32(false),
            "dt=2025-09-17/b3_stock_info.parquet",
        )
        .unwrap();

        assert_eq!(records[0].dt, "2025-09-17".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn test_missing_dt_everywhere_is_an_error() {
        let result = read_raw_records(raw_parquet_date32(false), "b3_stock_info.parquet");
        assert!(matches!(result, Err(SourceError::MissingPartition { .. })));
    }

    #[test]
    fn test_string_dates_are_accepted() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("Ticker", DataType::Utf8, false),
            Field::new("Status", DataType::Utf8, false),
            Field::new("Value", DataType::Float64, false),
            Field::new("Date", DataType::Utf8, false),
            Field::new("dt", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["VALE3.SA"])),
                Arc::new(StringArray::from(vec!["Close"])),
                Arc::new(Float64Array::from(vec![60.0])),
                Arc::new(StringArray::from(vec!["2025-09-15"])),
                Arc::new(StringArray::from(vec!["2025-09-17"])),
            ],
        )
        .unwrap();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let records = read_raw_records(Bytes::from(buffer), "file.parquet").unwrap();
        assert_eq!(records[0].date, "2025-09-15".parse::<NaiveDate>().unwrap());
        assert_eq!(records[0].dt, "2025-09-17".parse::<NaiveDate>().unwrap());
    }

    #[test]
    fn test_missing_column_error_names_column() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "Ticker",
            DataType::Utf8,
            false,
        )]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(StringArray::from(vec!["PETR4.SA"])) as ArrayRef],
        )
        .unwrap();

        let mut buffer = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let err = read_raw_records(Bytes::from(buffer), "file.parquet").unwrap_err();
        assert!(err.to_string().contains("Status"));
    }

    #[test]
    fn test_partition_date_from_path() {
        assert_eq!(
            partition_date_from_path("b3_raw/dt=2025-09-17/file.parquet"),
            Some("2025-09-17".parse().unwrap())
        );
        assert_eq!(partition_date_from_path("b3_raw/file.parquet"), None);
        assert_eq!(partition_date_from_path("b3_raw/dt=notadate/file.parquet"), None);
    }

    #[tokio::test]
    async fn test_list_parquet_files_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        let partition = base.join("dt=2025-09-17");
        std::fs::create_dir_all(&partition).unwrap();
        std::fs::write(partition.join("b.parquet"), b"b").unwrap();
        std::fs::write(partition.join("a.parquet"), b"a").unwrap();
        std::fs::write(partition.join("_SUCCESS"), b"").unwrap();

        let storage = StorageProvider::for_url(base.to_str().unwrap()).await.unwrap();

        let paths = list_parquet_files(&storage, None).await.unwrap();
        let names: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "dt=2025-09-17/a.parquet".to_string(),
                "dt=2025-09-17/b.parquet".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_parquet_files_scoped_to_partition() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path();
        for dt in ["dt=2025-09-16", "dt=2025-09-17"] {
            let dir = base.join(dt);
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("file.parquet"), b"x").unwrap();
        }

        let storage = StorageProvider::for_url(base.to_str().unwrap()).await.unwrap();

        let paths = list_parquet_files(&storage, Some("dt=2025-09-17")).await.unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].to_string(), "dt=2025-09-17/file.parquet");
    }
}
