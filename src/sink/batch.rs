//! Arrow encoding of refined records.
//!
//! The partition columns (`data_pregao`, `ticker`) are carried in the file
//! path, not in the file, matching hive-style partitioned layouts.

use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use chrono::Datelike;
use snafu::prelude::*;
use std::sync::Arc;

use crate::error::{BatchBuildSnafu, SinkError};
use crate::transform::RefinedRecord;

/// Schema of the refined parquet files.
pub fn output_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("Status", DataType::Utf8, false),
        Field::new("Value", DataType::Float64, false),
        Field::new("data_ingestao", DataType::Date32, false),
        Field::new("prox_valor", DataType::Float64, true),
        Field::new("percentual", DataType::Float64, true),
    ]))
}

/// Encode one partition's records as a record batch.
pub fn to_record_batch(records: &[&RefinedRecord]) -> Result<RecordBatch, SinkError> {
    let statuses: StringArray = records.iter().map(|r| Some(r.status.as_str())).collect();
    let values: Float64Array = records.iter().map(|r| Some(r.value)).collect();
    let ingestion_days: Date32Array = records
        .iter()
        // date32 counts days from the unix epoch; chrono counts from CE
        .map(|r| Some(r.data_ingestao.num_days_from_ce() - 719_163))
        .collect();
    let next_values: Float64Array = records.iter().map(|r| r.prox_valor).collect();
    let percentages: Float64Array = records.iter().map(|r| r.percentual).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(statuses),
        Arc::new(values),
        Arc::new(ingestion_days),
        Arc::new(next_values),
        Arc::new(percentages),
    ];

    RecordBatch::try_new(output_schema(), columns).context(BatchBuildSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::Array;
    use chrono::NaiveDate;

    fn refined(value: f64, prox: Option<f64>) -> RefinedRecord {
        RefinedRecord {
            ticker: "PETR4".to_string(),
            status: "Close".to_string(),
            value,
            data_ingestao: "2025-09-17".parse::<NaiveDate>().unwrap(),
            data_pregao: "2025-09-15".to_string(),
            prox_valor: prox,
            percentual: prox.map(|p| (p - value) / value * 100.0),
        }
    }

    #[test]
    fn test_batch_shape_and_nulls() {
        let records = [refined(10.0, Some(12.0)), refined(12.0, None)];
        let refs: Vec<&RefinedRecord> = records.iter().collect();

        let batch = to_record_batch(&refs).unwrap();

        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 5);

        let next_values = batch
            .column_by_name("prox_valor")
            .unwrap()
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(next_values.value(0), 12.0);
        assert!(next_values.is_null(1));

        let ingestion = batch
            .column_by_name("data_ingestao")
            .unwrap()
            .as_any()
            .downcast_ref::<Date32Array>()
            .unwrap();
        let expected = "2025-09-17".parse::<NaiveDate>().unwrap().num_days_from_ce() - 719_163;
        assert_eq!(ingestion.value(0), expected);
    }

    #[test]
    fn test_empty_batch() {
        let batch = to_record_batch(&[]).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(batch.schema(), output_schema());
    }
}
