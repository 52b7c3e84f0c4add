//! Partitioned parquet writer with overwrite semantics.

use object_store::PutPayload;
use object_store::path::Path;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use snafu::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::to_record_batch;
use crate::emit;
use crate::error::{ClearOutputSnafu, ParquetWriteSnafu, SinkError, WriteFileSnafu};
use crate::metrics::events::ParquetFileWritten;
use crate::storage::StorageProviderRef;
use crate::transform::RefinedRecord;

/// Outcome of an overwrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteSummary {
    pub files_written: usize,
    pub records_written: usize,
    pub partitions: usize,
    pub files_deleted: usize,
}

/// Writes the refined dataset as one parquet file per
/// `data_pregao={date}/ticker={symbol}` partition.
pub struct PartitionedWriter {
    storage: StorageProviderRef,
}

impl PartitionedWriter {
    pub fn new(storage: StorageProviderRef) -> Self {
        Self { storage }
    }

    /// Replace the output location's contents with the given records.
    ///
    /// The previous contents are deleted first, then each partition is
    /// written as a single snappy-compressed parquet file under a fresh
    /// unique name.
    pub async fn overwrite(&self, records: &[RefinedRecord]) -> Result<WriteSummary, SinkError> {
        let files_deleted = self
            .storage
            .delete_all()
            .await
            .context(ClearOutputSnafu)?;
        if files_deleted > 0 {
            info!(files_deleted, "Cleared previous refined output");
        }

        let mut partitions: BTreeMap<(&str, &str), Vec<&RefinedRecord>> = BTreeMap::new();
        for record in records {
            partitions
                .entry((record.data_pregao.as_str(), record.ticker.as_str()))
                .or_default()
                .push(record);
        }

        let properties = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();

        let mut files_written = 0;
        let partition_count = partitions.len();
        for ((data_pregao, ticker), partition_records) in partitions {
            let batch = to_record_batch(&partition_records)?;

            let mut buffer = Vec::new();
            let mut writer =
                ArrowWriter::try_new(&mut buffer, batch.schema(), Some(properties.clone()))
                    .context(ParquetWriteSnafu)?;
            writer.write(&batch).context(ParquetWriteSnafu)?;
            writer.close().context(ParquetWriteSnafu)?;

            let path = partition_file_path(data_pregao, ticker);
            let bytes = buffer.len() as u64;
            self.storage
                .put_parquet(&path, PutPayload::from(buffer))
                .await
                .context(WriteFileSnafu {
                    path: path.to_string(),
                })?;

            emit!(ParquetFileWritten { bytes });
            debug!(path = %path, rows = partition_records.len(), "Wrote partition file");
            files_written += 1;
        }

        Ok(WriteSummary {
            files_written,
            records_written: records.len(),
            partitions: partition_count,
            files_deleted,
        })
    }
}

fn partition_file_path(data_pregao: &str, ticker: &str) -> Path {
    Path::from(format!(
        "data_pregao={data_pregao}/ticker={ticker}/{}.parquet",
        Uuid::now_v7()
    ))
}
