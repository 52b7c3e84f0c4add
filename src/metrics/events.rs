//! Internal events for metrics emission.
//!
//! Each event struct represents a measurable occurrence in the pipeline.
//! Events implement the `InternalEvent` trait which emits the corresponding
//! counter metric.

use metrics::counter;
use tracing::trace;

/// Trait for internal events that can be emitted as metrics.
pub trait InternalEvent {
    /// Emit this event as a metric.
    fn emit(self);
}

/// Event emitted when raw records are read from storage.
pub struct RawRecordsRead {
    pub count: u64,
}

impl InternalEvent for RawRecordsRead {
    fn emit(self) {
        trace!(count = self.count, "Raw records read");
        counter!("pregao_raw_records_read_total").increment(self.count);
    }
}

/// Event emitted when records pass the refine transformation.
pub struct RecordsRefined {
    pub count: u64,
}

impl InternalEvent for RecordsRefined {
    fn emit(self) {
        trace!(count = self.count, "Records refined");
        counter!("pregao_records_refined_total").increment(self.count);
    }
}

/// Event emitted when a refined parquet file is written.
pub struct ParquetFileWritten {
    pub bytes: u64,
}

impl InternalEvent for ParquetFileWritten {
    fn emit(self) {
        trace!(bytes = self.bytes, "Parquet file written");
        counter!("pregao_parquet_files_written_total").increment(1);
        counter!("pregao_parquet_bytes_written_total").increment(self.bytes);
    }
}

/// Outcome of a trigger invocation.
#[derive(Debug, Clone, Copy)]
pub enum TriggerStatus {
    Success,
    Failure,
}

impl TriggerStatus {
    fn as_str(&self) -> &'static str {
        match self {
            TriggerStatus::Success => "success",
            TriggerStatus::Failure => "failure",
        }
    }
}

/// Event emitted once per handled storage notification.
pub struct TriggerInvocation {
    pub status: TriggerStatus,
}

impl InternalEvent for TriggerInvocation {
    fn emit(self) {
        trace!(status = self.status.as_str(), "Trigger invocation");
        counter!("pregao_trigger_invocations_total", "status" => self.status.as_str()).increment(1);
    }
}

/// Event emitted when catalog metadata is reconciled.
pub struct CatalogReconciled {
    /// Either "created" or "updated".
    pub action: &'static str,
}

impl InternalEvent for CatalogReconciled {
    fn emit(self) {
        trace!(action = self.action, "Catalog reconciled");
        counter!("pregao_catalog_reconciled_total", "action" => self.action).increment(1);
    }
}

/// Event emitted when a partition-repair query is started.
pub struct RepairQueryStarted;

impl InternalEvent for RepairQueryStarted {
    fn emit(self) {
        trace!("Repair query started");
        counter!("pregao_repair_queries_total").increment(1);
    }
}
