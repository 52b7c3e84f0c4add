//! Two-stage ETL for B3 exchange data.
//!
//! The [`trigger`] module reacts to storage-write notifications on the raw
//! bucket and dispatches the refine job with the ingestion partition date.
//! The [`job`] module runs the refine job itself: it reads the raw parquet
//! dataset, computes a per-ticker next-value lookahead and percentage
//! change, overwrites the partitioned refined dataset, reconciles the
//! catalog table and starts a partition-repair query.

pub mod catalog;
pub mod config;
pub mod error;
pub mod job;
pub mod metrics;
pub mod query;
pub mod sink;
pub mod source;
pub mod storage;
pub mod tracing;
pub mod transform;
pub mod trigger;

pub use config::JobConfig;
pub use error::JobError;
pub use job::{JobRun, JobSummary, RunStatus, run};
pub use storage::{StorageProvider, StorageProviderRef};
pub use tracing::init_tracing;
