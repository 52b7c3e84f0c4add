//! Error types for the pregao ETL pipeline.

use snafu::prelude::*;

/// Errors that can occur during storage operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StorageError {
    /// Invalid storage URL format.
    #[snafu(display("Invalid storage URL: {url}"))]
    InvalidUrl { url: String },

    /// Object store operation failed.
    #[snafu(display("Storage operation failed: {source}"))]
    ObjectStore { source: object_store::Error },

    /// IO error during storage operations.
    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    /// S3 configuration error.
    #[snafu(display("S3 configuration error: {source}"))]
    S3Config { source: object_store::Error },
}

impl StorageError {
    /// Check if this error represents a "not found" condition (404, NoSuchKey, etc.)
    pub fn is_not_found(&self) -> bool {
        match self {
            StorageError::ObjectStore { source } => {
                matches!(source, object_store::Error::NotFound { .. })
            }
            _ => false,
        }
    }
}

/// Errors that can occur during configuration parsing and validation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Raw input location is empty.
    #[snafu(display("Raw input location cannot be empty"))]
    EmptyInputUri,

    /// Refined output location is empty.
    #[snafu(display("Refined output location cannot be empty"))]
    EmptyOutputUri,

    /// Catalog database name is empty.
    #[snafu(display("Catalog database name cannot be empty"))]
    EmptyDatabase,

    /// Catalog table name is empty.
    #[snafu(display("Catalog table name cannot be empty"))]
    EmptyTable,

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    #[snafu(context(suffix(ConfigSnafu)))]
    ReadFile { source: std::io::Error },
}

/// Errors that can occur while handling a storage-write notification.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum TriggerError {
    /// The event payload did not have the expected shape.
    #[snafu(display("Malformed storage event: {message}"))]
    MalformedEvent { message: String },

    /// No `dt=YYYY-MM-DD` segment was found in the object key.
    #[snafu(display("Não foi possível extrair a partição do caminho: {key}"))]
    PartitionNotFound { key: String },

    /// The job execution service rejected the start request.
    #[snafu(display("Failed to start job run: {message}"))]
    JobStart { message: String },
}

/// Errors that can occur while reading the raw dataset.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// Failed to list raw files.
    #[snafu(display("Failed to list raw files: {source}"))]
    List { source: StorageError },

    /// Failed to read a raw file.
    #[snafu(display("Failed to read raw file {path}: {source}"))]
    ReadFile { path: String, source: StorageError },

    /// Failed to decode a parquet file.
    #[snafu(display("Failed to decode parquet file {path}: {source}"))]
    ParquetDecode {
        path: String,
        source: parquet::errors::ParquetError,
    },

    /// A required column is missing from the raw schema.
    #[snafu(display("Column {column} missing from {path}"))]
    MissingColumn { path: String, column: String },

    /// A column has an unsupported physical type.
    #[snafu(display("Column {column} in {path} has unsupported type {actual}"))]
    ColumnType {
        path: String,
        column: String,
        actual: String,
    },

    /// A date value is out of the representable range.
    #[snafu(display("Column {column} in {path} holds an unrepresentable date"))]
    InvalidDate { path: String, column: String },

    /// The ingestion partition could not be determined.
    #[snafu(display("No dt column or dt= path segment for {path}"))]
    MissingPartition { path: String },
}

/// Errors that can occur while writing the refined dataset.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SinkError {
    /// Failed to build an Arrow batch from refined records.
    #[snafu(display("Failed to build record batch: {source}"))]
    BatchBuild { source: arrow::error::ArrowError },

    /// Failed to serialize a parquet file.
    #[snafu(display("Failed to serialize parquet file: {source}"))]
    ParquetWrite {
        source: parquet::errors::ParquetError,
    },

    /// Failed to clear the existing output before overwrite.
    #[snafu(display("Failed to clear output location: {source}"))]
    ClearOutput { source: StorageError },

    /// Failed to persist a refined file.
    #[snafu(display("Failed to write refined file {path}: {source}"))]
    WriteFile { path: String, source: StorageError },
}

/// Errors that can occur while reconciling catalog metadata.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum CatalogError {
    /// The catalog service rejected an operation.
    #[snafu(display("Catalog {operation} failed: {message}"))]
    Service {
        operation: &'static str,
        message: String,
    },

    /// The entity already exists (benign for create-or-update flows).
    #[snafu(display("Catalog entity already exists: {entity}"))]
    AlreadyExists { entity: String },
}

impl CatalogError {
    /// Check if this error represents a duplicate-create condition.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, CatalogError::AlreadyExists { .. })
    }
}

/// Errors that can occur while issuing queries to the query service.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum QueryError {
    /// The query service rejected the start request.
    #[snafu(display("Failed to start query execution: {message}"))]
    QueryStart { message: String },
}

/// Top-level refine job errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum JobError {
    /// Configuration error.
    #[snafu(display("Configuration error: {source}"))]
    Config { source: ConfigError },

    /// Storage error.
    #[snafu(display("Storage error: {source}"))]
    Storage { source: StorageError },

    /// Raw dataset read error.
    #[snafu(display("Source error: {source}"))]
    Source { source: SourceError },

    /// Refined dataset write error.
    #[snafu(display("Sink error: {source}"))]
    Sink { source: SinkError },

    /// Catalog reconciliation error.
    #[snafu(display("Catalog error: {source}"))]
    Catalog { source: CatalogError },

    /// Partition-repair query error.
    #[snafu(display("Query error: {source}"))]
    Query { source: QueryError },
}

impl From<ConfigError> for JobError {
    fn from(source: ConfigError) -> Self {
        JobError::Config { source }
    }
}

impl From<StorageError> for JobError {
    fn from(source: StorageError) -> Self {
        JobError::Storage { source }
    }
}

impl From<SourceError> for JobError {
    fn from(source: SourceError) -> Self {
        JobError::Source { source }
    }
}

impl From<SinkError> for JobError {
    fn from(source: SinkError) -> Self {
        JobError::Sink { source }
    }
}

impl From<CatalogError> for JobError {
    fn from(source: CatalogError) -> Self {
        JobError::Catalog { source }
    }
}

impl From<QueryError> for JobError {
    fn from(source: QueryError) -> Self {
        JobError::Query { source }
    }
}
