//! Configuration for the pregao ETL pipeline.
//!
//! All storage locations, catalog names and the job name are configuration
//! values with defaults matching the production layout, so a config file is
//! only needed to override them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ConfigError;

mod vars;
pub use vars::{InterpolationResult, interpolate};

/// Configuration for the refine job and the ingestion trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Location of the raw dataset (supports S3 and local paths).
    #[serde(default = "default_input_uri")]
    pub input_uri: String,
    /// Location of the refined dataset.
    #[serde(default = "default_output_uri")]
    pub output_uri: String,
    /// Catalog database holding the refined table.
    #[serde(default = "default_database")]
    pub database: String,
    /// Catalog table registered over the refined dataset.
    #[serde(default = "default_table")]
    pub table: String,
    /// Results location for partition-repair queries.
    #[serde(default = "default_query_results_uri")]
    pub query_results_uri: String,
    /// Name of the refine job started by the trigger.
    #[serde(default = "default_job_name")]
    pub job_name: String,
    /// When true, restrict the raw listing to the `dt=<date>` partition
    /// passed via `--dt`. Defaults to false: the job reads the full raw
    /// dataset on every run.
    #[serde(default)]
    pub scope_input_to_dt: bool,
    /// Storage options for both locations (credentials, region, etc.)
    #[serde(default)]
    pub storage_options: HashMap<String, String>,
}

fn default_input_uri() -> String {
    "s3://fiapb3/b3_raw/".to_string()
}

fn default_output_uri() -> String {
    "s3://fiapb3/b3_refined/".to_string()
}

fn default_database() -> String {
    "bovespa".to_string()
}

fn default_table() -> String {
    "b3_percentual".to_string()
}

fn default_query_results_uri() -> String {
    "s3://fiapb3/athena-results/".to_string()
}

fn default_job_name() -> String {
    "b3_raw_stage".to_string()
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            input_uri: default_input_uri(),
            output_uri: default_output_uri(),
            database: default_database(),
            table: default_table(),
            query_results_uri: default_query_results_uri(),
            job_name: default_job_name(),
            scope_input_to_dt: false,
            storage_options: HashMap::new(),
        }
    }
}

impl JobConfig {
    /// Load configuration from a file.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile { source })?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        // Interpolate environment variables
        let result = interpolate(contents);
        if !result.is_ok() {
            return Err(ConfigError::EnvInterpolation {
                message: result.errors.join("\n"),
            });
        }

        let config: JobConfig = serde_yaml::from_str(&result.text)
            .map_err(|source| ConfigError::YamlParse { source })?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_uri.is_empty() {
            return Err(ConfigError::EmptyInputUri);
        }
        if self.output_uri.is_empty() {
            return Err(ConfigError::EmptyOutputUri);
        }
        if self.database.is_empty() {
            return Err(ConfigError::EmptyDatabase);
        }
        if self.table.is_empty() {
            return Err(ConfigError::EmptyTable);
        }
        Ok(())
    }
}
