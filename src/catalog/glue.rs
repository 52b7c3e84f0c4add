//! Glue Data Catalog backend.

use async_trait::async_trait;
use aws_sdk_glue::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_glue::types::{Column, DatabaseInput, SerDeInfo, StorageDescriptor, TableInput};

use super::{
    Catalog, TableSpec, PARQUET_INPUT_FORMAT, PARQUET_OUTPUT_FORMAT, PARQUET_SERDE_LIBRARY,
};
use crate::error::CatalogError;

/// Table type marking the table as data-external to the catalog.
const EXTERNAL_TABLE: &str = "EXTERNAL_TABLE";

/// Catalog backed by the Glue Data Catalog service.
pub struct GlueCatalog {
    client: aws_sdk_glue::Client,
}

impl GlueCatalog {
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_glue::Client::new(sdk_config),
        }
    }
}

fn service_error<E, R>(operation: &'static str, err: SdkError<E, R>) -> CatalogError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    CatalogError::Service {
        operation,
        message: DisplayErrorContext(&err).to_string(),
    }
}

fn build_error(operation: &'static str, err: aws_sdk_glue::error::BuildError) -> CatalogError {
    CatalogError::Service {
        operation,
        message: err.to_string(),
    }
}

fn to_columns(specs: &[super::ColumnSpec]) -> Result<Vec<Column>, CatalogError> {
    specs
        .iter()
        .map(|column| {
            Column::builder()
                .name(&column.name)
                .r#type(&column.data_type)
                .build()
                .map_err(|err| build_error("column", err))
        })
        .collect()
}

fn to_table_input(spec: &TableSpec) -> Result<TableInput, CatalogError> {
    let serde_info = SerDeInfo::builder()
        .serialization_library(PARQUET_SERDE_LIBRARY)
        .build();

    let storage_descriptor = StorageDescriptor::builder()
        .set_columns(Some(to_columns(&spec.columns)?))
        .location(&spec.location)
        .input_format(PARQUET_INPUT_FORMAT)
        .output_format(PARQUET_OUTPUT_FORMAT)
        .serde_info(serde_info)
        .build();

    TableInput::builder()
        .name(&spec.name)
        .table_type(EXTERNAL_TABLE)
        .parameters("EXTERNAL", "TRUE")
        .storage_descriptor(storage_descriptor)
        .set_partition_keys(Some(to_columns(&spec.partition_keys)?))
        .build()
        .map_err(|err| build_error("table_input", err))
}

#[async_trait]
impl Catalog for GlueCatalog {
    async fn database_exists(&self, name: &str) -> Result<bool, CatalogError> {
        match self.client.get_database().name(name).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_entity_not_found_exception() {
                    Ok(false)
                } else {
                    Err(CatalogError::Service {
                        operation: "get_database",
                        message: service_err
                            .message()
                            .unwrap_or("unknown service error")
                            .to_string(),
                    })
                }
            }
        }
    }

    async fn create_database(&self, name: &str) -> Result<(), CatalogError> {
        let input = DatabaseInput::builder()
            .name(name)
            .build()
            .map_err(|err| build_error("database_input", err))?;

        match self
            .client
            .create_database()
            .database_input(input)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_already_exists_exception() {
                    Err(CatalogError::AlreadyExists {
                        entity: name.to_string(),
                    })
                } else {
                    Err(CatalogError::Service {
                        operation: "create_database",
                        message: service_err
                            .message()
                            .unwrap_or("unknown service error")
                            .to_string(),
                    })
                }
            }
        }
    }

    async fn table_exists(&self, database: &str, table: &str) -> Result<bool, CatalogError> {
        match self
            .client
            .get_table()
            .database_name(database)
            .name(table)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_entity_not_found_exception() {
                    Ok(false)
                } else {
                    Err(CatalogError::Service {
                        operation: "get_table",
                        message: service_err
                            .message()
                            .unwrap_or("unknown service error")
                            .to_string(),
                    })
                }
            }
        }
    }

    async fn create_table(&self, database: &str, spec: &TableSpec) -> Result<(), CatalogError> {
        let input = to_table_input(spec)?;

        match self
            .client
            .create_table()
            .database_name(database)
            .table_input(input)
            .send()
            .await
        {
            Ok(_) => Ok(()),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_already_exists_exception() {
                    Err(CatalogError::AlreadyExists {
                        entity: format!("{database}.{}", spec.name),
                    })
                } else {
                    Err(CatalogError::Service {
                        operation: "create_table",
                        message: service_err
                            .message()
                            .unwrap_or("unknown service error")
                            .to_string(),
                    })
                }
            }
        }
    }

    async fn update_table(&self, database: &str, spec: &TableSpec) -> Result<(), CatalogError> {
        let input = to_table_input(spec)?;

        self.client
            .update_table()
            .database_name(database)
            .table_input(input)
            .send()
            .await
            .map_err(|err| service_error("update_table", err))?;

        Ok(())
    }
}
