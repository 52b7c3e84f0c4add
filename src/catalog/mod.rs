//! Catalog metadata reconciliation.
//!
//! The refined dataset is registered in an external metadata catalog so
//! query engines can discover it. `reconcile` performs an idempotent
//! create-or-update: databases and tables are created when missing and
//! updated in place otherwise. A duplicate-create race between two
//! concurrent runs falls through to the update path instead of failing.

mod glue;
mod memory;

pub use glue::GlueCatalog;
pub use memory::MemoryCatalog;

use async_trait::async_trait;
use tracing::info;

use crate::error::CatalogError;

/// Parquet storage formats registered on the refined table.
pub const PARQUET_INPUT_FORMAT: &str =
    "org.apache.hadoop.hive.ql.io.parquet.MapredParquetInputFormat";
pub const PARQUET_OUTPUT_FORMAT: &str =
    "org.apache.hadoop.hive.ql.io.parquet.MapredParquetOutputFormat";
pub const PARQUET_SERDE_LIBRARY: &str =
    "org.apache.hadoop.hive.ql.io.parquet.serde.ParquetHiveSerDe";

/// A named, typed column in the catalog schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub data_type: String,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Descriptor for the external table registered over the refined dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    pub location: String,
    /// Non-partition columns.
    pub columns: Vec<ColumnSpec>,
    /// Partition key columns, in partition order.
    pub partition_keys: Vec<ColumnSpec>,
}

impl TableSpec {
    /// The fixed schema of the refined percentage-change table.
    pub fn refined(table: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: table.into(),
            location: location.into(),
            columns: vec![
                ColumnSpec::new("Status", "string"),
                ColumnSpec::new("Value", "double"),
                ColumnSpec::new("data_ingestao", "date"),
                ColumnSpec::new("prox_valor", "double"),
                ColumnSpec::new("percentual", "double"),
            ],
            partition_keys: vec![
                ColumnSpec::new("data_pregao", "string"),
                ColumnSpec::new("ticker", "string"),
            ],
        }
    }
}

/// Metadata catalog operations needed by the refine job.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn database_exists(&self, name: &str) -> Result<bool, CatalogError>;

    async fn create_database(&self, name: &str) -> Result<(), CatalogError>;

    async fn table_exists(&self, database: &str, table: &str) -> Result<bool, CatalogError>;

    async fn create_table(&self, database: &str, spec: &TableSpec) -> Result<(), CatalogError>;

    async fn update_table(&self, database: &str, spec: &TableSpec) -> Result<(), CatalogError>;
}

/// What `reconcile` did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    Created,
    Updated,
}

impl ReconcileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileAction::Created => "created",
            ReconcileAction::Updated => "updated",
        }
    }
}

/// Create or update the refined table's metadata.
///
/// The existence checks and the create/update calls are not transactional;
/// a concurrent run may create the entity in between. Duplicate-create
/// failures are therefore treated as "already exists" and fall through to
/// the update path.
pub async fn reconcile(
    catalog: &dyn Catalog,
    database: &str,
    spec: &TableSpec,
) -> Result<ReconcileAction, CatalogError> {
    if catalog.database_exists(database).await? {
        info!(database, "Database found");
    } else {
        match catalog.create_database(database).await {
            Ok(()) => info!(database, "Database created"),
            Err(err) if err.is_already_exists() => {
                info!(database, "Database created concurrently")
            }
            Err(err) => return Err(err),
        }
    }

    if catalog.table_exists(database, &spec.name).await? {
        catalog.update_table(database, spec).await?;
        info!(database, table = %spec.name, "Table updated");
        return Ok(ReconcileAction::Updated);
    }

    match catalog.create_table(database, spec).await {
        Ok(()) => {
            info!(database, table = %spec.name, "Table created");
            Ok(ReconcileAction::Created)
        }
        Err(err) if err.is_already_exists() => {
            catalog.update_table(database, spec).await?;
            info!(database, table = %spec.name, "Table updated after create race");
            Ok(ReconcileAction::Updated)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refined_spec() -> TableSpec {
        TableSpec::refined("b3_percentual", "s3://fiapb3/b3_refined/")
    }

    #[test]
    fn test_refined_spec_schema() {
        let spec = refined_spec();

        let columns: Vec<(&str, &str)> = spec
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.data_type.as_str()))
            .collect();
        assert_eq!(
            columns,
            vec![
                ("Status", "string"),
                ("Value", "double"),
                ("data_ingestao", "date"),
                ("prox_valor", "double"),
                ("percentual", "double"),
            ]
        );

        let partition_keys: Vec<(&str, &str)> = spec
            .partition_keys
            .iter()
            .map(|c| (c.name.as_str(), c.data_type.as_str()))
            .collect();
        assert_eq!(
            partition_keys,
            vec![("data_pregao", "string"), ("ticker", "string")]
        );
    }

    #[tokio::test]
    async fn test_reconcile_fresh_account_creates_both() {
        let catalog = MemoryCatalog::new();

        let action = reconcile(&catalog, "bovespa", &refined_spec()).await.unwrap();

        assert_eq!(action, ReconcileAction::Created);
        assert!(catalog.database_exists("bovespa").await.unwrap());
        let stored = catalog.table("bovespa", "b3_percentual").unwrap();
        assert_eq!(stored.partition_keys.len(), 2);
    }

    #[tokio::test]
    async fn test_reconcile_second_run_updates() {
        let catalog = MemoryCatalog::new();

        reconcile(&catalog, "bovespa", &refined_spec()).await.unwrap();
        let action = reconcile(&catalog, "bovespa", &refined_spec()).await.unwrap();

        assert_eq!(action, ReconcileAction::Updated);
    }

    #[tokio::test]
    async fn test_reconcile_updates_changed_location() {
        let catalog = MemoryCatalog::new();

        reconcile(&catalog, "bovespa", &refined_spec()).await.unwrap();

        let moved = TableSpec::refined("b3_percentual", "s3://fiapb3/b3_refined_v2/");
        reconcile(&catalog, "bovespa", &moved).await.unwrap();

        let stored = catalog.table("bovespa", "b3_percentual").unwrap();
        assert_eq!(stored.location, "s3://fiapb3/b3_refined_v2/");
    }

    #[tokio::test]
    async fn test_reconcile_survives_create_race() {
        let catalog = MemoryCatalog::new();
        catalog.create_database("bovespa").await.unwrap();
        // Simulate a concurrent run winning the create between the
        // existence check and our create call.
        catalog.set_table_created_behind_check("bovespa", &refined_spec());

        let action = reconcile(&catalog, "bovespa", &refined_spec()).await.unwrap();
        assert_eq!(action, ReconcileAction::Updated);
    }
}
