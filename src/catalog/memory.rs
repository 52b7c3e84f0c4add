//! In-memory catalog for tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use super::{Catalog, TableSpec};
use crate::error::CatalogError;

#[derive(Debug, Default)]
struct State {
    databases: HashSet<String>,
    tables: HashMap<(String, String), TableSpec>,
}

/// Catalog holding its state in memory, for exercising reconciliation
/// without the real service.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    state: Mutex<State>,
    hide_tables_once: Mutex<bool>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a stored table, for assertions.
    pub fn table(&self, database: &str, table: &str) -> Option<TableSpec> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(&(database.to_string(), table.to_string()))
            .cloned()
    }

    /// Insert a table but report it as absent on the next existence
    /// check. Simulates a concurrent run creating the table after the
    /// check returned false.
    pub fn set_table_created_behind_check(&self, database: &str, spec: &TableSpec) {
        self.state
            .lock()
            .unwrap()
            .tables
            .insert((database.to_string(), spec.name.clone()), spec.clone());
        *self.hide_tables_once.lock().unwrap() = true;
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn database_exists(&self, name: &str) -> Result<bool, CatalogError> {
        Ok(self.state.lock().unwrap().databases.contains(name))
    }

    async fn create_database(&self, name: &str) -> Result<(), CatalogError> {
        let mut state = self.state.lock().unwrap();
        if !state.databases.insert(name.to_string()) {
            return Err(CatalogError::AlreadyExists {
                entity: name.to_string(),
            });
        }
        Ok(())
    }

    async fn table_exists(&self, database: &str, table: &str) -> Result<bool, CatalogError> {
        let mut hidden = self.hide_tables_once.lock().unwrap();
        if *hidden {
            *hidden = false;
            return Ok(false);
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .tables
            .contains_key(&(database.to_string(), table.to_string())))
    }

    async fn create_table(&self, database: &str, spec: &TableSpec) -> Result<(), CatalogError> {
        let mut state = self.state.lock().unwrap();
        let key = (database.to_string(), spec.name.clone());
        if state.tables.contains_key(&key) {
            return Err(CatalogError::AlreadyExists {
                entity: format!("{database}.{}", spec.name),
            });
        }
        state.tables.insert(key, spec.clone());
        Ok(())
    }

    async fn update_table(&self, database: &str, spec: &TableSpec) -> Result<(), CatalogError> {
        let mut state = self.state.lock().unwrap();
        let key = (database.to_string(), spec.name.clone());
        if !state.tables.contains_key(&key) {
            return Err(CatalogError::Service {
                operation: "update_table",
                message: format!("table {database}.{} does not exist", spec.name),
            });
        }
        state.tables.insert(key, spec.clone());
        Ok(())
    }
}
