//! In-memory registry mapping table identifiers to parsed tables

use crate::error::{Error, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Collection of loaded tables, keyed by identifier.
///
/// Backed by a BTreeMap so every iteration over the registry is in
/// lexicographic name order, which downstream graph and plan construction
/// rely on for deterministic output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableRegistry {
    tables: BTreeMap<String, Table>,
}

impl TableRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of tables
    pub fn from_tables(tables: Vec<Table>) -> Result<Self> {
        let mut registry = Self::new();
        for table in tables {
            registry.insert(table)?;
        }
        Ok(registry)
    }

    /// Register a table under its identifier
    pub fn insert(&mut self, table: Table) -> Result<()> {
        if self.tables.contains_key(&table.name) {
            return Err(Error::DuplicateTable(table.name));
        }
        self.tables.insert(table.name.clone(), table);
        Ok(())
    }

    /// Look up a table by identifier
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Look up a table by identifier, failing if absent
    pub fn expect(&self, name: &str) -> Result<&Table> {
        self.get(name)
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    /// Iterate over tables in name order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// All table identifiers in name order
    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
