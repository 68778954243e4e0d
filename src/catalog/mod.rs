//! The table registry: maps table names and ids to their heap files, schemas
//! and primary key columns. Tables are registered at startup (or when a table
//! is created) and looked up by every scan and mutation.

use std::sync::Arc;

use dashmap::DashMap;

use crate::common::TableId;
use crate::error::{DbError, Result};
use crate::storage::heap_file::HeapFile;
use crate::tuple::schema::TupleDesc;

struct TableEntry {
    file: Arc<HeapFile>,
    name: String,
    primary_key: String,
}

pub struct Catalog {
    table_name_to_id: DashMap<String, TableId>,
    tables: DashMap<TableId, TableEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            table_name_to_id: DashMap::new(),
            tables: DashMap::new(),
        }
    }

    /// Registers a table under the given name. The table id is the one the
    /// heap file derived from its path. Re-registering a name replaces the
    /// previous binding.
    pub fn add_table(&self, file: HeapFile, name: &str, primary_key: &str) -> TableId {
        let table_id = file.table_id();
        self.tables.insert(
            table_id,
            TableEntry {
                file: Arc::new(file),
                name: name.to_owned(),
                primary_key: primary_key.to_owned(),
            },
        );
        self.table_name_to_id.insert(name.to_owned(), table_id);
        table_id
    }

    pub fn file_for(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        self.tables
            .get(&table_id)
            .map(|entry| entry.file.clone())
            .ok_or_else(|| DbError::NoSuchElement(format!("no table with id {}", table_id)))
    }

    pub fn desc_for(&self, table_id: TableId) -> Result<TupleDesc> {
        self.tables
            .get(&table_id)
            .map(|entry| entry.file.desc().clone())
            .ok_or_else(|| DbError::NoSuchElement(format!("no table with id {}", table_id)))
    }

    pub fn name_for(&self, table_id: TableId) -> Result<String> {
        self.tables
            .get(&table_id)
            .map(|entry| entry.name.clone())
            .ok_or_else(|| DbError::NoSuchElement(format!("no table with id {}", table_id)))
    }

    pub fn primary_key_for(&self, table_id: TableId) -> Result<String> {
        self.tables
            .get(&table_id)
            .map(|entry| entry.primary_key.clone())
            .ok_or_else(|| DbError::NoSuchElement(format!("no table with id {}", table_id)))
    }

    pub fn id_for(&self, name: &str) -> Result<TableId> {
        self.table_name_to_id
            .get(name)
            .map(|entry| *entry.value())
            .ok_or_else(|| DbError::NoSuchElement(format!("no table named {}", name)))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.table_name_to_id
            .iter()
            .map(|entry| entry.key().to_owned())
            .collect()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::Catalog;
    use crate::storage::heap_file::HeapFile;
    use crate::tuple::schema::{TdItem, TupleDesc, Type};

    fn accounts_desc() -> TupleDesc {
        TupleDesc::new(vec![
            TdItem::named(Type::Int, "id"),
            TdItem::named(Type::Text, "name"),
        ])
    }

    #[test]
    fn registered_tables_can_be_looked_up() -> Result<()> {
        let data_dir = tempdir()?;
        let catalog = Catalog::new();

        let file = HeapFile::new(data_dir.path().join("accounts"), accounts_desc())?;
        let table_id = catalog.add_table(file, "accounts", "id");

        assert_eq!(catalog.id_for("accounts")?, table_id);
        assert_eq!(catalog.name_for(table_id)?, "accounts");
        assert_eq!(catalog.primary_key_for(table_id)?, "id");
        assert_eq!(catalog.desc_for(table_id)?, accounts_desc());
        assert_eq!(catalog.file_for(table_id)?.table_id(), table_id);
        Ok(())
    }

    #[test]
    fn missing_tables_are_reported() {
        let catalog = Catalog::new();
        assert!(catalog.id_for("nope").is_err());
        assert!(catalog.file_for(1).is_err());
        assert!(catalog.desc_for(1).is_err());
    }

    #[test]
    fn re_registering_a_name_replaces_the_binding() -> Result<()> {
        let data_dir = tempdir()?;
        let catalog = Catalog::new();

        let first = HeapFile::new(data_dir.path().join("first"), accounts_desc())?;
        catalog.add_table(first, "accounts", "id");

        let second = HeapFile::new(data_dir.path().join("second"), accounts_desc())?;
        let second_id = catalog.add_table(second, "accounts", "id");

        assert_eq!(catalog.id_for("accounts")?, second_id);
        Ok(())
    }
}
