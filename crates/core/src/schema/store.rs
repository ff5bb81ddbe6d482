//! Data store definition for Bitstore schema.

use super::check_naming_rules;
use super::relation::RelationDef;
use super::table::TableDef;
use crate::error::{Error, Result};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// An ordered set of tables plus the relations between them.
///
/// Tables are listed parent-before-child. Every table is persisted under
/// `"<dirname>/<table name>"`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataStoreDef {
    /// Store name.
    pub name: String,
    /// Directory part of every table's persistence key.
    pub dirname: String,
    /// Tables, parents first.
    pub tables: Vec<TableDef>,
    /// Relations between the tables.
    #[serde(default)]
    pub relations: Vec<RelationDef>,
}

impl DataStoreDef {
    /// Creates a data store definition; `dirname` defaults to the store name.
    pub fn new(name: impl Into<String>, tables: Vec<TableDef>) -> Self {
        let name = name.into();
        Self {
            dirname: name.clone(),
            name,
            tables,
            relations: Vec::new(),
        }
    }

    /// Sets the directory part of the persistence keys.
    pub fn dirname(mut self, dirname: impl Into<String>) -> Self {
        self.dirname = dirname.into();
        self
    }

    /// Adds a relation.
    pub fn relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Returns the position of a table by name.
    pub fn table_position(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name() == name)
    }

    /// Returns the persistence key of a table.
    pub fn persistence_key(&self, table: &str) -> String {
        format!("{}/{}", self.dirname, table)
    }

    /// Checks every table, rejects duplicate table names, and checks that
    /// relations name existing tables and columns with the parent declared
    /// no later than the child.
    pub fn validate(&self) -> Result<()> {
        check_naming_rules(&self.name)?;
        for (i, table) in self.tables.iter().enumerate() {
            table.validate()?;
            if self.tables[..i].iter().any(|t| t.name() == table.name()) {
                return Err(Error::schema(format!(
                    "Duplicate table name: {}",
                    table.name()
                )));
            }
        }
        for rel in &self.relations {
            let parent = self.resolve(&rel.parent_table, &rel.parent_column)?;
            let child = self.resolve(&rel.child_table, &rel.child_column)?;
            if parent > child {
                return Err(Error::schema(format!(
                    "Parent table {} must be declared before child table {}",
                    rel.parent_table, rel.child_table
                )));
            }
        }
        Ok(())
    }

    fn resolve(&self, table: &str, column: &str) -> Result<usize> {
        let pos = self
            .table_position(table)
            .ok_or_else(|| Error::table_not_found(table))?;
        if self.tables[pos].get_column(column).is_none() {
            return Err(Error::column_not_found(table, column));
        }
        Ok(pos)
    }
}
