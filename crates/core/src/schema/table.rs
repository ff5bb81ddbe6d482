//! Table definition for Bitstore schema.

use super::check_naming_rules;
use super::column::{ColumnDef, ColumnDefault};
use crate::error::{Error, Result};
use crate::kind::ValueKind;
use crate::value::Value;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use serde::{Deserialize, Serialize};

/// A table definition: ordered columns plus the columns forming the unique key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableDef {
    /// Table name.
    name: String,
    /// Column definitions, in storage order.
    columns: Vec<ColumnDef>,
    /// Names of the columns forming the unique key, in key order.
    unique: Vec<String>,
    /// Blob key used when the table is saved outside a data store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    persistence_key: Option<String>,
}

impl TableDef {
    /// Creates a table definition, checking it the same way `TableBuilder` does.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<ColumnDef>,
        unique: Vec<String>,
    ) -> Result<Self> {
        let def = Self {
            name: name.into(),
            columns,
            unique,
            persistence_key: None,
        };
        def.validate()?;
        Ok(def)
    }

    /// Overrides the blob key used for standalone load/save.
    pub fn with_persistence_key(mut self, key: impl Into<String>) -> Self {
        self.persistence_key = Some(key.into());
        self
    }

    /// Checks names, column uniqueness and the unique-column list.
    ///
    /// Definitions read from configuration skip the builder, so stores run
    /// this again on construction.
    pub fn validate(&self) -> Result<()> {
        check_naming_rules(&self.name)?;
        for (i, col) in self.columns.iter().enumerate() {
            check_naming_rules(col.name())?;
            if self.columns[..i].iter().any(|c| c.name() == col.name()) {
                return Err(Error::schema(format!(
                    "Column already exists: {}",
                    col.name()
                )));
            }
        }
        if self.unique.is_empty() {
            return Err(Error::schema(format!(
                "Table {} declares no unique columns",
                self.name
            )));
        }
        for (i, name) in self.unique.iter().enumerate() {
            if self.get_column_index(name).is_none() {
                return Err(Error::column_not_found(&self.name, name));
            }
            if self.unique[..i].contains(name) {
                return Err(Error::schema(format!(
                    "Unique column listed twice: {}",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the columns.
    #[inline]
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Returns the unique column names.
    #[inline]
    pub fn unique(&self) -> &[String] {
        &self.unique
    }

    /// Returns the blob key for standalone load/save; the table name unless overridden.
    pub fn persistence_key(&self) -> &str {
        self.persistence_key.as_deref().unwrap_or(&self.name)
    }

    /// Gets a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Gets a column index by name.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Returns whether `name` is part of the unique key.
    pub fn is_unique_column(&self, name: &str) -> bool {
        self.unique.iter().any(|u| u == name)
    }

    /// Returns the column names in storage order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    /// Returns the per-column default sources in storage order.
    pub fn defaults(&self) -> Vec<Option<ColumnDefault>> {
        self.columns.iter().map(ColumnDef::default_source).collect()
    }

    /// Returns the value kinds in storage order.
    pub fn kinds(&self) -> Vec<ValueKind> {
        self.columns.iter().map(|c| c.kind().clone()).collect()
    }
}

/// Builder for creating table definitions.
pub struct TableBuilder {
    name: String,
    columns: Vec<ColumnDef>,
    unique: Vec<String>,
    persistence_key: Option<String>,
}

impl TableBuilder {
    /// Creates a new table builder.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_naming_rules(&name)?;
        Ok(Self {
            name,
            columns: Vec::new(),
            unique: Vec::new(),
            persistence_key: None,
        })
    }

    /// Adds a column without a default.
    pub fn add_column(self, name: impl Into<String>, kind: ValueKind) -> Result<Self> {
        self.add_column_def(ColumnDef::new(name, kind))
    }

    /// Adds a column with a static default.
    pub fn add_column_with_default(
        self,
        name: impl Into<String>,
        kind: ValueKind,
        default: impl Into<Value>,
    ) -> Result<Self> {
        self.add_column_def(ColumnDef::new(name, kind).default_value(default))
    }

    /// Adds a fully specified column.
    pub fn add_column_def(mut self, column: ColumnDef) -> Result<Self> {
        check_naming_rules(column.name())?;
        if self.columns.iter().any(|c| c.name() == column.name()) {
            return Err(Error::schema(format!(
                "Column already exists: {}",
                column.name()
            )));
        }
        self.columns.push(column);
        Ok(self)
    }

    /// Declares the unique key columns.
    pub fn add_unique(mut self, columns: &[&str]) -> Result<Self> {
        for name in columns {
            if !self.columns.iter().any(|c| c.name() == *name) {
                return Err(Error::column_not_found(&self.name, *name));
            }
            if !self.unique.iter().any(|u| u == name) {
                self.unique.push(name.to_string());
            }
        }
        Ok(self)
    }

    /// Overrides the blob key used for standalone load/save.
    pub fn persistence_key(mut self, key: impl Into<String>) -> Self {
        self.persistence_key = Some(key.into());
        self
    }

    /// Builds the table definition.
    pub fn build(self) -> Result<TableDef> {
        let def = TableDef {
            name: self.name,
            columns: self.columns,
            unique: self.unique,
            persistence_key: self.persistence_key,
        };
        def.validate()?;
        Ok(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn people() -> TableDef {
        TableBuilder::new("People")
            .unwrap()
            .add_column("name", ValueKind::Str)
            .unwrap()
            .add_column_with_default("address", ValueKind::Str, "<unknown>")
            .unwrap()
            .add_column_with_default("phone", ValueKind::Str, "<unknown>")
            .unwrap()
            .add_unique(&["name"])
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_table_builder() {
        let table = people();
        assert_eq!(table.name(), "People");
        assert_eq!(table.columns().len(), 3);
        assert_eq!(table.unique(), &["name".to_string()]);
        assert!(table.is_unique_column("name"));
        assert!(!table.is_unique_column("phone"));
    }

    #[test]
    fn test_table_get_column() {
        let table = people();
        assert!(table.get_column("name").is_some());
        assert_eq!(table.get_column_index("phone"), Some(2));
        assert!(table.get_column("unknown").is_none());
    }

    #[test]
    fn test_defaults_follow_columns() {
        let defaults = people().defaults();
        assert!(defaults[0].is_none());
        assert_eq!(
            defaults[2].as_ref().map(|d| d.resolve()),
            Some(Value::from("<unknown>"))
        );
    }

    #[test]
    fn test_invalid_column_name() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("123invalid", ValueKind::Int);
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_column() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("id", ValueKind::Int)
            .unwrap()
            .add_column("id", ValueKind::Int);
        assert!(result.is_err());
    }

    #[test]
    fn test_unique_required() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("id", ValueKind::Int)
            .unwrap()
            .build();
        assert!(matches!(result, Err(Error::Schema { .. })));
    }

    #[test]
    fn test_unique_must_exist() {
        let result = TableBuilder::new("test")
            .unwrap()
            .add_column("id", ValueKind::Int)
            .unwrap()
            .add_unique(&["missing"]);
        assert!(matches!(result, Err(Error::ColumnNotFound { .. })));
    }

    #[test]
    fn test_persistence_key() {
        assert_eq!(people().persistence_key(), "People");
        let def = people().with_persistence_key("people_v2");
        assert_eq!(def.persistence_key(), "people_v2");
    }

    #[test]
    fn test_table_def_from_config() {
        let def: TableDef = serde_json::from_str(
            r#"{
                "name": "Pets",
                "columns": [
                    {"name": "pet", "kind": "str"},
                    {"name": "owner", "kind": "str", "default": "nobody"}
                ],
                "unique": ["pet"]
            }"#,
        )
        .unwrap();
        assert!(def.validate().is_ok());
        assert_eq!(def.column_names(), vec!["pet".to_string(), "owner".to_string()]);

        let bad = TableDef::new("Pets", vec![ColumnDef::new("pet", ValueKind::Str)], vec![]);
        assert!(bad.is_err());
    }
}
