//! Schema module for Bitstore.
//!
//! Declarative, immutable definitions of columns, tables, relations and data
//! stores. Everything here is plain data and can be read from a serde
//! configuration document without running any store logic.

mod column;
mod relation;
mod store;
mod table;

pub use column::{ColumnDef, ColumnDefault};
pub use relation::RelationDef;
pub use store::DataStoreDef;
pub use table::{TableBuilder, TableDef};

use crate::error::{Error, Result};
use alloc::format;

/// Validates a name follows naming rules.
pub(crate) fn check_naming_rules(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return Err(Error::schema("Name cannot be empty")),
    };
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(Error::schema(format!(
            "Name must start with letter or underscore: {}",
            name
        )));
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::schema(format!(
            "Name contains invalid characters: {}",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naming_rules() {
        assert!(check_naming_rules("People").is_ok());
        assert!(check_naming_rules("_private2").is_ok());
        assert!(check_naming_rules("").is_err());
        assert!(check_naming_rules("2people").is_err());
        assert!(check_naming_rules("first-name").is_err());
    }
}
