//! Relation definition for Bitstore schema.

use alloc::string::String;
use serde::{Deserialize, Serialize};

/// A parent/child reference between two tables of one data store.
///
/// A child row must reference an existing parent value when it is inserted
/// or its key changes. A parent row cannot be removed, or have the referenced
/// column changed, while any child row references it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationDef {
    /// Parent table name.
    pub parent_table: String,
    /// Parent column name.
    pub parent_column: String,
    /// Child table name.
    pub child_table: String,
    /// Child column name.
    pub child_column: String,
}

impl RelationDef {
    /// Creates a new relation.
    pub fn new(
        parent_table: impl Into<String>,
        parent_column: impl Into<String>,
        child_table: impl Into<String>,
        child_column: impl Into<String>,
    ) -> Self {
        Self {
            parent_table: parent_table.into(),
            parent_column: parent_column.into(),
            child_table: child_table.into(),
            child_column: child_column.into(),
        }
    }
}
