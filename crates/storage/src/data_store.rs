//! Multi-table data store for Bitstore.
//!
//! A `DataStore` owns its tables in declaration order, parents first, and
//! the blob store they persist to. Relations are wired after every table
//! exists: each table gets views naming its related tables by position, and
//! referential checks look those tables up through [`Links`] on demand.

use crate::persist::{BlobStore, MemoryBlobStore};
use crate::table_store::{Links, RelationView, TableStore};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use bitstore_core::schema::{DataStoreDef, RelationDef, TableDef};
use bitstore_core::{Error, Record, Result, Value};
use core::fmt;
use core::ops::Deref;
use log::debug;

/// An ordered set of related tables with a shared blob store.
pub struct DataStore {
    def: DataStoreDef,
    tables: Vec<TableStore>,
    blobs: Box<dyn BlobStore>,
}

impl DataStore {
    /// Creates a data store persisting to memory.
    pub fn new(def: DataStoreDef) -> Result<Self> {
        Self::with_blob_store(def, Box::new(MemoryBlobStore::new()))
    }

    /// Creates a data store persisting to `blobs`.
    pub fn with_blob_store(def: DataStoreDef, blobs: Box<dyn BlobStore>) -> Result<Self> {
        def.validate()?;
        let mut tables = def
            .tables
            .iter()
            .cloned()
            .map(TableStore::new)
            .collect::<Result<Vec<_>>>()?;

        // second pass: every table exists, so positions resolve
        for (pos, table) in tables.iter_mut().enumerate() {
            let (parents, children) = Self::views_for(&def, pos, table)?;
            table.attach_relations(parents, children);
        }

        debug!(
            "data store {}: {} tables, {} relations",
            def.name,
            tables.len(),
            def.relations.len()
        );
        Ok(Self { def, tables, blobs })
    }

    fn views_for(
        def: &DataStoreDef,
        pos: usize,
        table: &TableStore,
    ) -> Result<(Vec<RelationView>, Vec<RelationView>)> {
        let name = def.tables[pos].name();
        let view = |own: &str, other_table: &str, other_column: &str| -> Result<RelationView> {
            Ok(RelationView {
                column: table.slot_for_col(own)?,
                table: def
                    .table_position(other_table)
                    .ok_or_else(|| Error::table_not_found(other_table))?,
                table_name: String::from(other_table),
                other_column: String::from(other_column),
            })
        };

        let mut parents = Vec::new();
        let mut children = Vec::new();
        for rel in &def.relations {
            if rel.child_table == name {
                parents.push(view(&rel.child_column, &rel.parent_table, &rel.parent_column)?);
            }
            if rel.parent_table == name {
                children.push(view(&rel.parent_column, &rel.child_table, &rel.child_column)?);
            }
        }
        Ok((parents, children))
    }

    /// Returns the store name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Returns the directory part of the persistence keys.
    #[inline]
    pub fn dirname(&self) -> &str {
        &self.def.dirname
    }

    /// Returns the relations.
    #[inline]
    pub fn relations(&self) -> &[RelationDef] {
        &self.def.relations
    }

    /// Returns the table definitions, parents first.
    #[inline]
    pub fn table_defs(&self) -> &[TableDef] {
        &self.def.tables
    }

    /// Returns the persistence key of a table: `"<dirname>/<table>"`.
    pub fn persistence_key(&self, table: &str) -> String {
        self.def.persistence_key(table)
    }

    /// Returns the blob store.
    pub fn blob_store(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    /// Returns the blob store mutably.
    pub fn blob_store_mut(&mut self) -> &mut dyn BlobStore {
        self.blobs.as_mut()
    }

    /// Returns every table, for referential checks run by hand.
    pub fn links(&self) -> Links<'_> {
        Links::new(&self.tables)
    }

    /// Checks if a table exists.
    pub fn has_table(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Gets a table.
    pub fn table(&self, name: &str) -> Result<&TableStore> {
        self.position(name)
            .map(|pos| &self.tables[pos])
            .ok_or_else(|| Error::table_not_found(name))
    }

    /// Gets a handle that mutates a table under the store's relations.
    pub fn table_mut(&mut self, name: &str) -> Result<TableMut<'_>> {
        let position = self
            .position(name)
            .ok_or_else(|| Error::table_not_found(name))?;
        Ok(TableMut { db: self, position })
    }

    /// Returns every table with its name, parents first.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableStore)> {
        self.tables.iter().map(|t| (t.name(), t))
    }

    /// Returns the names of tables with changed rows.
    pub fn tables_changed(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|t| !t.rows_changed().is_empty())
            .map(|t| t.name())
            .collect()
    }

    /// Clears every table's change masks.
    pub fn reset_all(&mut self) -> Result<()> {
        for table in &mut self.tables {
            table.reset_changed(None)?;
        }
        Ok(())
    }

    /// Empties every table.
    pub fn clear_all(&mut self) {
        self.tables.iter_mut().for_each(TableStore::clear);
    }

    /// Appends every table's saved rows, parents first, so that child rows
    /// find their parents. Returns the total number of rows loaded.
    ///
    /// Tables loaded before a failing table keep their rows.
    pub fn load_all(&mut self) -> Result<usize> {
        let mut total = 0;
        for pos in 0..self.tables.len() {
            let key = self.def.persistence_key(self.tables[pos].name());
            let bytes = self.blobs.load(&key)?;
            let rows = self.tables[pos].prepare_load(&bytes, &Links::new(&self.tables))?;
            total += self.tables[pos].commit_load(&key, rows)?;
        }
        debug!("data store {}: loaded {} rows", self.def.name, total);
        Ok(total)
    }

    /// Saves every table under its persistence key.
    pub fn save_all(&mut self) -> Result<()> {
        for table in &self.tables {
            let key = self.def.persistence_key(table.name());
            table.save_to(self.blobs.as_mut(), &key)?;
        }
        debug!("data store {}: saved {} tables", self.def.name, self.tables.len());
        Ok(())
    }

    /// Checks a row of `table` against its parent tables.
    pub fn validate_parents(&self, table: &str, row: &[Value]) -> Result<Vec<Error>> {
        Ok(self.table(table)?.validate_parents(row, &self.links()))
    }

    /// Checks whether child tables reference a row of `table`.
    pub fn validate_children(&self, table: &str, row: &[Value]) -> Result<Vec<Error>> {
        Ok(self.table(table)?.validate_children(row, &self.links()))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tables.iter().position(|t| t.name() == name)
    }
}

impl fmt::Debug for DataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("name", &self.def.name)
            .field("dirname", &self.def.dirname)
            .field("tables", &self.tables)
            .finish_non_exhaustive()
    }
}

/// A table borrowed mutably from its data store.
///
/// Mutations run with the store's relation views in effect, checking parent
/// and child rows in the sibling tables.
pub struct TableMut<'a> {
    db: &'a mut DataStore,
    position: usize,
}

impl TableMut<'_> {
    fn table(&self) -> &TableStore {
        &self.db.tables[self.position]
    }

    fn table_mut(&mut self) -> &mut TableStore {
        &mut self.db.tables[self.position]
    }

    /// Appends a row whose parents exist. Returns its position.
    pub fn append(&mut self, row: Vec<Value>) -> Result<usize> {
        let row = self.table().prepare_append(row, &self.db.links())?;
        self.table_mut().commit_append(row)
    }

    /// Appends a batch of rows. Either every row is stored or none is.
    pub fn extend(&mut self, rows: Vec<Vec<Value>>) -> Result<()> {
        let rows = self.table().prepare_extend(rows, &self.db.links())?;
        self.table_mut().commit_extend(rows)
    }

    /// Sets one value of the row with `key`.
    ///
    /// A row that references itself under a self-relation counts as its own
    /// child, so its key cannot change.
    pub fn set(&mut self, key: &[Value], column: &str, value: Value) -> Result<()> {
        let (slot, value) = self
            .table()
            .prepare_set(key, column, value, &self.db.links())?;
        self.table_mut().commit_set(slot, column, value)
    }

    /// Removes the row with `key` unless other rows reference it.
    pub fn pop(&mut self, key: &[Value]) -> Result<Record> {
        let slot = self.table().prepare_pop(key, &self.db.links())?;
        self.table_mut().commit_pop(slot)
    }

    /// Gets the row with `key` and clears its changed bits.
    pub fn fetch_key(&mut self, key: &[Value]) -> Result<Record> {
        self.table_mut().fetch_key(key)
    }

    /// Loads every table of the store.
    pub fn load(&mut self) -> Result<usize> {
        self.db.load_all()
    }

    /// Appends the rows saved under `key` to this table only.
    pub fn load_from(&mut self, key: &str) -> Result<usize> {
        let bytes = self.db.blobs.load(key)?;
        let rows = self.table().prepare_load(&bytes, &self.db.links())?;
        self.table_mut().commit_load(key, rows)
    }

    /// Saves every table of the store.
    pub fn save(&mut self) -> Result<()> {
        self.db.save_all()
    }

    /// Saves this table only, under `key`.
    pub fn save_to(&mut self, key: &str) -> Result<()> {
        let db = &mut *self.db;
        db.tables[self.position].save_to(db.blobs.as_mut(), key)
    }

    /// Clears the changed bit of one row, or every bit.
    pub fn reset_changed(&mut self, slot: Option<usize>) -> Result<()> {
        self.table_mut().reset_changed(slot)
    }

    /// Removes every row without checking child tables.
    pub fn clear(&mut self) {
        self.table_mut().clear();
    }

    /// Attaches an empty indexer.
    pub fn set_indexer(&mut self) {
        self.table_mut().set_indexer();
    }

    /// Indexes `column`.
    pub fn index_attr(&mut self, column: &str) -> Result<()> {
        self.table_mut().index_attr(column)
    }

    /// Stops indexing `column`. Returns whether it was indexed.
    pub fn drop_attr(&mut self, column: &str) -> bool {
        self.table_mut().drop_attr(column)
    }

    /// Rebuilds every indexed column.
    pub fn reindex(&mut self) {
        self.table_mut().reindex();
    }
}

impl Deref for TableMut<'_> {
    type Target = TableStore;

    fn deref(&self) -> &TableStore {
        self.table()
    }
}
