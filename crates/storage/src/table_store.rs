//! Constrained table store for Bitstore.
//!
//! A `TableStore` is a [`TupleStore`] with a [`TableDef`]: typed columns,
//! defaults and a unique key. Inside a data store it also carries relation
//! views naming, by position, the tables it is parent or child of. Checks
//! that need those tables receive them as [`Links`].
//!
//! Every mutation validates first and writes only when validation passed,
//! so a rejected row or batch leaves the table untouched.

use crate::persist::{decode_rows, encode_rows, BlobStore};
use crate::tuple_store::TupleStore;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use bitstore_core::schema::TableDef;
use bitstore_core::{validate_and_coerce, Error, Record, Result, Value, ValueKind};
use core::fmt;
use core::ops::Deref;
use hashbrown::HashMap;
use log::{debug, warn};

/// The sibling tables a table's relation views point into.
#[derive(Clone, Copy)]
pub struct Links<'a> {
    tables: &'a [TableStore],
}

impl<'a> Links<'a> {
    /// No sibling tables; for tables outside a data store.
    pub const fn none() -> Self {
        Self { tables: &[] }
    }

    pub(crate) fn new(tables: &'a [TableStore]) -> Self {
        Self { tables }
    }

    fn table(&self, position: usize) -> Option<&'a TableStore> {
        self.tables.get(position)
    }
}

/// One side of a relation, seen from this table.
#[derive(Clone, Debug)]
pub(crate) struct RelationView {
    /// Storage position of the related column in this table.
    pub(crate) column: usize,
    /// Position of the other table in the data store.
    pub(crate) table: usize,
    pub(crate) table_name: String,
    /// Related column in the other table.
    pub(crate) other_column: String,
}

/// A typed table with a unique key and referential checks.
#[derive(Clone, Debug)]
pub struct TableStore {
    def: TableDef,
    store: TupleStore,
    kinds: Vec<ValueKind>,
    unique_slots: Vec<usize>,
    /// This table is the child: rows need an existing parent.
    parents: Vec<RelationView>,
    /// This table is the parent: rows may have children.
    children: Vec<RelationView>,
}

impl TableStore {
    /// Creates an empty table from its definition.
    pub fn new(def: TableDef) -> Result<Self> {
        def.validate()?;
        let store =
            TupleStore::with_column_defaults(def.name(), def.column_names(), def.defaults())?;
        let unique_slots = def
            .unique()
            .iter()
            .map(|name| store.slot_for_col(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            kinds: def.kinds(),
            def,
            store,
            unique_slots,
            parents: Vec::new(),
            children: Vec::new(),
        })
    }

    pub(crate) fn attach_relations(
        &mut self,
        parents: Vec<RelationView>,
        children: Vec<RelationView>,
    ) {
        debug!(
            "{}: {} parent and {} child relations",
            self.def.name(),
            parents.len(),
            children.len()
        );
        self.parents = parents;
        self.children = children;
    }

    /// Returns the table definition.
    #[inline]
    pub fn def(&self) -> &TableDef {
        &self.def
    }

    /// Returns the table name.
    #[inline]
    pub fn name(&self) -> &str {
        self.def.name()
    }

    /// Returns the blob key used by standalone `load`/`save`.
    #[inline]
    pub fn persistence_key(&self) -> &str {
        self.def.persistence_key()
    }

    /// Returns the unique key column names.
    #[inline]
    pub fn unique_columns(&self) -> &[String] {
        self.def.unique()
    }

    /// Returns the column kinds.
    #[inline]
    pub fn kinds(&self) -> &[ValueKind] {
        &self.kinds
    }

    // ---- keys ----

    /// Builds the unique key of a (possibly short) row.
    pub fn make_key(&self, row: &[Value]) -> Result<Vec<Value>> {
        let row = self.store.resolve_defaults(row.to_vec())?;
        let (row, _) = self.coerce_row(row);
        Ok(self.key_of(&row))
    }

    /// Returns every row's key, in row order.
    pub fn keys(&self) -> Vec<Vec<Value>> {
        (0..self.store.len()).map(|slot| self.key_at(slot)).collect()
    }

    /// Returns the position of the row with `key`.
    ///
    /// Searches the first key column (through its index bucket when it is
    /// indexed) and checks the remaining key columns of each candidate.
    pub fn find_unique(&self, key: &[Value]) -> Option<usize> {
        if key.len() != self.unique_slots.len() {
            return None;
        }
        let key: Vec<Value> = self
            .unique_slots
            .iter()
            .zip(key)
            .map(|(&col, v)| validate_and_coerce(&self.kinds[col], v.clone()).unwrap_or_else(|_| v.clone()))
            .collect();
        let first = &self.def.unique()[0];
        let data = self.store.columns();
        let mut start = 0;
        while let Ok(Some(slot)) = self.store.find(first, &key[0], start) {
            if self
                .unique_slots
                .iter()
                .zip(&key)
                .all(|(&col, v)| &data[col][slot] == v)
            {
                return Some(slot);
            }
            start = slot + 1;
        }
        None
    }

    /// Returns whether a live row already has `key`.
    #[inline]
    pub fn is_duplicate(&self, key: &[Value]) -> bool {
        self.find_unique(key).is_some()
    }

    // ---- validation ----

    /// Returns a type error for every cell not of its column's kind.
    pub fn validate_types(&self, row: &[Value]) -> Vec<Error> {
        match self.store.resolve_defaults(row.to_vec()) {
            Ok(row) => self.coerce_row(row).1,
            Err(e) => alloc::vec![e],
        }
    }

    /// Checks a whole column, or the stored one when `values` is `None`.
    pub fn check_column_types(&self, column: &str, values: Option<&[Value]>) -> Result<Vec<Error>> {
        let col = self.store.slot_for_col(column)?;
        let values = match values {
            Some(values) => values,
            None => &self.store.columns()[col],
        };
        Ok(values
            .iter()
            .filter_map(|v| validate_and_coerce(&self.kinds[col], v.clone()).err())
            .collect())
    }

    /// Returns an error for every relation where this row's value has no
    /// parent row.
    pub fn validate_parents(&self, row: &[Value], links: &Links<'_>) -> Vec<Error> {
        match self.store.resolve_defaults(row.to_vec()) {
            Ok(row) => self.parent_errors(&self.coerce_row(row).0, links),
            Err(e) => alloc::vec![e],
        }
    }

    /// Returns whether every parent this row references exists.
    pub fn parents_exist(&self, row: &[Value], links: &Links<'_>) -> bool {
        self.validate_parents(row, links).is_empty()
    }

    /// Returns one entry per relation under which rows of a child table
    /// reference this row. Non-empty means the row may not be removed or
    /// re-keyed.
    pub fn validate_children(&self, row: &[Value], links: &Links<'_>) -> Vec<Error> {
        match self.store.resolve_defaults(row.to_vec()) {
            Ok(row) => self.child_errors(&self.coerce_row(row).0, None, None, links),
            Err(e) => alloc::vec![e],
        }
    }

    /// Returns whether any child row references this row.
    pub fn children_exist(&self, row: &[Value], links: &Links<'_>) -> bool {
        !self.validate_children(row, links).is_empty()
    }

    /// Validates types, the key (absent when `add`, present otherwise) and
    /// parent references.
    pub fn validate_row(&self, row: &[Value], add: bool, links: &Links<'_>) -> Vec<Error> {
        match self.check_row(row.to_vec(), add, links) {
            Ok((_, errors)) => errors,
            Err(e) => alloc::vec![e],
        }
    }

    // ---- reads ----

    /// Gets the row with `key`.
    pub fn get_key(&self, key: &[Value]) -> Result<Record> {
        self.store.get_row(self.slot_of(key)?)
    }

    /// Gets the row with `key` and clears its changed bits.
    pub fn fetch_key(&mut self, key: &[Value]) -> Result<Record> {
        let slot = self.slot_of(key)?;
        self.store.fetch_row(slot)
    }

    /// Gets one value of the row with `key`.
    pub fn get(&self, key: &[Value], column: &str) -> Result<&Value> {
        self.store.get(self.slot_of(key)?, column)
    }

    /// Returns every row. Record cells are left in their generic tuple form
    /// unless `resolve_types` is set.
    pub fn dump(&self, resolve_types: bool) -> Vec<Record> {
        let ty = self.store.record_type();
        self.store
            .as_list()
            .iter()
            .map(|row| {
                if resolve_types {
                    row
                } else {
                    row.into_iter().map(Value::into_generic).collect()
                }
            })
            .filter_map(|row| Record::new(ty.clone(), row))
            .collect()
    }

    /// Restores cells decoded from a snapshot. Record-shaped cells become
    /// tuples, or with `resolve_types` the column's record type where
    /// possible. Float columns get their non-finite values back.
    pub fn fix_types(&self, mut rows: Vec<Vec<Value>>, resolve_types: bool) -> Vec<Vec<Value>> {
        for (col, kind) in self.kinds.iter().enumerate() {
            if !kind.is_tuple_like() && *kind != ValueKind::Float {
                continue;
            }
            for row in &mut rows {
                if let Some(cell) = row.get_mut(col) {
                    let value = core::mem::replace(cell, Value::Null);
                    *cell = match kind {
                        ValueKind::Float => value.restore_float(),
                        ValueKind::Record(_) if resolve_types => {
                            validate_and_coerce(kind, value.clone()).unwrap_or(value)
                        }
                        _ => value.into_generic(),
                    };
                }
            }
        }
        rows
    }

    // ---- standalone mutations ----

    /// Appends a validated row and returns its position.
    pub fn append(&mut self, row: Vec<Value>) -> Result<usize> {
        let row = self.prepare_append(row, &Links::none())?;
        self.commit_append(row)
    }

    /// Appends a batch of rows. Either every row is stored or none is.
    pub fn extend(&mut self, rows: Vec<Vec<Value>>) -> Result<()> {
        let rows = self.prepare_extend(rows, &Links::none())?;
        self.commit_extend(rows)
    }

    /// Sets one value of the row with `key`.
    pub fn set(&mut self, key: &[Value], column: &str, value: Value) -> Result<()> {
        let (slot, value) = self.prepare_set(key, column, value, &Links::none())?;
        self.commit_set(slot, column, value)
    }

    /// Removes the row with `key` and returns it.
    pub fn pop(&mut self, key: &[Value]) -> Result<Record> {
        let slot = self.prepare_pop(key, &Links::none())?;
        self.commit_pop(slot)
    }

    /// Appends the rows saved under this table's persistence key.
    pub fn load(&mut self, blobs: &dyn BlobStore) -> Result<usize> {
        let key = String::from(self.persistence_key());
        self.load_from(blobs, &key)
    }

    /// Appends the rows saved under `key`. Returns the number of rows loaded.
    pub fn load_from(&mut self, blobs: &dyn BlobStore, key: &str) -> Result<usize> {
        let rows = self.prepare_load(&blobs.load(key)?, &Links::none())?;
        self.commit_load(key, rows)
    }

    /// Saves a snapshot under this table's persistence key.
    pub fn save(&self, blobs: &mut dyn BlobStore) -> Result<()> {
        self.save_to(blobs, self.persistence_key())
    }

    /// Saves a snapshot under `key`.
    pub fn save_to(&self, blobs: &mut dyn BlobStore, key: &str) -> Result<()> {
        let rows: Vec<Vec<Value>> = self.dump(false).into_iter().map(Record::into_values).collect();
        blobs.save(key, &encode_rows(&rows)?)?;
        debug!("{}: saved {} rows to {}", self.name(), rows.len(), key);
        Ok(())
    }

    // ---- pass-throughs ----

    /// Clears the changed bit of one row, or every bit.
    pub fn reset_changed(&mut self, slot: Option<usize>) -> Result<()> {
        self.store.reset_changed(slot)
    }

    /// Removes every row and clears the index.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Attaches an empty indexer.
    pub fn set_indexer(&mut self) {
        self.store.set_indexer();
    }

    /// Indexes `column`.
    pub fn index_attr(&mut self, column: &str) -> Result<()> {
        self.store.index_attr(column)
    }

    /// Stops indexing `column`.
    pub fn drop_attr(&mut self, column: &str) -> bool {
        self.store.drop_attr(column)
    }

    /// Rebuilds every indexed column.
    pub fn reindex(&mut self) {
        self.store.reindex();
    }

    // ---- validate-then-commit steps ----

    pub(crate) fn prepare_append(&self, row: Vec<Value>, links: &Links<'_>) -> Result<Vec<Value>> {
        let (row, errors) = self.check_row(row, true, links)?;
        match errors.into_iter().next() {
            Some(e) => {
                warn!("{}: rejected row: {}", self.name(), e);
                Err(e)
            }
            None => Ok(row),
        }
    }

    pub(crate) fn commit_append(&mut self, row: Vec<Value>) -> Result<usize> {
        self.store.append(row)
    }

    pub(crate) fn prepare_extend(
        &self,
        rows: Vec<Vec<Value>>,
        links: &Links<'_>,
    ) -> Result<Vec<Vec<Value>>> {
        let mut checked = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();
        let mut batch_keys: HashMap<Vec<Value>, usize> = HashMap::new();
        for (i, row) in rows.into_iter().enumerate() {
            let (row, row_errors) = match self.check_row(row, true, links) {
                Ok(checked) => checked,
                Err(e) => {
                    errors.push((i, e));
                    continue;
                }
            };
            errors.extend(row_errors.into_iter().map(|e| (i, e)));
            let key = self.key_of(&row);
            if batch_keys.contains_key(&key) {
                errors.push((i, Error::duplicate_key(self.name(), key)));
            } else {
                batch_keys.insert(key, i);
            }
            checked.push(row);
        }
        if !errors.is_empty() {
            warn!("{}: rejected batch, {} errors", self.name(), errors.len());
            return Err(Error::batch(self.name(), errors));
        }
        Ok(checked)
    }

    pub(crate) fn commit_extend(&mut self, rows: Vec<Vec<Value>>) -> Result<()> {
        self.store.extend(rows)
    }

    pub(crate) fn prepare_set(
        &self,
        key: &[Value],
        column: &str,
        value: Value,
        links: &Links<'_>,
    ) -> Result<(usize, Value)> {
        let slot = self.slot_of(key)?;
        let col = self.store.slot_for_col(column)?;
        let value = validate_and_coerce(&self.kinds[col], value)?;
        let current = self.store.as_list().get_row(slot)?;
        if current[col] == value {
            return Ok((slot, value));
        }

        let key_change = self.def.is_unique_column(column);
        // a re-keyed row must have no children at all
        let only = if key_change { None } else { Some(col) };
        if let Some(e) = self.child_errors(&current, only, None, links).into_iter().next() {
            warn!("{}: rejected set of {}: {}", self.name(), column, e);
            return Err(e);
        }

        let mut row = current;
        row[col] = value.clone();
        if key_change {
            let new_key = self.key_of(&row);
            if self.is_duplicate(&new_key) {
                return Err(Error::duplicate_key(self.name(), new_key));
            }
        }
        if let Some(e) = self.parent_errors(&row, links).into_iter().next() {
            warn!("{}: rejected set of {}: {}", self.name(), column, e);
            return Err(e);
        }
        Ok((slot, value))
    }

    pub(crate) fn commit_set(&mut self, slot: usize, column: &str, value: Value) -> Result<()> {
        self.store.set(slot, column, value)?;
        Ok(())
    }

    pub(crate) fn prepare_pop(&self, key: &[Value], links: &Links<'_>) -> Result<usize> {
        let slot = self.slot_of(key)?;
        let row = self.store.as_list().get_row(slot)?;
        // a row referencing itself does not keep itself alive
        if let Some(e) = self.child_errors(&row, None, Some(slot), links).into_iter().next() {
            warn!("{}: rejected pop: {}", self.name(), e);
            return Err(e);
        }
        Ok(slot)
    }

    pub(crate) fn commit_pop(&mut self, slot: usize) -> Result<Record> {
        self.store.pop(slot)
    }

    pub(crate) fn prepare_load(&self, bytes: &[u8], links: &Links<'_>) -> Result<Vec<Vec<Value>>> {
        let rows = self.fix_types(decode_rows(bytes)?, false);
        self.prepare_extend(rows, links)
    }

    pub(crate) fn commit_load(&mut self, key: &str, rows: Vec<Vec<Value>>) -> Result<usize> {
        let count = rows.len();
        self.commit_extend(rows)?;
        debug!("{}: loaded {} rows from {}", self.name(), count, key);
        Ok(count)
    }

    // ---- helpers ----

    /// Resolves defaults and kinds, then collects type, key and parent errors.
    fn check_row(
        &self,
        row: Vec<Value>,
        add: bool,
        links: &Links<'_>,
    ) -> Result<(Vec<Value>, Vec<Error>)> {
        let row = self.store.resolve_defaults(row)?;
        let (row, mut errors) = self.coerce_row(row);
        let key = self.key_of(&row);
        match (add, self.is_duplicate(&key)) {
            (true, true) => errors.push(Error::duplicate_key(self.name(), key)),
            (false, false) => errors.push(Error::not_found(self.name(), key)),
            _ => {}
        }
        errors.extend(self.parent_errors(&row, links));
        Ok((row, errors))
    }

    fn coerce_row(&self, row: Vec<Value>) -> (Vec<Value>, Vec<Error>) {
        let mut errors = Vec::new();
        let row = row
            .into_iter()
            .zip(&self.kinds)
            .map(|(value, kind)| match validate_and_coerce(kind, value.clone()) {
                Ok(v) => v,
                Err(e) => {
                    errors.push(e);
                    value
                }
            })
            .collect();
        (row, errors)
    }

    fn parent_errors(&self, row: &[Value], links: &Links<'_>) -> Vec<Error> {
        let mut errors = Vec::new();
        for view in &self.parents {
            let value = &row[view.column];
            if value.is_null() {
                continue;
            }
            let found = match links.table(view.table) {
                Some(parent) => matches!(parent.find(&view.other_column, value, 0), Ok(Some(_))),
                None => false,
            };
            if !found {
                errors.push(Error::referential(
                    self.name(),
                    format!("key {} has no parent in {}", value, view.table_name),
                ));
            }
        }
        errors
    }

    /// Counts child rows per relation. `only` limits the check to relations
    /// on one column; `skip` is a slot of this table not counted as a child
    /// under self-relations.
    fn child_errors(
        &self,
        row: &[Value],
        only: Option<usize>,
        skip: Option<usize>,
        links: &Links<'_>,
    ) -> Vec<Error> {
        let mut errors = Vec::new();
        for view in &self.children {
            if only.map_or(false, |col| col != view.column) {
                continue;
            }
            let value = &row[view.column];
            if value.is_null() {
                continue;
            }
            let Some(child) = links.table(view.table) else {
                errors.push(Error::referential(
                    self.name(),
                    format!("child table {} is not available", view.table_name),
                ));
                continue;
            };
            let own = view.table_name == self.name();
            let count = child
                .find_all(&view.other_column, value)
                .map_or(0, |rows| {
                    rows.iter()
                        .filter(|&&slot| !(own && Some(slot) == skip))
                        .count()
                });
            if count > 0 {
                errors.push(Error::referential(
                    self.name(),
                    format!("key {} has {} children in {}", value, count, view.table_name),
                ));
            }
        }
        errors
    }

    fn key_of(&self, row: &[Value]) -> Vec<Value> {
        self.unique_slots.iter().map(|&col| row[col].clone()).collect()
    }

    fn key_at(&self, slot: usize) -> Vec<Value> {
        let data = self.store.columns();
        self.unique_slots
            .iter()
            .map(|&col| data[col][slot].clone())
            .collect()
    }

    fn slot_of(&self, key: &[Value]) -> Result<usize> {
        self.find_unique(key)
            .ok_or_else(|| Error::not_found(self.name(), key.to_vec()))
    }
}

impl Deref for TableStore {
    type Target = TupleStore;

    fn deref(&self) -> &TupleStore {
        &self.store
    }
}

impl fmt::Display for TableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Table name   {}", self.name())?;
        writeln!(f, "Key          {}", self.persistence_key())?;
        writeln!(f, "Unique       {:?}", self.unique_columns())?;
        writeln!(f, "Length       {}", self.store.len())?;
        for (name, column) in self.store.column_names().iter().zip(self.store.columns()) {
            write!(f, "Column {} [", name)?;
            for (i, value) in column.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", value)?;
            }
            writeln!(f, "]")?;
        }
        if let Some(index) = self.store.index() {
            writeln!(f, "Index")?;
            for column in index.indexed_columns() {
                write!(f, "  {}", column)?;
                if let Some(buckets) = index.buckets(column) {
                    let mut buckets: Vec<_> = buckets.iter().collect();
                    buckets.sort_by(|a, b| a.0.cmp(b.0));
                    for (value, rows) in buckets {
                        write!(f, " {}={}", value, rows)?;
                    }
                }
                writeln!(f)?;
            }
        }
        write!(f, "Columns changed [")?;
        for (i, mask) in self.store.changed().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", mask)?;
        }
        writeln!(f, "]")?;
        writeln!(f, "Rows changed   {}", self.store.rows_changed())
    }
}
