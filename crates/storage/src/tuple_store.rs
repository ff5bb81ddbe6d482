//! Record view over a `ListStore`.
//!
//! A `TupleStore` returns rows as immutable [`Record`]s of a type derived
//! once from the store name and column names. Everything else is the
//! underlying [`ListStore`], reachable through `Deref`.

use crate::list_store::ListStore;
use alloc::format;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use bitstore_core::schema::ColumnDefault;
use bitstore_core::{Error, Record, RecordType, Result, Value};
use bitstore_index::Bitset;
use core::ops::{Deref, DerefMut};

/// A `ListStore` whose rows read back as named records.
#[derive(Clone, Debug)]
pub struct TupleStore {
    list: ListStore,
    record_type: Arc<RecordType>,
}

impl TupleStore {
    /// Creates a store with right-aligned defaults; records are named `name`.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        defaults: Vec<ColumnDefault>,
    ) -> Result<Self> {
        Ok(Self::wrap(ListStore::new(name, columns, defaults)?))
    }

    /// Creates a store with one optional default per column.
    pub fn with_column_defaults(
        name: impl Into<String>,
        columns: Vec<String>,
        defaults: Vec<Option<ColumnDefault>>,
    ) -> Result<Self> {
        Ok(Self::wrap(ListStore::with_column_defaults(
            name, columns, defaults,
        )?))
    }

    fn wrap(list: ListStore) -> Self {
        let record_type = Arc::new(RecordType::new(list.name(), list.column_names().iter().cloned()));
        Self { list, record_type }
    }

    /// Returns the row record type.
    #[inline]
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.record_type
    }

    /// Returns the underlying list store.
    #[inline]
    pub fn as_list(&self) -> &ListStore {
        &self.list
    }

    /// Builds a record from `values` after filling defaults, without storing it.
    pub fn make_record(&self, values: Vec<Value>) -> Result<Record> {
        let row = self.list.resolve_defaults(values)?;
        self.record(row)
    }

    /// Gets a row as a record.
    pub fn get_row(&self, slot: usize) -> Result<Record> {
        self.record(self.list.get_row(slot)?)
    }

    /// Gets a row as a record and clears its changed bits.
    pub fn fetch_row(&mut self, slot: usize) -> Result<Record> {
        let row = self.list.fetch_row(slot)?;
        self.record(row)
    }

    /// Gets the rows whose bits are set in `mask`.
    pub fn get_rows(&self, mask: &Bitset) -> Result<Vec<Record>> {
        mask.iter().map(|slot| self.get_row(slot)).collect()
    }

    /// Gets the rows at the listed positions, in list order.
    pub fn get_rows_at(&self, slots: &[usize]) -> Result<Vec<Record>> {
        slots.iter().map(|&slot| self.get_row(slot)).collect()
    }

    /// Removes a row and returns it as a record.
    pub fn pop(&mut self, slot: usize) -> Result<Record> {
        let row = self.list.pop(slot)?;
        self.record(row)
    }

    /// Returns an iterator over rows as records.
    pub fn iter(&self) -> impl Iterator<Item = Record> + '_ {
        self.list
            .iter()
            .filter_map(move |row| Record::new(self.record_type.clone(), row))
    }

    /// Returns every row as a record.
    pub fn dump(&self) -> Vec<Record> {
        self.iter().collect()
    }

    pub(crate) fn record(&self, row: Vec<Value>) -> Result<Record> {
        let len = row.len();
        Record::new(self.record_type.clone(), row).ok_or_else(|| {
            Error::schema(format!(
                "Row has {} values, record {} takes {}",
                len,
                self.record_type.name(),
                self.record_type.arity()
            ))
        })
    }
}

impl Deref for TupleStore {
    type Target = ListStore;

    fn deref(&self) -> &ListStore {
        &self.list
    }
}

impl DerefMut for TupleStore {
    fn deref_mut(&mut self) -> &mut ListStore {
        &mut self.list
    }
}
