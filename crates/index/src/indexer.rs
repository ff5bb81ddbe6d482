//! Value-to-rows secondary index.
//!
//! For every indexed column the `Indexer` keeps a map from each indexable
//! value to the [`Bitset`] of row positions holding it. For a column:
//!
//! - the union of all buckets is the set of rows whose value is indexable;
//! - buckets are pairwise disjoint, so each row sits in exactly one bucket;
//! - no bucket is empty.
//!
//! The indexer does not own the rows. Operations that rebuild buckets take
//! the column-major storage by reference.

use crate::bitset::Bitset;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use bitstore_core::{Error, Result, Value};
use hashbrown::HashMap;

/// Buckets of one column: value to row positions.
pub type IndexMap = HashMap<Value, Bitset>;

#[derive(Clone, Debug)]
struct ColumnIndex {
    name: String,
    position: usize,
    buckets: IndexMap,
}

/// Per-column value buckets over a positional store.
#[derive(Clone, Debug, Default)]
pub struct Indexer {
    /// Column names of the indexed store, in storage order.
    columns: Vec<String>,
    /// Indexed columns, in the order they were first indexed.
    indexed: Vec<ColumnIndex>,
}

impl Indexer {
    /// Creates an indexer for a store with the given columns.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            indexed: Vec::new(),
        }
    }

    /// Builds a fresh bucket map for an arbitrary value sequence, ignoring
    /// values that cannot be index keys.
    pub fn index_list<'a, I>(values: I) -> IndexMap
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut buckets = IndexMap::new();
        for (slot, value) in values.into_iter().enumerate() {
            if value.is_indexable() {
                buckets
                    .entry(value.clone())
                    .or_insert_with(Bitset::new)
                    .set(slot);
            }
        }
        buckets
    }

    /// (Re)builds the buckets of `column` from the store's columns.
    pub fn index_attr(&mut self, column: &str, store: &[Vec<Value>]) -> Result<()> {
        let position = self
            .columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| Error::schema(format!("Indexer: column {} not known", column)))?;
        let buckets = Self::index_list(store.get(position).into_iter().flatten());
        match self.indexed.iter_mut().find(|ix| ix.name == column) {
            Some(ix) => ix.buckets = buckets,
            None => self.indexed.push(ColumnIndex {
                name: String::from(column),
                position,
                buckets,
            }),
        }
        Ok(())
    }

    /// Stops indexing `column`. Returns whether it was indexed.
    pub fn drop_attr(&mut self, column: &str) -> bool {
        let before = self.indexed.len();
        self.indexed.retain(|ix| ix.name != column);
        self.indexed.len() != before
    }

    /// Moves row `slot` from `old`'s bucket to `new`'s bucket.
    ///
    /// Does nothing when `column` is not indexed.
    pub fn update_index(&mut self, column: &str, slot: usize, old: &Value, new: &Value) {
        let Some(ix) = self.indexed.iter_mut().find(|ix| ix.name == column) else {
            return;
        };
        if let Some(bucket) = ix.buckets.get_mut(old) {
            bucket.clear(slot);
            if bucket.is_empty() {
                ix.buckets.remove(old);
            }
        }
        if new.is_indexable() {
            ix.buckets
                .entry(new.clone())
                .or_insert_with(Bitset::new)
                .set(slot);
        }
    }

    /// Adds a row stored at `slot`, the row count before the append.
    pub fn append_index(&mut self, slot: usize, row: &[Value]) {
        for ix in &mut self.indexed {
            if let Some(value) = row.get(ix.position).filter(|v| v.is_indexable()) {
                ix.buckets
                    .entry(value.clone())
                    .or_insert_with(Bitset::new)
                    .set(slot);
            }
        }
    }

    /// Adds a batch of rows stored from `start` onward.
    pub fn extend_index(&mut self, start: usize, rows: &[Vec<Value>]) {
        for (i, row) in rows.iter().enumerate() {
            self.append_index(start + i, row);
        }
    }

    /// Drops row `slot` from every bucket and moves higher rows down by one.
    pub fn pop_index(&mut self, slot: usize) {
        for ix in &mut self.indexed {
            ix.buckets.retain(|_, bucket| {
                *bucket = bucket.remove(slot);
                !bucket.is_empty()
            });
        }
    }

    /// Rebuilds every indexed column from the store.
    pub fn reindex(&mut self, store: &[Vec<Value>]) {
        for ix in &mut self.indexed {
            ix.buckets = Self::index_list(store.get(ix.position).into_iter().flatten());
        }
    }

    /// Drops all indexed columns and their buckets.
    pub fn clear(&mut self) {
        self.indexed.clear();
    }

    /// Same as [`Indexer::clear`].
    #[inline]
    pub fn reset(&mut self) {
        self.clear();
    }

    /// Returns the rows holding `value` in `column`.
    pub fn bucket(&self, column: &str, value: &Value) -> Option<&Bitset> {
        self.buckets(column)?.get(value)
    }

    /// Returns the buckets of `column` if it is indexed.
    pub fn buckets(&self, column: &str) -> Option<&IndexMap> {
        self.indexed
            .iter()
            .find(|ix| ix.name == column)
            .map(|ix| &ix.buckets)
    }

    /// Returns the indexed column names.
    pub fn indexed_columns(&self) -> impl Iterator<Item = &str> {
        self.indexed.iter().map(|ix| ix.name.as_str())
    }

    /// Returns whether `column` is indexed.
    pub fn is_indexed(&self, column: &str) -> bool {
        self.indexed.iter().any(|ix| ix.name == column)
    }

    /// Returns the column names this indexer was created for.
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}
