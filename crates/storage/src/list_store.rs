//! Positional column store for Bitstore.
//!
//! This module provides the `ListStore` struct: rows kept column-major, one
//! change mask per column, and an optional [`Indexer`]. Row identity is the
//! row position ("slot"); removing a row compacts every column and shifts
//! every stored bitset down so that bit position keeps matching row position.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use bitstore_core::schema::ColumnDefault;
use bitstore_core::{Error, Result, Value};
use bitstore_index::{Bitset, Indexer};
use log::{debug, trace, warn};

/// Column-major row storage with change tracking.
#[derive(Clone, Debug)]
pub struct ListStore {
    /// Store name, used in errors and logs.
    name: String,
    /// Column names, in storage order.
    columns: Vec<String>,
    /// Per-column default source for missing trailing cells.
    defaults: Vec<Option<ColumnDefault>>,
    /// One value vector per column; all the same length.
    data: Vec<Vec<Value>>,
    /// Per-column change masks; bit `i` set when row `i` changed.
    changed: Vec<Bitset>,
    /// Secondary index, attached on demand.
    indexer: Option<Indexer>,
}

impl ListStore {
    /// Creates a store with right-aligned defaults: the last default fills
    /// the last column, the one before it the column before, and so on.
    pub fn new(
        name: impl Into<String>,
        columns: Vec<String>,
        defaults: Vec<ColumnDefault>,
    ) -> Result<Self> {
        if defaults.len() > columns.len() {
            return Err(Error::schema(format!(
                "{} defaults given for {} columns",
                defaults.len(),
                columns.len()
            )));
        }
        let mut per_column: Vec<Option<ColumnDefault>> = Vec::with_capacity(columns.len());
        per_column.resize(columns.len() - defaults.len(), None);
        per_column.extend(defaults.into_iter().map(Some));
        Self::with_column_defaults(name, columns, per_column)
    }

    /// Creates a store with one optional default per column.
    pub fn with_column_defaults(
        name: impl Into<String>,
        columns: Vec<String>,
        defaults: Vec<Option<ColumnDefault>>,
    ) -> Result<Self> {
        let name = name.into();
        if columns.is_empty() {
            return Err(Error::schema(format!(
                "Store {} must have at least one column",
                name
            )));
        }
        if defaults.len() != columns.len() {
            return Err(Error::schema(format!(
                "{} defaults given for {} columns",
                defaults.len(),
                columns.len()
            )));
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].contains(col) {
                return Err(Error::schema(format!("Column already exists: {}", col)));
            }
        }
        let width = columns.len();
        Ok(Self {
            name,
            columns,
            defaults,
            data: (0..width).map(|_| Vec::new()).collect(),
            changed: (0..width).map(|_| Bitset::new()).collect(),
            indexer: None,
        })
    }

    /// Returns the store name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    /// Returns true if the store holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the column names.
    #[inline]
    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the per-column change masks.
    #[inline]
    pub fn changed(&self) -> &[Bitset] {
        &self.changed
    }

    /// Returns the column-major storage.
    #[inline]
    pub fn columns(&self) -> &[Vec<Value>] {
        &self.data
    }

    /// Returns an iterator over rows.
    pub fn iter(&self) -> impl Iterator<Item = Vec<Value>> + '_ {
        (0..self.len()).map(move |slot| self.row_values(slot))
    }

    // ---- change tracking ----

    /// Returns the rows changed in any column.
    pub fn rows_changed(&self) -> Bitset {
        let mut rows = Bitset::new();
        for mask in &self.changed {
            rows |= mask;
        }
        rows
    }

    /// Returns the positions of the columns changed in row `slot`.
    pub fn values_changed(&self, slot: usize) -> Vec<usize> {
        self.changed
            .iter()
            .enumerate()
            .filter(|(_, mask)| mask.get(slot))
            .map(|(i, _)| i)
            .collect()
    }

    /// Clears the changed bit of one row in every column, or every bit.
    pub fn reset_changed(&mut self, slot: Option<usize>) -> Result<()> {
        match slot {
            Some(slot) => {
                self.check_slot(slot)?;
                for mask in &mut self.changed {
                    mask.clear(slot);
                }
            }
            None => self.changed.iter_mut().for_each(Bitset::reset),
        }
        Ok(())
    }

    // ---- lookup helpers ----

    /// Fills missing trailing cells from the column defaults.
    ///
    /// An empty row, a row longer than the store, or a missing cell whose
    /// column has no default is a schema error.
    pub fn resolve_defaults(&self, mut row: Vec<Value>) -> Result<Vec<Value>> {
        let width = self.columns.len();
        if row.is_empty() || row.len() > width {
            return Err(Error::schema(format!(
                "Row has {} values, store {} has {} columns",
                row.len(),
                self.name,
                width
            )));
        }
        for col in row.len()..width {
            match &self.defaults[col] {
                Some(default) => row.push(default.resolve()),
                None => {
                    return Err(Error::schema(format!(
                        "Not enough defaults: column {} of {} has no default",
                        self.columns[col], self.name
                    )))
                }
            }
        }
        Ok(row)
    }

    /// Checks that `slot` is a live row position.
    #[inline]
    pub fn check_slot(&self, slot: usize) -> Result<()> {
        let len = self.len();
        if slot >= len {
            return Err(Error::slot_out_of_range(slot, len));
        }
        Ok(())
    }

    /// Returns the storage position of a column.
    pub fn slot_for_col(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| Error::column_not_found(&self.name, column))
    }

    // ---- reads ----

    /// Gets one value.
    pub fn get(&self, slot: usize, column: &str) -> Result<&Value> {
        self.check_slot(slot)?;
        Ok(&self.data[self.slot_for_col(column)?][slot])
    }

    /// Gets all values of a column.
    pub fn get_column(&self, column: &str) -> Result<&[Value]> {
        Ok(&self.data[self.slot_for_col(column)?])
    }

    /// Gets a row.
    pub fn get_row(&self, slot: usize) -> Result<Vec<Value>> {
        self.check_slot(slot)?;
        Ok(self.row_values(slot))
    }

    /// Gets a row as column name / value pairs.
    pub fn get_row_map(&self, slot: usize) -> Result<Vec<(&str, &Value)>> {
        self.check_slot(slot)?;
        Ok(self
            .columns
            .iter()
            .zip(&self.data)
            .map(|(name, column)| (name.as_str(), &column[slot]))
            .collect())
    }

    /// Gets a row and clears its changed bits.
    pub fn fetch_row(&mut self, slot: usize) -> Result<Vec<Value>> {
        let row = self.get_row(slot)?;
        self.reset_changed(Some(slot))?;
        Ok(row)
    }

    /// Gets the rows whose bits are set in `mask`.
    pub fn get_rows(&self, mask: &Bitset) -> Result<Vec<Vec<Value>>> {
        mask.iter().map(|slot| self.get_row(slot)).collect()
    }

    /// Gets the rows at the listed positions, in list order.
    pub fn get_rows_at(&self, slots: &[usize]) -> Result<Vec<Vec<Value>>> {
        slots.iter().map(|&slot| self.get_row(slot)).collect()
    }

    /// Returns every row, row-major.
    pub fn dump(&self) -> Vec<Vec<Value>> {
        self.iter().collect()
    }

    /// Returns the first row at or after `start` holding `value` in `column`.
    ///
    /// Uses the index bucket when the column is indexed, a scan otherwise.
    pub fn find(&self, column: &str, value: &Value, start: usize) -> Result<Option<usize>> {
        let col = self.slot_for_col(column)?;
        if let Some(indexer) = self.indexed(column, value) {
            return Ok(indexer
                .bucket(column, value)
                .and_then(|rows| rows.lowest_at_or_after(start)));
        }
        Ok(self.data[col]
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, v)| *v == value)
            .map(|(slot, _)| slot))
    }

    /// Returns every row holding `value` in `column`, ascending.
    pub fn find_all(&self, column: &str, value: &Value) -> Result<Vec<usize>> {
        let col = self.slot_for_col(column)?;
        if let Some(indexer) = self.indexed(column, value) {
            return Ok(indexer
                .bucket(column, value)
                .map(|rows| rows.iter().collect())
                .unwrap_or_default());
        }
        Ok(self.data[col]
            .iter()
            .enumerate()
            .filter(|(_, v)| *v == value)
            .map(|(slot, _)| slot)
            .collect())
    }

    // ---- writes ----

    /// Writes one value and returns the value it replaced.
    pub fn set(&mut self, slot: usize, column: &str, value: Value) -> Result<Value> {
        self.check_slot(slot)?;
        let col = self.slot_for_col(column)?;
        if let Some(indexer) = &mut self.indexer {
            indexer.update_index(column, slot, &self.data[col][slot], &value);
        }
        let old = core::mem::replace(&mut self.data[col][slot], value);
        self.changed[col].set(slot);
        trace!("{}: set row {} column {}", self.name, slot, column);
        Ok(old)
    }

    /// Appends a row, filling missing trailing cells from defaults.
    ///
    /// Returns the position of the new row.
    pub fn append(&mut self, row: Vec<Value>) -> Result<usize> {
        let row = self.resolve_defaults(row)?;
        let slot = self.len();
        if let Some(indexer) = &mut self.indexer {
            indexer.append_index(slot, &row);
        }
        for ((column, mask), value) in self.data.iter_mut().zip(&mut self.changed).zip(row) {
            column.push(value);
            mask.set(slot);
        }
        trace!("{}: appended row {}", self.name, slot);
        Ok(slot)
    }

    /// Appends a batch of rows. Either every row is stored or none is.
    ///
    /// Rows that cannot be completed from defaults are reported together,
    /// each with its position in the batch.
    pub fn extend(&mut self, rows: Vec<Vec<Value>>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let mut resolved = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();
        for (i, row) in rows.into_iter().enumerate() {
            match self.resolve_defaults(row) {
                Ok(row) => resolved.push(row),
                Err(e) => errors.push((i, e)),
            }
        }
        if !errors.is_empty() {
            warn!("{}: rejected batch, {} invalid rows", self.name, errors.len());
            return Err(Error::batch(&self.name, errors));
        }

        let start = self.len();
        let width = resolved.len();
        if let Some(indexer) = &mut self.indexer {
            indexer.extend_index(start, &resolved);
        }
        for row in resolved {
            for (column, value) in self.data.iter_mut().zip(row) {
                column.push(value);
            }
        }
        let fresh = Bitset::ones(width);
        for mask in &mut self.changed {
            *mask = mask.insert_slice(start, width, &fresh);
        }
        trace!("{}: extended rows {}..{}", self.name, start, start + width);
        Ok(())
    }

    /// Removes row `slot` and returns it. Later rows move down one position.
    pub fn pop(&mut self, slot: usize) -> Result<Vec<Value>> {
        self.check_slot(slot)?;
        let row = self.data.iter_mut().map(|column| column.remove(slot)).collect();
        for mask in &mut self.changed {
            *mask = mask.remove(slot);
        }
        if let Some(indexer) = &mut self.indexer {
            indexer.pop_index(slot);
        }
        trace!("{}: popped row {}", self.name, slot);
        Ok(row)
    }

    /// Empties every column, resets change masks and clears the index.
    pub fn clear(&mut self) {
        self.data.iter_mut().for_each(Vec::clear);
        self.changed.iter_mut().for_each(Bitset::reset);
        if let Some(indexer) = &mut self.indexer {
            indexer.clear();
        }
        debug!("{}: cleared", self.name);
    }

    // ---- index ----

    /// Attaches an empty indexer, replacing any existing one.
    pub fn set_indexer(&mut self) {
        self.indexer = Some(Indexer::new(self.columns.clone()));
        debug!("{}: indexer attached", self.name);
    }

    /// Returns the attached indexer.
    #[inline]
    pub fn index(&self) -> Option<&Indexer> {
        self.indexer.as_ref()
    }

    /// Indexes `column`, attaching an indexer first if needed.
    pub fn index_attr(&mut self, column: &str) -> Result<()> {
        self.slot_for_col(column)?;
        if self.indexer.is_none() {
            self.set_indexer();
        }
        if let Some(indexer) = &mut self.indexer {
            indexer.index_attr(column, &self.data)?;
        }
        debug!("{}: indexed column {}", self.name, column);
        Ok(())
    }

    /// Stops indexing `column`. Returns whether it was indexed.
    pub fn drop_attr(&mut self, column: &str) -> bool {
        self.indexer
            .as_mut()
            .map_or(false, |indexer| indexer.drop_attr(column))
    }

    /// Rebuilds every indexed column.
    pub fn reindex(&mut self) {
        if let Some(indexer) = &mut self.indexer {
            indexer.reindex(&self.data);
        }
    }

    fn indexed(&self, column: &str, value: &Value) -> Option<&Indexer> {
        self.indexer
            .as_ref()
            .filter(|indexer| value.is_indexable() && indexer.is_indexed(column))
    }

    fn row_values(&self, slot: usize) -> Vec<Value> {
        self.data.iter().map(|column| column[slot].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    fn people() -> ListStore {
        ListStore::new(
            "people",
            names(&["name", "address", "phone"]),
            vec![
                ColumnDefault::Value("<no address>".into()),
                ColumnDefault::Value("<no phone>".into()),
            ],
        )
        .unwrap()
    }

    fn row(values: &[&str]) -> Vec<Value> {
        values.iter().map(|v| Value::from(*v)).collect()
    }

    fn bits(positions: &[usize]) -> Bitset {
        positions.iter().copied().collect()
    }

    fn filled() -> ListStore {
        let mut store = people();
        store.append(row(&["ann", "1 Main", "555"])).unwrap();
        store.append(row(&["bob", "2 Main", "556"])).unwrap();
        store.append(row(&["cat", "1 Main", "557"])).unwrap();
        store
    }

    #[test]
    fn test_store_new() {
        let store = people();
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.column_count(), 3);
        assert!(ListStore::new("x", vec![], vec![]).is_err());
        let two = vec![
            ColumnDefault::Value(1.into()),
            ColumnDefault::Value(2.into()),
        ];
        assert!(ListStore::new("x", names(&["a"]), two).is_err());
        assert!(ListStore::new("x", names(&["a", "a"]), vec![]).is_err());
    }

    #[test]
    fn test_append_marks_changed() {
        let store = filled();
        assert_eq!(store.len(), 3);
        for mask in store.changed() {
            assert_eq!(mask, &bits(&[0, 1, 2]));
        }
        assert_eq!(store.get_row(1).unwrap(), row(&["bob", "2 Main", "556"]));
    }

    #[test]
    fn test_resolve_defaults() {
        let store = people();
        assert_eq!(
            store.resolve_defaults(row(&["ann"])).unwrap(),
            row(&["ann", "<no address>", "<no phone>"])
        );
        assert_eq!(
            store.resolve_defaults(row(&["ann", "1 Main"])).unwrap(),
            row(&["ann", "1 Main", "<no phone>"])
        );
        assert!(store.resolve_defaults(vec![]).is_err());
        assert!(store.resolve_defaults(row(&["a", "b", "c", "d"])).is_err());

        let bare = ListStore::new("bare", names(&["a", "b"]), vec![]).unwrap();
        assert!(matches!(
            bare.resolve_defaults(row(&["a"])),
            Err(Error::Schema { .. })
        ));
    }

    #[test]
    fn test_default_producer() {
        fn stamp() -> Value {
            Value::Integer(42)
        }
        let mut store =
            ListStore::new("log", names(&["msg", "at"]), vec![ColumnDefault::Producer(stamp)])
                .unwrap();
        store.append(row(&["boot"])).unwrap();
        assert_eq!(store.get(0, "at").unwrap(), &Value::Integer(42));
    }

    #[test]
    fn test_set_tracks_change() {
        let mut store = filled();
        store.reset_changed(None).unwrap();
        assert!(store.rows_changed().is_empty());

        let old = store.set(1, "phone", "999".into()).unwrap();
        assert_eq!(old, Value::from("556"));
        assert_eq!(store.rows_changed(), bits(&[1]));
        assert_eq!(store.values_changed(1), vec![2]);
        assert!(store.values_changed(0).is_empty());

        assert!(matches!(
            store.set(3, "phone", "1".into()),
            Err(Error::SlotOutOfRange { slot: 3, len: 3 })
        ));
        assert!(matches!(
            store.set(0, "email", "x".into()),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_reset_changed_single_row() {
        let mut store = filled();
        store.reset_changed(Some(0)).unwrap();
        assert_eq!(store.rows_changed(), bits(&[1, 2]));
        assert!(store.reset_changed(Some(3)).is_err());
    }

    #[test]
    fn test_fetch_row_resets() {
        let mut store = filled();
        let fetched = store.fetch_row(2).unwrap();
        assert_eq!(fetched[0], Value::from("cat"));
        assert_eq!(store.rows_changed(), bits(&[0, 1]));
    }

    #[test]
    fn test_extend_all_or_nothing() {
        let mut store = ListStore::new("bare", names(&["a", "b"]), vec![]).unwrap();
        store.append(row(&["x", "y"])).unwrap();
        let err = store
            .extend(vec![row(&["p", "q"]), row(&["r"]), vec![]])
            .unwrap_err();
        match err {
            Error::Batch { errors, .. } => {
                let rows: Vec<usize> = errors.iter().map(|(i, _)| *i).collect();
                assert_eq!(rows, vec![1, 2]);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_extend_marks_batch() {
        let mut store = filled();
        store.reset_changed(None).unwrap();
        store
            .extend(vec![row(&["dan"]), row(&["eve", "5 Main"])])
            .unwrap();
        assert_eq!(store.len(), 5);
        assert_eq!(store.rows_changed(), bits(&[3, 4]));
        assert_eq!(store.get(4, "phone").unwrap(), &Value::from("<no phone>"));

        store.extend(vec![]).unwrap();
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_pop_compacts() {
        let mut store = filled();
        store.reset_changed(None).unwrap();
        store.set(2, "phone", "000".into()).unwrap();

        let popped = store.pop(1).unwrap();
        assert_eq!(popped, row(&["bob", "2 Main", "556"]));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1, "name").unwrap(), &Value::from("cat"));
        // row 2 became row 1, its changed bit moves with it
        assert_eq!(store.rows_changed(), bits(&[1]));
        assert!(store.pop(2).is_err());
    }

    #[test]
    fn test_find_scan() {
        let store = filled();
        let addr = Value::from("1 Main");
        assert_eq!(store.find("address", &addr, 0).unwrap(), Some(0));
        assert_eq!(store.find("address", &addr, 1).unwrap(), Some(2));
        assert_eq!(store.find("address", &addr, 3).unwrap(), None);
        assert_eq!(store.find_all("address", &addr).unwrap(), vec![0, 2]);
        assert!(store.find("nope", &addr, 0).is_err());
    }

    #[test]
    fn test_find_uses_index() {
        let mut store = filled();
        store.index_attr("address").unwrap();
        let addr = Value::from("1 Main");
        assert_eq!(
            store.index().unwrap().bucket("address", &addr),
            Some(&bits(&[0, 2]))
        );
        assert_eq!(store.find("address", &addr, 1).unwrap(), Some(2));
        assert_eq!(store.find_all("address", &addr).unwrap(), vec![0, 2]);
        assert!(store
            .find_all("address", &"9 Main".into())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_index_follows_mutations() {
        let mut store = filled();
        store.index_attr("address").unwrap();

        store.append(row(&["dan", "2 Main", "558"])).unwrap();
        store.set(0, "address", "2 Main".into()).unwrap();
        store.pop(1).unwrap();

        // rows now: ann(2 Main), cat(1 Main), dan(2 Main)
        let index = store.index().unwrap();
        assert_eq!(index.bucket("address", &"2 Main".into()), Some(&bits(&[0, 2])));
        assert_eq!(index.bucket("address", &"1 Main".into()), Some(&bits(&[1])));

        let mut rebuilt = store.clone();
        rebuilt.reindex();
        assert_eq!(
            rebuilt.index().unwrap().buckets("address"),
            store.index().unwrap().buckets("address")
        );
    }

    #[test]
    fn test_drop_attr_and_clear() {
        let mut store = filled();
        assert!(!store.drop_attr("name"));
        store.index_attr("name").unwrap();
        assert!(store.drop_attr("name"));
        store.index_attr("name").unwrap();

        store.clear();
        assert!(store.is_empty());
        assert!(store.rows_changed().is_empty());
        assert_eq!(store.index().unwrap().indexed_columns().count(), 0);
    }

    #[test]
    fn test_get_rows() {
        let store = filled();
        let rows = store.get_rows(&bits(&[0, 2])).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], Value::from("cat"));
        let rows = store.get_rows_at(&[2, 0]).unwrap();
        assert_eq!(rows[0][0], Value::from("cat"));
        assert!(store.get_rows_at(&[5]).is_err());
        assert!(store.get_rows(&Bitset::new()).unwrap().is_empty());
    }

    #[test]
    fn test_row_map_and_dump() {
        let store = filled();
        let map = store.get_row_map(0).unwrap();
        assert_eq!(map[1], ("address", &Value::from("1 Main")));
        assert_eq!(store.dump().len(), 3);
        assert_eq!(store.iter().count(), 3);
        assert_eq!(store.get_column("name").unwrap().len(), 3);
    }
}
