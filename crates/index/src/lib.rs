//! Bitstore Index - Integer-bitset primitives and the value index.
//!
//! This crate provides:
//!
//! - `Bitset`: A growable bitset standing in for an arbitrary-width integer
//! - `bitops`: The bitset primitives (`power2`, `bit_remove`, `bitslice_insert`, ...)
//! - `Indexer`: Per-column maps from value to the bitset of rows holding it
//!
//! # Example
//!
//! ```rust
//! use bitstore_core::Value;
//! use bitstore_index::{bit_indexes, bit_remove, Indexer};
//!
//! let names: Vec<Value> = vec!["ann".into(), "bob".into(), "ann".into()];
//! let buckets = Indexer::index_list(&names);
//! let ann = &buckets[&Value::from("ann")];
//! assert_eq!(bit_indexes(ann), vec![0, 2]);
//!
//! // Row 1 removed: row 2 becomes row 1
//! let ann = bit_remove(ann, 1).unwrap();
//! assert_eq!(bit_indexes(&ann), vec![0, 1]);
//! ```

#![no_std]

extern crate alloc;

pub mod bitops;
pub mod bitset;
pub mod indexer;

pub use bitops::{
    bit_clear, bit_count, bit_get, bit_indexes, bit_insert, bit_remove, bit_set, bit_toggle,
    bitslice_get, bitslice_insert, bitslice_remove, bitslice_set, power2,
};
pub use bitset::Bitset;
pub use indexer::{IndexMap, Indexer};
