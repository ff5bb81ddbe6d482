//! Bitstore Storage - Columnar stores for Bitstore.
//!
//! This crate provides the storage stack:
//!
//! - `ListStore`: Column-major rows with change masks and an optional index
//! - `TupleStore`: A `ListStore` returning rows as records
//! - `TableStore`: Typed columns, defaults, a unique key and referential checks
//! - `DataStore`: Related tables, wired by position, loaded and saved together
//! - `BlobStore`: The snapshot persistence boundary
//!
//! # Example
//!
//! ```rust
//! use bitstore_storage::DataStore;
//! use bitstore_core::schema::{DataStoreDef, RelationDef, TableBuilder};
//! use bitstore_core::{Value, ValueKind};
//!
//! let people = TableBuilder::new("People")
//!     .unwrap()
//!     .add_column("name", ValueKind::Str)
//!     .unwrap()
//!     .add_unique(&["name"])
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! let pets = TableBuilder::new("Pets")
//!     .unwrap()
//!     .add_column("pet", ValueKind::Str)
//!     .unwrap()
//!     .add_column("owner", ValueKind::Str)
//!     .unwrap()
//!     .add_unique(&["pet"])
//!     .unwrap()
//!     .build()
//!     .unwrap();
//! let def = DataStoreDef::new("petstore", vec![people, pets])
//!     .relation(RelationDef::new("People", "name", "Pets", "owner"));
//! let mut db = DataStore::new(def).unwrap();
//!
//! db.table_mut("People").unwrap().append(vec!["ann".into()]).unwrap();
//! db.table_mut("Pets").unwrap().append(vec!["rex".into(), "ann".into()]).unwrap();
//!
//! // ann has a pet, so she stays
//! assert!(db.table_mut("People").unwrap().pop(&[Value::from("ann")]).is_err());
//! assert_eq!(db.tables_changed(), vec!["People", "Pets"]);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod data_store;
pub mod list_store;
pub mod persist;
pub mod table_store;
pub mod tuple_store;

pub use data_store::{DataStore, TableMut};
pub use list_store::ListStore;
pub use persist::{decode_rows, encode_rows, BlobStore, MemoryBlobStore};
#[cfg(feature = "std")]
pub use persist::JsonFileStore;
pub use table_store::{Links, TableStore};
pub use tuple_store::TupleStore;
