//! Bitstore Core - Core types and schema definitions for Bitstore.
//!
//! This crate provides the foundational types shared by the Bitstore stores:
//!
//! - `Value`: Runtime values held in columns, including named `Record`s
//! - `ValueKind`: The kind a column accepts, with `validate_and_coerce`
//! - `schema`: Declarative definitions (ColumnDef, TableDef, RelationDef, DataStoreDef)
//! - `Error`: Error types for store operations
//!
//! # Example
//!
//! ```rust
//! use bitstore_core::{Value, ValueKind};
//! use bitstore_core::schema::TableBuilder;
//!
//! let people = TableBuilder::new("People")
//!     .unwrap()
//!     .add_column("name", ValueKind::Str)
//!     .unwrap()
//!     .add_column_with_default("phone", ValueKind::Str, Value::from("<unknown>"))
//!     .unwrap()
//!     .add_unique(&["name"])
//!     .unwrap()
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(people.name(), "People");
//! assert_eq!(people.columns().len(), 2);
//! assert_eq!(people.persistence_key(), "People");
//! ```

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod error;
mod kind;
pub mod schema;
mod value;

pub use error::{Error, Result};
pub use kind::{validate_and_coerce, ValueKind};
pub use value::{Record, RecordType, Value};
