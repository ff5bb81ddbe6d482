//! Error types for Bitstore.

use crate::value::Value;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Result type alias for Bitstore operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for Bitstore operations.
///
/// Every failure is local and synchronous; nothing in the stores retries or
/// recovers internally.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// Wrong row arity with insufficient defaults, or a value of the wrong kind.
    Schema {
        message: String,
    },
    /// A unique key already exists among live rows.
    DuplicateKey {
        table: String,
        key: Vec<Value>,
    },
    /// A unique key is absent.
    NotFound {
        table: String,
        key: Vec<Value>,
    },
    /// Missing parent on insert/key change, or existing children on delete/key change.
    ReferentialIntegrity {
        table: String,
        message: String,
    },
    /// Positional access outside `[0, len)`.
    SlotOutOfRange {
        slot: usize,
        len: usize,
    },
    /// Negative position or oversized value handed to a bitset primitive.
    Domain {
        message: String,
    },
    /// Column not found.
    ColumnNotFound {
        table: String,
        column: String,
    },
    /// Table not found.
    TableNotFound {
        name: String,
    },
    /// Rejected batch; every failing row with its position in the batch.
    Batch {
        table: String,
        errors: Vec<(usize, Error)>,
    },
    /// Blob store failure.
    Persistence {
        key: String,
        message: String,
    },
    /// Encoding or decoding failure at the persistence boundary.
    Serialization {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Schema { message } => write!(f, "Schema error: {}", message),
            Error::DuplicateKey { table, key } => {
                write!(f, "Duplicate key in table {}: {:?}", table, key)
            }
            Error::NotFound { table, key } => {
                write!(f, "Key not found in table {}: {:?}", table, key)
            }
            Error::ReferentialIntegrity { table, message } => {
                write!(f, "Referential integrity violation in {}: {}", table, message)
            }
            Error::SlotOutOfRange { slot, len } => {
                write!(f, "Slot {} out of range for store of length {}", slot, len)
            }
            Error::Domain { message } => write!(f, "Domain error: {}", message),
            Error::ColumnNotFound { table, column } => {
                write!(f, "Column {} not found in table {}", column, table)
            }
            Error::TableNotFound { name } => write!(f, "Table not found: {}", name),
            Error::Batch { table, errors } => {
                write!(f, "Batch rejected for table {} ({} invalid rows)", table, errors.len())?;
                for (row, err) in errors {
                    write!(f, "; row {}: {}", row, err)?;
                }
                Ok(())
            }
            Error::Persistence { key, message } => {
                write!(f, "Persistence error for {}: {}", key, message)
            }
            Error::Serialization { message } => write!(f, "Serialization error: {}", message),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl Error {
    /// Creates a schema error.
    pub fn schema(message: impl Into<String>) -> Self {
        Error::Schema {
            message: message.into(),
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(table: impl Into<String>, key: Vec<Value>) -> Self {
        Error::DuplicateKey {
            table: table.into(),
            key,
        }
    }

    /// Creates a not found error.
    pub fn not_found(table: impl Into<String>, key: Vec<Value>) -> Self {
        Error::NotFound {
            table: table.into(),
            key,
        }
    }

    /// Creates a referential integrity error.
    pub fn referential(table: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ReferentialIntegrity {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates a slot out of range error.
    pub fn slot_out_of_range(slot: usize, len: usize) -> Self {
        Error::SlotOutOfRange { slot, len }
    }

    /// Creates a domain error.
    pub fn domain(message: impl Into<String>) -> Self {
        Error::Domain {
            message: message.into(),
        }
    }

    /// Creates a column not found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates a batch error.
    pub fn batch(table: impl Into<String>, errors: Vec<(usize, Error)>) -> Self {
        Error::Batch {
            table: table.into(),
            errors,
        }
    }

    /// Creates a persistence error.
    pub fn persistence(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Persistence {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Error::Serialization {
            message: message.into(),
        }
    }

    /// Returns the errors of a rejected batch, or this error alone.
    pub fn flatten(self) -> Vec<Error> {
        match self {
            Error::Batch { errors, .. } => errors.into_iter().map(|(_, e)| e).collect(),
            other => alloc::vec![other],
        }
    }
}
