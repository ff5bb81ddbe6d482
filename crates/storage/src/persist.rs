//! Persistence boundary for Bitstore.
//!
//! Tables are saved as whole snapshots through a [`BlobStore`]: an opaque
//! key to bytes mapping. A snapshot is a JSON array of row arrays. Record
//! and tuple cells are plain arrays and `Null` is `null`.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use bitstore_core::{Error, Result, Value};

/// Key to bytes storage for table snapshots.
pub trait BlobStore {
    /// Reads the blob stored under `key`.
    fn load(&self, key: &str) -> Result<Vec<u8>>;
    /// Replaces the blob stored under `key`.
    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<()>;
    /// Returns whether a blob exists under `key`.
    fn contains(&self, key: &str) -> bool;
}

/// In-memory blob store.
#[derive(Clone, Debug, Default)]
pub struct MemoryBlobStore {
    blobs: BTreeMap<String, Vec<u8>>,
}

impl MemoryBlobStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.blobs.keys().map(String::as_str)
    }

    /// Returns the number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .get(key)
            .cloned()
            .ok_or_else(|| Error::persistence(key, "no such blob"))
    }

    fn save(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
        self.blobs.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }
}

#[cfg(feature = "std")]
pub use file::JsonFileStore;

#[cfg(feature = "std")]
mod file {
    use super::BlobStore;
    use alloc::format;
    use alloc::string::ToString;
    use alloc::vec::Vec;
    use bitstore_core::{Error, Result};
    use std::fs;
    use std::path::{Component, Path, PathBuf};

    /// Blob store writing `<root>/<key>.json` files.
    ///
    /// Parent directories are created on save. Each save writes a sibling
    /// temporary file and renames it over the target.
    #[derive(Clone, Debug)]
    pub struct JsonFileStore {
        root: PathBuf,
    }

    impl JsonFileStore {
        /// Creates a store rooted at `root`.
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        /// Returns the root directory.
        pub fn root(&self) -> &Path {
            &self.root
        }

        /// Returns the file backing `key`.
        ///
        /// Keys are relative paths below the root; empty keys, absolute
        /// keys and `..` components are rejected.
        pub fn path_for(&self, key: &str) -> Result<PathBuf> {
            let relative = Path::new(key);
            let inside = !key.is_empty()
                && relative
                    .components()
                    .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
            if !inside {
                return Err(Error::persistence(key, "key escapes the store root"));
            }
            Ok(self.root.join(format!("{}.json", key)))
        }
    }

    impl BlobStore for JsonFileStore {
        fn load(&self, key: &str) -> Result<Vec<u8>> {
            fs::read(self.path_for(key)?).map_err(|e| Error::persistence(key, e.to_string()))
        }

        fn save(&mut self, key: &str, bytes: &[u8]) -> Result<()> {
            let path = self.path_for(key)?;
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir).map_err(|e| Error::persistence(key, e.to_string()))?;
            }
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, bytes).map_err(|e| Error::persistence(key, e.to_string()))?;
            fs::rename(&tmp, &path).map_err(|e| Error::persistence(key, e.to_string()))
        }

        fn contains(&self, key: &str) -> bool {
            self.path_for(key).map_or(false, |path| path.is_file())
        }
    }
}

/// Encodes rows as a JSON array of arrays.
pub fn encode_rows(rows: &[Vec<Value>]) -> Result<Vec<u8>> {
    serde_json::to_vec(rows).map_err(|e| Error::serialization(e.to_string()))
}

/// Decodes a JSON array of arrays. A blank blob decodes to no rows.
///
/// Nested arrays come back as `Value::Tuple`; objects are rejected.
pub fn decode_rows(bytes: &[u8]) -> Result<Vec<Vec<Value>>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(bytes).map_err(|e| Error::serialization(e.to_string()))
}
