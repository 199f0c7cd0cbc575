//! File-based key-value store for persistent sync state.

use crate::backend::{validate_key, KeyValueStore};
use crate::error::StorageResult;
use async_trait::async_trait;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A directory-backed key-value store.
///
/// Every key is stored as its own JSON document inside the directory.
/// Documents survive process restarts.
///
/// # Durability
///
/// - `set()` writes to a temporary file, syncs it, then renames it over the
///   previous document, so a crash never leaves a half-written document
/// - Distinct keys are written independently
///
/// # File Names
///
/// Keys are escaped into file names: ASCII letters, digits, `-` and `_` are
/// kept; every other byte becomes `%XX`.
///
/// # Example
///
/// ```no_run
/// use fryctoria_storage::{FileStore, KeyValueStore};
/// use std::path::Path;
///
/// # async fn demo() -> fryctoria_storage::StorageResult<()> {
/// let store = FileStore::open(Path::new("sync-state")).await?;
/// store.set("fryctoria-jobs", &serde_json::json!([])).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub async fn open(dir: &Path) -> StorageResult<Self> {
        tokio::fs::create_dir_all(dir).await?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Returns the directory holding the documents.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Returns the file path used for `key`.
    #[must_use]
    pub fn document_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", escape_key(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        validate_key(key)?;
        let path = self.document_path(key);

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn set(&self, key: &str, value: &Value) -> StorageResult<()> {
        validate_key(key)?;
        let path = self.document_path(key);
        let tmp_path = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec(value)?;

        {
            use tokio::io::AsyncWriteExt;
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
        }
        tokio::fs::rename(&tmp_path, &path).await?;

        debug!(key, bytes = bytes.len(), "stored document");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        match tokio::fs::remove_file(self.document_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            escaped.push(byte as char);
        } else {
            escaped.push_str(&format!("%{byte:02X}"));
        }
    }
    escaped
}
