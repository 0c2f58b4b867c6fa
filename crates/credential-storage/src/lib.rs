//! Client-side storage for authentication state.
//!
//! This crate provides the named-slot storage the session layer persists into:
//! - **Memory**: process-local map, used by tests and ephemeral sessions
//! - **File**: JSON map written atomically to disk, survives restarts
//!
//! Both implement [`ClientStorage`], the get/set/delete capability the rest of
//! the workspace is written against.

mod file;
mod keys;
mod memory;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::ClientStorage;

use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific failure (poisoned lock, unusable location, ...)
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Open the file-backed storage at `path`, shared behind an `Arc`.
pub fn open_file_storage(path: &Path) -> StorageResult<Arc<dyn ClientStorage>> {
    let storage = FileStorage::open(path)?;
    Ok(Arc::new(storage))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_file_storage_shares_slots() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open_file_storage(&dir.path().join("session.json")).unwrap();

        storage.set(StorageKeys::AUTH_TOKEN, "tok").unwrap();
        assert!(storage.has(StorageKeys::AUTH_TOKEN).unwrap());
        assert!(!storage.has(StorageKeys::OAUTH_STATE).unwrap());
    }

    #[test]
    fn test_storage_keys_constants() {
        assert!(!StorageKeys::AUTH_TOKEN.is_empty());
        assert!(!StorageKeys::OAUTH_STATE.is_empty());
        assert_ne!(
            StorageKeys::AUTH_TOKEN,
            StorageKeys::OAUTH_STATE,
            "Storage keys must be unique"
        );
    }
}
