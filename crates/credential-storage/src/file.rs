//! File-backed storage.
//!
//! All slots live in one JSON object on disk. The file is read once on open and
//! rewritten on every mutation through a temporary sibling and a rename, so a
//! crash mid-write leaves the previous contents intact.

use crate::{ClientStorage, StorageError, StorageResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// JSON-file storage that persists across process restarts.
pub struct FileStorage {
    path: PathBuf,
    slots: Mutex<BTreeMap<String, String>>,
}

// Slot values are credentials; only the location is printed.
impl std::fmt::Debug for FileStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStorage")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// A missing file is an empty store; the file and its parent directory are
    /// only created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        let slots = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content)
                    .map_err(|e| StorageError::Encoding(format!("{}: {}", path.display(), e)))?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), slots = slots.len(), "Opened file storage");

        Ok(Self {
            path,
            slots: Mutex::new(slots),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.slots
            .lock()
            .map_err(|_| StorageError::Backend("file storage lock poisoned".to_string()))
    }

    fn persist(&self, slots: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(slots)
            .map_err(|e| StorageError::Encoding(e.to_string()))?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, content)?;
        restrict_permissions(&tmp_path)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> StorageResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> StorageResult<()> {
    Ok(())
}

// Mutations are applied to a copy; memory only changes once the write lands.
impl ClientStorage for FileStorage {
    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        debug!(key = %key, "Setting slot");
        let mut slots = self.lock()?;
        let mut next = slots.clone();
        next.insert(key.to_string(), value.to_string());
        self.persist(&next)?;
        *slots = next;
        Ok(())
    }

    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StorageResult<bool> {
        debug!(key = %key, "Deleting slot");
        let mut slots = self.lock()?;
        if !slots.contains_key(key) {
            return Ok(false);
        }
        let mut next = slots.clone();
        next.remove(key);
        self.persist(&next)?;
        *slots = next;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("auth_token").unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        {
            let storage = FileStorage::open(&path).unwrap();
            storage.set("auth_token", "token-1").unwrap();
            storage.set("oauth_state", "state-1").unwrap();
        }

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(
            reopened.get("auth_token").unwrap(),
            Some("token-1".to_string())
        );
        assert_eq!(
            reopened.get("oauth_state").unwrap(),
            Some("state-1".to_string())
        );
    }

    #[test]
    fn test_delete_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");

        let storage = FileStorage::open(&path).unwrap();
        storage.set("auth_token", "token-1").unwrap();
        assert!(storage.delete("auth_token").unwrap());
        assert!(!storage.delete("auth_token").unwrap());

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("auth_token").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_encoding_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();

        match FileStorage::open(&path) {
            Err(StorageError::Encoding(_)) => {}
            other => panic!("Expected encoding error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "").unwrap();

        let storage = FileStorage::open(&path).unwrap();
        assert_eq!(storage.get("auth_token").unwrap(), None);
    }

    #[test]
    fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.set("auth_token", "token-1").unwrap();

        // A directory where the temporary file goes makes every write fail
        fs::create_dir(path.with_extension("tmp")).unwrap();

        assert!(storage.set("oauth_state", "state-1").is_err());
        assert_eq!(storage.get("oauth_state").unwrap(), None);

        assert!(storage.delete("auth_token").is_err());
        assert_eq!(
            storage.get("auth_token").unwrap(),
            Some("token-1".to_string())
        );

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get("oauth_state").unwrap(), None);
        assert_eq!(
            reopened.get("auth_token").unwrap(),
            Some("token-1".to_string())
        );
    }

    #[test]
    fn test_missing_parent_dir_write_fails_cleanly() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        let storage = FileStorage::open(blocker.join("session.json")).unwrap();
        assert!(storage.set("auth_token", "token-1").is_err());
        assert!(!storage.has("auth_token").unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        let storage = FileStorage::open(&path).unwrap();
        storage.set("auth_token", "secret").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
