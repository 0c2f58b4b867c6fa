//! Persistent bearer credential.

use crate::AuthResult;
use credential_storage::{ClientStorage, StorageKeys};
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Default)]
struct Resident {
    token: Option<String>,
    // Token whose storage delete failed; never reloaded.
    revoked: Option<String>,
}

/// Holds the one opaque bearer token for this storage context.
///
/// While no token is resident every `get` re-reads storage, so a token written
/// to the shared slot by another owner is picked up. Once resident, the memory
/// copy is authoritative until `load`, `set` or `clear`.
pub struct CredentialStore {
    storage: Arc<dyn ClientStorage>,
    resident: Mutex<Resident>,
}

impl CredentialStore {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self {
            storage,
            resident: Mutex::new(Resident::default()),
        }
    }

    /// Load the persisted token into memory, replacing any resident copy.
    pub fn load(&self) -> AuthResult<Option<String>> {
        let mut token = self.storage.get(StorageKeys::AUTH_TOKEN)?;
        let mut resident = self.resident.lock().unwrap();
        if token.is_some() && token == resident.revoked {
            token = None;
        }
        resident.token = token.clone();
        debug!(present = token.is_some(), "Loaded credential from storage");
        Ok(token)
    }

    /// Current token, loading from storage while none is resident.
    pub fn get(&self) -> AuthResult<Option<String>> {
        {
            let resident = self.resident.lock().unwrap();
            if resident.token.is_some() {
                return Ok(resident.token.clone());
            }
        }
        self.load()
    }

    /// Whether a token is present.
    pub fn is_present(&self) -> AuthResult<bool> {
        Ok(self.get()?.is_some())
    }

    /// Persist `token` and make it resident.
    pub fn set(&self, token: &str) -> AuthResult<()> {
        self.storage.set(StorageKeys::AUTH_TOKEN, token)?;
        let mut resident = self.resident.lock().unwrap();
        resident.token = Some(token.to_string());
        resident.revoked = None;
        Ok(())
    }

    /// Drop the resident token and remove it from storage.
    ///
    /// Memory is cleared even when storage fails, so the process stops
    /// sending the token either way.
    pub fn clear(&self) -> AuthResult<()> {
        let dropped = self.resident.lock().unwrap().token.take();
        if let Err(e) = self.storage.delete(StorageKeys::AUTH_TOKEN) {
            let mut resident = self.resident.lock().unwrap();
            resident.revoked = dropped.or(resident.revoked.take());
            return Err(e.into());
        }
        self.resident.lock().unwrap().revoked = None;
        Ok(())
    }
}
