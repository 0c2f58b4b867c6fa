//! Session context: the credential plus state derived from it.

use crate::api::User;
use crate::credential::CredentialStore;
use crate::user_cache::{CachePolicy, UserCache};
use crate::AuthResult;
use credential_storage::ClientStorage;
use std::sync::Arc;
use tracing::{debug, warn};

/// Explicit, injectable session state.
///
/// Invariant: a cached user is only ever present alongside a credential.
/// `establish` writes the credential before the user; `teardown` drops both.
pub struct SessionContext {
    credentials: CredentialStore,
    user_cache: UserCache,
}

impl SessionContext {
    pub fn new(storage: Arc<dyn ClientStorage>, policy: CachePolicy) -> Self {
        Self {
            credentials: CredentialStore::new(storage),
            user_cache: UserCache::new(policy),
        }
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn user_cache(&self) -> &UserCache {
        &self.user_cache
    }

    /// Load the persisted credential. Returns whether one was found.
    pub fn hydrate(&self) -> AuthResult<bool> {
        let present = self.credentials.load()?.is_some();
        if !present {
            self.user_cache.clear();
        }
        debug!(authenticated = present, "Session context hydrated");
        Ok(present)
    }

    /// Record a successful authentication.
    pub fn establish(&self, token: &str, user: User) -> AuthResult<()> {
        self.credentials.set(token)?;
        self.user_cache.store(user);
        Ok(())
    }

    /// Drop the credential and every piece of derived state.
    ///
    /// Never fails: a storage error is logged and the in-memory state is
    /// cleared regardless.
    pub fn teardown(&self) {
        self.user_cache.clear();
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Failed to remove persisted credential");
        }
        debug!("Session context torn down");
    }
}
