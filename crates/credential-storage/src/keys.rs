//! Storage key constants.

/// Slot names used by the session layer
pub struct StorageKeys;

impl StorageKeys {
    /// Opaque bearer token for the current session
    pub const AUTH_TOKEN: &'static str = "auth_token";

    /// Anti-CSRF state of the OAuth redirect currently in flight
    pub const OAUTH_STATE: &'static str = "oauth_state";
}
