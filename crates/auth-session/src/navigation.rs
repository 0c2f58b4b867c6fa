//! Navigation capability and the browser-facing routes it is pointed at.

use crate::AuthResult;
use auth_config_and_utils::Config;
use std::sync::Mutex;
use url::Url;

/// Moves the user agent to another location.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &str);
}

/// Reason marker attached to a forced trip to the login page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRedirect {
    /// `reason=session-expired`
    SessionExpired,
    /// `error=oauth-denied`
    OAuthDenied,
    /// `error=oauth-invalid`
    OAuthInvalid,
    /// `error=oauth-failed`
    OAuthFailed,
}

impl LoginRedirect {
    /// Query parameter name and value for this marker.
    pub fn marker(&self) -> (&'static str, &'static str) {
        match self {
            LoginRedirect::SessionExpired => ("reason", "session-expired"),
            LoginRedirect::OAuthDenied => ("error", "oauth-denied"),
            LoginRedirect::OAuthInvalid => ("error", "oauth-invalid"),
            LoginRedirect::OAuthFailed => ("error", "oauth-failed"),
        }
    }
}

/// Absolute login and landing locations.
#[derive(Debug, Clone)]
pub struct AppRoutes {
    login: Url,
    landing: Url,
}

impl AppRoutes {
    pub fn new(app_base: &Url, login_path: &str, landing_path: &str) -> AuthResult<Self> {
        Ok(Self {
            login: app_base.join(login_path)?,
            landing: app_base.join(landing_path)?,
        })
    }

    pub fn from_config(config: &Config) -> AuthResult<Self> {
        Self::new(
            &config.app_base_url()?,
            &config.login_path,
            &config.landing_path,
        )
    }

    /// Login page, optionally carrying a reason marker.
    pub fn login_url(&self, redirect: Option<LoginRedirect>) -> String {
        let mut url = self.login.clone();
        if let Some(redirect) = redirect {
            let (key, value) = redirect.marker();
            url.query_pairs_mut().append_pair(key, value);
        }
        url.to_string()
    }

    /// Authenticated landing area.
    pub fn landing_url(&self) -> String {
        self.landing.to_string()
    }
}

/// Navigator that only records where it was sent.
#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visited.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visited.lock().unwrap().push(url.to_string());
    }
}
