//! Configuration for the session manager and its front ends.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default backend API base.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Default browser-facing application origin.
pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_CACHE_FRESH_SECS: u64 = 15 * 60;
const DEFAULT_CACHE_EVICT_AFTER_SECS: u64 = 30 * 60;

/// Human-verification settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub site_key: Option<String>,
}

/// Cached-user windows, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicyConfig {
    /// How long a fetched user is served without refetching
    #[serde(default = "default_fresh_secs")]
    pub fresh_secs: u64,
    /// How long an unused entry is retained at all
    #[serde(default = "default_evict_after_secs")]
    pub evict_after_secs: u64,
}

impl Default for CachePolicyConfig {
    fn default() -> Self {
        Self {
            fresh_secs: DEFAULT_CACHE_FRESH_SECS,
            evict_after_secs: DEFAULT_CACHE_EVICT_AFTER_SECS,
        }
    }
}

impl CachePolicyConfig {
    pub fn fresh_for(&self) -> Duration {
        Duration::from_secs(self.fresh_secs)
    }

    pub fn evict_after(&self) -> Duration {
        Duration::from_secs(self.evict_after_secs)
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend API base, e.g. `http://localhost:8000/api/v1`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Browser-facing origin used to build login and landing URLs.
    #[serde(default = "default_app_base_url")]
    pub app_base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
    /// Providers accepted for third-party login.
    #[serde(default = "default_oauth_providers")]
    pub oauth_providers: Vec<String>,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub user_cache: CachePolicyConfig,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_app_base_url() -> String {
    DEFAULT_APP_BASE_URL.to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_landing_path() -> String {
    "/dashboard".to_string()
}

fn default_oauth_providers() -> Vec<String> {
    vec!["github".to_string(), "google".to_string()]
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_fresh_secs() -> u64 {
    DEFAULT_CACHE_FRESH_SECS
}

fn default_evict_after_secs() -> u64 {
    DEFAULT_CACHE_EVICT_AFTER_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            app_base_url: default_app_base_url(),
            login_path: default_login_path(),
            landing_path: default_landing_path(),
            oauth_providers: default_oauth_providers(),
            verification: VerificationConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
            user_cache: CachePolicyConfig::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `AUTH_*` overrides from `lookup`. Empty values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(level) = var("AUTH_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = var("AUTH_API_URL") {
            self.api_base_url = url;
        }
        if let Some(url) = var("AUTH_APP_URL") {
            self.app_base_url = url;
        }
        if let Some(enabled) = var("AUTH_VERIFICATION_ENABLED") {
            self.verification.enabled =
                matches!(enabled.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        if let Some(site_key) = var("AUTH_VERIFICATION_SITE_KEY") {
            self.verification.site_key = Some(site_key);
        }
    }

    /// Reject values that would make every request fail.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        self.app_base_url()?;
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be positive".to_string(),
            ));
        }
        if self.user_cache.evict_after_secs < self.user_cache.fresh_secs {
            return Err(CoreError::Config(
                "user_cache.evict_after_secs must not be shorter than fresh_secs".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the API base as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    /// Get the application origin as a parsed URL.
    pub fn app_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.app_base_url).map_err(CoreError::from)
    }

    /// Verification is on only when enabled and a site key is configured.
    pub fn is_verification_enabled(&self) -> bool {
        self.verification.enabled
            && self
                .verification
                .site_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Whether `provider` is on the third-party login allow-list.
    pub fn is_provider_allowed(&self, provider: &str) -> bool {
        self.oauth_providers.iter().any(|p| p == provider)
    }
}
