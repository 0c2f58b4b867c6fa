//! Configuration, paths, and logging shared by the auth session crates.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    CachePolicyConfig, Config, VerificationConfig, DEFAULT_API_BASE_URL, DEFAULT_APP_BASE_URL,
    DEFAULT_LOG_LEVEL,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, parse_level};
pub use paths::Paths;
