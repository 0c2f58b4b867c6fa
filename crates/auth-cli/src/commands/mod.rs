//! CLI command implementations.

mod auth;
mod oauth;

pub use auth::{
    change_password, forgot_password, login, logout, register, reset_password, status, whoami,
};
pub use oauth::{oauth_begin, oauth_complete};

use crate::navigator::BrowserNavigator;
use anyhow::{Context as _, Result};
use auth_config_and_utils::{Config, Paths};
use auth_session::{
    HumanVerificationGate, OAuthCallbackCoordinator, OAuthRedirectInitiator, OAuthStateStore,
    SessionManager, StaticProofProvider,
};
use credential_storage::{open_file_storage, ClientStorage};
use std::io::{self, Write};
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, wired from the on-disk config.
pub struct Runtime {
    pub paths: Paths,
    pub config: Config,
    pub storage: Arc<dyn ClientStorage>,
    pub session: Arc<SessionManager>,
    pub gate: Arc<HumanVerificationGate>,
}

impl Runtime {
    /// Load config and storage, then hydrate the session.
    ///
    /// A `proof` given on the command line becomes the verification provider,
    /// which makes the gate ready.
    pub fn load(proof: Option<String>) -> Result<Self> {
        let paths = Paths::new()?;
        let config = Config::load(&paths).context("Failed to load configuration")?;
        let storage = open_file_storage(&paths.storage_file())
            .with_context(|| format!("Failed to open {}", paths.storage_file().display()))?;

        let session =
            SessionManager::from_config(&config, storage.clone(), Arc::new(BrowserNavigator))?;
        session.hydrate()?;

        let gate = HumanVerificationGate::from_config(&config);
        if let Some(proof) = proof {
            gate.install(Arc::new(StaticProofProvider::new(proof)));
        }

        debug!(
            api = %config.api_base_url,
            verification = gate.is_enabled(),
            "Runtime loaded"
        );

        Ok(Self {
            paths,
            config,
            storage,
            session: Arc::new(session),
            gate: Arc::new(gate),
        })
    }

    pub fn state_store(&self) -> OAuthStateStore {
        OAuthStateStore::new(self.storage.clone())
    }

    pub fn initiator(&self) -> OAuthRedirectInitiator {
        OAuthRedirectInitiator::new(
            self.session.clone(),
            self.state_store(),
            self.config.oauth_providers.clone(),
        )
    }

    pub fn coordinator(&self) -> OAuthCallbackCoordinator {
        OAuthCallbackCoordinator::new(
            self.session.clone(),
            self.state_store(),
            self.gate.clone(),
            self.config.oauth_providers.clone(),
        )
    }
}

/// Prompt for a line of input on stdout.
fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;
    let mut value = String::new();
    io::stdin().read_line(&mut value)?;
    Ok(value.trim().to_string())
}

/// Use `given` or prompt for a required value.
fn value_or_prompt(given: Option<String>, label: &str) -> Result<String> {
    let value = match given {
        Some(value) => value.trim().to_string(),
        None => prompt(label)?,
    };
    if value.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(value)
}

/// Use `given` or prompt without echo for a required secret.
fn secret_or_prompt(given: Option<String>, label: &str) -> Result<String> {
    let value = match given {
        Some(value) => value,
        None => rpassword::prompt_password(format!("{}: ", label))?,
    };
    if value.is_empty() {
        anyhow::bail!("{} is required", label);
    }
    Ok(value)
}
