//! Human-verification gate.
//!
//! Wraps an external challenge provider that yields short-lived, action-scoped
//! proof strings. Acquisition never fails from the caller's point of view: a
//! disabled gate, a provider that has not been installed yet, or a provider
//! error all come back as "no proof".

use async_trait::async_trait;
use auth_config_and_utils::Config;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Action name for password login.
pub const ACTION_LOGIN: &str = "login";
/// Action name for registration.
pub const ACTION_REGISTER: &str = "register";
/// Action name for the OAuth callback exchange.
pub const ACTION_OAUTH_CALLBACK: &str = "oauth_callback";

/// Black-box source of verification proofs.
#[async_trait]
pub trait ChallengeProvider: Send + Sync {
    async fn execute(&self, action: &str) -> Result<String, String>;
}

/// Provider that hands out a fixed proof, e.g. one pasted on the command line.
pub struct StaticProofProvider {
    proof: String,
}

impl StaticProofProvider {
    pub fn new(proof: impl Into<String>) -> Self {
        Self {
            proof: proof.into(),
        }
    }
}

#[async_trait]
impl ChallengeProvider for StaticProofProvider {
    async fn execute(&self, _action: &str) -> Result<String, String> {
        Ok(self.proof.clone())
    }
}

pub struct HumanVerificationGate {
    enabled: bool,
    provider: Mutex<Option<Arc<dyn ChallengeProvider>>>,
    ready: watch::Sender<bool>,
}

impl HumanVerificationGate {
    pub fn new(enabled: bool) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            enabled,
            provider: Mutex::new(None),
            ready,
        }
    }

    /// Gate that never asks for proofs.
    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.is_verification_enabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True once a provider has been installed.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Install the challenge provider and signal readiness.
    pub fn install(&self, provider: Arc<dyn ChallengeProvider>) {
        *self.provider.lock().unwrap() = Some(provider);
        self.ready.send_replace(true);
        debug!("Verification provider installed");
    }

    /// Readiness as an observable value; flips to `true` on `install`.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Acquire a proof for `action`, or none.
    pub async fn get_token(&self, action: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let provider = self.provider.lock().unwrap().clone();
        let Some(provider) = provider else {
            debug!(action, "Verification provider not ready");
            return None;
        };

        match provider.execute(action).await {
            Ok(proof) if !proof.is_empty() => Some(proof),
            Ok(_) => None,
            Err(e) => {
                warn!(action, error = %e, "Verification challenge failed");
                None
            }
        }
    }
}
