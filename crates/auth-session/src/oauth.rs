//! Third-party login: redirect initiation and callback completion.
//!
//! The initiator asks the backend for a provider authorization URL, keeps the
//! backend-minted anti-CSRF `state`, and sends the user to the provider. When
//! the provider sends the user back, the callback coordinator validates the
//! parameters, waits for the verification gate if needed, consumes the stored
//! state (deleting it whatever the outcome) and exchanges the code for a
//! session.

use crate::api::{AuthPayload, OAuthExchangeRequest, OAuthUrlPayload, OAuthUrlRequest, User};
use crate::navigation::LoginRedirect;
use crate::oauth_fsm::{CallbackMachine, CallbackMachineInput, CallbackState};
use crate::pipeline::{expect_data, Endpoint, EndpointKind};
use crate::session::SessionManager;
use crate::verification::{HumanVerificationGate, ACTION_OAUTH_CALLBACK};
use crate::{AuthError, AuthResult};
use credential_storage::{ClientStorage, StorageKeys, StorageResult};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

const AUTH_URL_PATH: &str = "/auth/oauth/auth-url";

/// Query parameters delivered to the callback route. All untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthCallbackParams {
    pub provider: Option<String>,
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl OAuthCallbackParams {
    /// Parse `…/auth/callback/{provider}?code=…&state=…&error=…`.
    ///
    /// Empty values count as absent. A URL without the callback path yields no
    /// provider, which later fails validation.
    pub fn from_callback_url(raw: &str) -> AuthResult<Self> {
        let url = Url::parse(raw)?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let provider = segments
            .windows(3)
            .find(|w| w[0] == "auth" && w[1] == "callback")
            .map(|w| w[2].to_string());

        let mut params = Self {
            provider,
            ..Self::default()
        };
        for (key, value) in url.query_pairs() {
            let value = Some(value.into_owned()).filter(|v| !v.is_empty());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                _ => {}
            }
        }
        Ok(params)
    }
}

/// Storage slot for the single outstanding OAuth state token.
#[derive(Clone)]
pub struct OAuthStateStore {
    storage: Arc<dyn ClientStorage>,
}

impl OAuthStateStore {
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    /// Persist `state`, replacing any earlier one.
    pub fn remember(&self, state: &str) -> StorageResult<()> {
        self.storage.set(StorageKeys::OAUTH_STATE, state)
    }

    /// Read and delete the stored state.
    ///
    /// The delete is attempted even when the read fails; an error from either
    /// is returned so callers can refuse to proceed.
    pub fn take(&self) -> StorageResult<Option<String>> {
        let stored = self.storage.get(StorageKeys::OAUTH_STATE);
        let removed = self.storage.delete(StorageKeys::OAUTH_STATE);
        let stored = stored?;
        removed?;
        Ok(stored)
    }

    pub fn peek(&self) -> StorageResult<Option<String>> {
        self.storage.get(StorageKeys::OAUTH_STATE)
    }
}

/// Where the user was sent to start a third-party login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRedirect {
    pub provider: String,
    pub auth_url: String,
}

pub struct OAuthRedirectInitiator {
    session: Arc<SessionManager>,
    state_store: OAuthStateStore,
    providers: Vec<String>,
}

impl OAuthRedirectInitiator {
    pub fn new(
        session: Arc<SessionManager>,
        state_store: OAuthStateStore,
        providers: Vec<String>,
    ) -> Self {
        Self {
            session,
            state_store,
            providers,
        }
    }

    /// Fetch the provider URL, keep its state, and navigate there.
    ///
    /// The state is only stored once the backend has answered successfully.
    pub async fn begin_oauth(&self, provider: &str) -> AuthResult<OAuthRedirect> {
        if !self.providers.iter().any(|p| p == provider) {
            return Err(AuthError::UnsupportedProvider(provider.to_string()));
        }

        let pipeline = self.session.pipeline();
        let endpoint = Endpoint::post(AUTH_URL_PATH, EndpointKind::Protected);
        let payload: OAuthUrlPayload =
            expect_data(pipeline.call_with(&endpoint, &OAuthUrlRequest { provider }).await?)?;

        Url::parse(&payload.auth_url)?;
        self.state_store.remember(&payload.state)?;

        info!(provider, "Redirecting to OAuth provider");
        pipeline.navigator().navigate(&payload.auth_url);

        Ok(OAuthRedirect {
            provider: provider.to_string(),
            auth_url: payload.auth_url,
        })
    }
}

/// Why a callback ended in `Failed`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OAuthFailure {
    #[error("Provider denied the request: {0}")]
    ProviderDenied(String),

    #[error("Callback parameters missing or provider not allowed")]
    InvalidParameters,

    #[error("State token missing or mismatched")]
    StateMismatch,

    #[error("Code exchange failed: {0}")]
    Exchange(String),
}

impl OAuthFailure {
    /// Login page marker for this failure.
    pub fn redirect(&self) -> LoginRedirect {
        match self {
            OAuthFailure::ProviderDenied(_) => LoginRedirect::OAuthDenied,
            OAuthFailure::InvalidParameters => LoginRedirect::OAuthInvalid,
            OAuthFailure::StateMismatch | OAuthFailure::Exchange(_) => LoginRedirect::OAuthFailed,
        }
    }
}

/// Result of one callback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Another invocation owns the machine, or it already finished
    Ignored,
    /// Verification is enabled but not ready; nothing was sent
    Deferred,
    Succeeded(User),
    Failed(OAuthFailure),
}

pub struct OAuthCallbackCoordinator {
    session: Arc<SessionManager>,
    state_store: OAuthStateStore,
    gate: Arc<HumanVerificationGate>,
    providers: Vec<String>,
    machine: Mutex<CallbackMachine>,
}

impl OAuthCallbackCoordinator {
    pub fn new(
        session: Arc<SessionManager>,
        state_store: OAuthStateStore,
        gate: Arc<HumanVerificationGate>,
        providers: Vec<String>,
    ) -> Self {
        Self {
            session,
            state_store,
            gate,
            providers,
            machine: Mutex::new(CallbackMachine::new()),
        }
    }

    pub fn state(&self) -> CallbackState {
        CallbackState::from(self.machine.lock().unwrap().state())
    }

    fn transition(&self, input: &CallbackMachineInput) -> AuthResult<CallbackState> {
        let mut machine = self.machine.lock().unwrap();
        let old_state = CallbackState::from(machine.state());

        machine.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input, old_state
            ))
        })?;

        let new_state = CallbackState::from(machine.state());
        debug!(old_state = ?old_state, new_state = ?new_state, "Callback state transition");
        Ok(new_state)
    }

    /// Transitions after `Begin` are owned by this invocation and cannot race.
    fn advance(&self, input: CallbackMachineInput) {
        if let Err(e) = self.transition(&input) {
            error!(error = %e, "Callback machine out of step");
        }
    }

    fn fail(&self, input: CallbackMachineInput, failure: OAuthFailure) -> CallbackOutcome {
        self.advance(input);
        warn!(reason = %failure, "OAuth callback failed");
        let routes = self.session.pipeline().routes();
        self.session
            .pipeline()
            .navigator()
            .navigate(&routes.login_url(Some(failure.redirect())));
        CallbackOutcome::Failed(failure)
    }

    /// Run one invocation of the callback.
    pub async fn process(&self, params: &OAuthCallbackParams) -> CallbackOutcome {
        if self.transition(&CallbackMachineInput::Begin).is_err() {
            debug!(state = ?self.state(), "Callback already handled, ignoring");
            return CallbackOutcome::Ignored;
        }

        if let Some(error) = &params.error {
            return self.fail(
                CallbackMachineInput::ProviderDenied,
                OAuthFailure::ProviderDenied(error.clone()),
            );
        }

        let (provider, code, state) = match (&params.provider, &params.code, &params.state) {
            (Some(provider), Some(code), Some(state))
                if self.providers.iter().any(|p| p == provider) =>
            {
                (provider.as_str(), code.as_str(), state.as_str())
            }
            _ => {
                return self.fail(
                    CallbackMachineInput::ParamsInvalid,
                    OAuthFailure::InvalidParameters,
                )
            }
        };
        self.advance(CallbackMachineInput::ParamsAccepted);

        if self.gate.is_enabled() && !self.gate.is_ready() {
            self.advance(CallbackMachineInput::VerificationPending);
            info!(provider, "Verification not ready, deferring callback");
            return CallbackOutcome::Deferred;
        }
        self.advance(CallbackMachineInput::VerificationReady);

        let proof = self.gate.get_token(ACTION_OAUTH_CALLBACK).await;

        match self.state_store.take() {
            Ok(Some(stored)) if stored == state => {}
            Ok(stored) => {
                debug!(stored = stored.is_some(), "State token mismatch");
                return self.fail(
                    CallbackMachineInput::StateRejected,
                    OAuthFailure::StateMismatch,
                );
            }
            Err(e) => {
                warn!(error = %e, "Could not consume stored state token");
                return self.fail(
                    CallbackMachineInput::StateRejected,
                    OAuthFailure::StateMismatch,
                );
            }
        }

        match exchange_code(&self.session, provider, code, state, proof.as_deref()).await {
            Ok(user) => {
                self.advance(CallbackMachineInput::ExchangeSucceeded);
                info!(provider, user_id = %user.id, "OAuth login completed");
                let pipeline = self.session.pipeline();
                pipeline.navigator().navigate(&pipeline.routes().landing_url());
                CallbackOutcome::Succeeded(user)
            }
            Err(e) => self.fail(
                CallbackMachineInput::ExchangeFailed,
                OAuthFailure::Exchange(e.to_string()),
            ),
        }
    }

    /// Process the callback, re-entering once each time the gate becomes ready.
    ///
    /// Returns `Deferred` only if the gate is dropped before it ever became
    /// ready.
    pub async fn run(&self, params: &OAuthCallbackParams) -> CallbackOutcome {
        let mut ready = self.gate.subscribe();
        loop {
            match self.process(params).await {
                CallbackOutcome::Deferred => {
                    let closed = ready.wait_for(|r| *r).await.is_err();
                    if closed {
                        return CallbackOutcome::Deferred;
                    }
                    debug!("Verification ready, resuming callback");
                }
                outcome => return outcome,
            }
        }
    }
}

/// Exchange an authorization code; on success the session is established.
async fn exchange_code(
    session: &SessionManager,
    provider: &str,
    code: &str,
    state: &str,
    proof: Option<&str>,
) -> AuthResult<User> {
    let endpoint = Endpoint::post(
        format!("/auth/oauth/{provider}/callback"),
        EndpointKind::Protected,
    );
    let body = OAuthExchangeRequest {
        code,
        state,
        recaptcha_token: proof,
    };
    let payload: AuthPayload = expect_data(session.pipeline().call_with(&endpoint, &body).await?)?;
    session.finalize(payload)
}
