//! Session façade: password flows, logout, and the cached current user.

use crate::api::{
    AuthPayload, ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, RegisterRequest,
    ResetPasswordRequest, User,
};
use crate::context::SessionContext;
use crate::navigation::{AppRoutes, Navigator};
use crate::pipeline::{expect_ack, expect_data, Endpoint, EndpointKind, RequestPipeline};
use crate::user_cache::{CachePolicy, CacheLookup};
use crate::{AuthError, AuthResult};
use auth_config_and_utils::Config;
use credential_storage::ClientStorage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const LOGIN_PATH: &str = "/auth/login";
const REGISTER_PATH: &str = "/auth/register";
const FORGOT_PASSWORD_PATH: &str = "/auth/forgot-password";
const RESET_PASSWORD_PATH: &str = "/auth/reset-password";
const CHANGE_PASSWORD_PATH: &str = "/auth/change-password";
const ME_PATH: &str = "/auth/me";

/// Point-in-time view of the session, computed without network access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSnapshot {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

pub struct SessionManager {
    pipeline: Arc<RequestPipeline>,
}

impl SessionManager {
    pub fn new(pipeline: Arc<RequestPipeline>) -> Self {
        Self { pipeline }
    }

    /// Wire a context, routes and pipeline from configuration.
    pub fn from_config(
        config: &Config,
        storage: Arc<dyn ClientStorage>,
        navigator: Arc<dyn Navigator>,
    ) -> AuthResult<Self> {
        config.validate()?;
        let context = Arc::new(SessionContext::new(
            storage,
            CachePolicy::from(&config.user_cache),
        ));
        let pipeline = RequestPipeline::new(
            &config.api_base_url,
            config.request_timeout(),
            context,
            navigator,
            AppRoutes::from_config(config)?,
        )?;
        Ok(Self::new(Arc::new(pipeline)))
    }

    pub fn pipeline(&self) -> &Arc<RequestPipeline> {
        &self.pipeline
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        self.pipeline.context()
    }

    /// Load the persisted credential. Returns whether one was found.
    pub fn hydrate(&self) -> AuthResult<bool> {
        self.context().hydrate()
    }

    /// Sign in with email and password.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        proof: Option<&str>,
    ) -> AuthResult<User> {
        let endpoint = Endpoint::post(LOGIN_PATH, EndpointKind::CredentialAttempt);
        let body = LoginRequest {
            email,
            password,
            recaptcha_token: proof,
        };

        let payload = expect_data(self.pipeline.call_with(&endpoint, &body).await?)?;
        let user = self.finalize(payload)?;
        info!(user_id = %user.id, "Logged in");
        Ok(user)
    }

    /// Create an account and sign in.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        proof: Option<&str>,
    ) -> AuthResult<User> {
        let endpoint = Endpoint::post(REGISTER_PATH, EndpointKind::CredentialAttempt);
        let body = RegisterRequest {
            email,
            password,
            name,
            recaptcha_token: proof,
        };

        let payload = expect_data(self.pipeline.call_with(&endpoint, &body).await?)?;
        let user = self.finalize(payload)?;
        info!(user_id = %user.id, "Registered");
        Ok(user)
    }

    /// Ask the backend to send a reset link. Returns the backend's message.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<Option<String>> {
        let endpoint = Endpoint::post(FORGOT_PASSWORD_PATH, EndpointKind::Protected);
        let envelope = self
            .pipeline
            .call_with::<_, serde_json::Value>(&endpoint, &ForgotPasswordRequest { email })
            .await?;
        expect_ack(envelope)
    }

    /// Set a new password from a reset token. Does not sign in.
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> AuthResult<Option<String>> {
        let endpoint = Endpoint::post(RESET_PASSWORD_PATH, EndpointKind::Protected);
        let body = ResetPasswordRequest {
            token,
            password: new_password,
        };
        let envelope = self
            .pipeline
            .call_with::<_, serde_json::Value>(&endpoint, &body)
            .await?;
        expect_ack(envelope)
    }

    /// Change the password of the signed-in user.
    pub async fn change_password(
        &self,
        current: &str,
        new_password: &str,
    ) -> AuthResult<Option<String>> {
        let endpoint = Endpoint::post(CHANGE_PASSWORD_PATH, EndpointKind::Protected);
        let body = ChangePasswordRequest {
            current_password: current,
            new_password,
        };
        let envelope = self
            .pipeline
            .call_with::<_, serde_json::Value>(&endpoint, &body)
            .await?;
        expect_ack(envelope)
    }

    /// Drop the credential and all cached session state. No network.
    pub fn logout(&self) {
        self.context().teardown();
        info!("Logged out");
    }

    /// The signed-in user, served from cache while fresh.
    ///
    /// Without a credential this returns `Ok(None)` and makes no request.
    pub async fn current_user(&self) -> AuthResult<Option<User>> {
        let context = self.context();
        if !context.credentials().is_present()? {
            context.user_cache().clear();
            return Ok(None);
        }

        match context.user_cache().lookup() {
            CacheLookup::Fresh(user) => Ok(Some(user)),
            CacheLookup::Stale(_) => match self.fetch_current_user().await {
                Ok(user) => Ok(Some(user)),
                Err(e) => {
                    if !matches!(e, AuthError::SessionExpired) {
                        warn!(error = %e, "Refetch of stale user failed, keeping cached entry");
                    }
                    Err(e)
                }
            },
            CacheLookup::Miss => self.fetch_current_user().await.map(Some),
        }
    }

    /// Snapshot of the session without touching the network.
    pub fn status(&self) -> AuthResult<AuthSnapshot> {
        let context = self.context();
        let authenticated = context.credentials().is_present()?;
        let user = if authenticated {
            context.user_cache().peek()
        } else {
            None
        };
        Ok(AuthSnapshot {
            authenticated,
            user,
        })
    }

    async fn fetch_current_user(&self) -> AuthResult<User> {
        debug!("Fetching current user");
        let endpoint = Endpoint::get(ME_PATH, EndpointKind::Protected);
        let user: User = expect_data(self.pipeline.call(&endpoint).await?)?;

        let context = self.context();
        // A logout may have landed while the request was in flight
        if context.credentials().is_present()? {
            context.user_cache().store(user.clone());
        }
        Ok(user)
    }

    /// Shared success path for every way of obtaining a session.
    pub(crate) fn finalize(&self, payload: AuthPayload) -> AuthResult<User> {
        self.context().establish(&payload.token, payload.user.clone())?;
        Ok(payload.user)
    }
}
