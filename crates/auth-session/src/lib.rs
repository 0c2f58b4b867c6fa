//! Client-side authentication session management.
//!
//! This crate provides:
//! - A persistent bearer credential with lazy loading
//! - A request pipeline that attaches the credential and tears the session
//!   down when a protected call comes back 401
//! - A session façade for password flows and a cached current user
//! - Third-party (OAuth) login: redirect initiation and an FSM-driven callback
//!   coordinator with single-use state tokens
//! - A human-verification gate whose readiness is an observable event

mod api;
mod context;
mod credential;
mod error;
mod navigation;
mod oauth;
mod oauth_fsm;
mod pipeline;
mod session;
mod user_cache;
mod verification;

pub use api::{ApiEnvelope, AuthPayload, OAuthUrlPayload, User};
pub use context::SessionContext;
pub use credential::CredentialStore;
pub use error::{AuthError, AuthResult};
pub use navigation::{AppRoutes, LoginRedirect, Navigator, RecordingNavigator};
pub use oauth::{
    CallbackOutcome, OAuthCallbackCoordinator, OAuthCallbackParams, OAuthFailure, OAuthRedirect,
    OAuthRedirectInitiator, OAuthStateStore,
};
pub use oauth_fsm::callback_machine;
pub use oauth_fsm::{CallbackMachine, CallbackMachineInput, CallbackMachineState, CallbackState};
pub use pipeline::{expect_ack, expect_data, Endpoint, EndpointKind, RequestPipeline};
pub use session::{AuthSnapshot, SessionManager};
pub use user_cache::{CacheLookup, CachePolicy, UserCache};
pub use verification::{
    ChallengeProvider, HumanVerificationGate, StaticProofProvider, ACTION_LOGIN,
    ACTION_OAUTH_CALLBACK, ACTION_REGISTER,
};

#[cfg(test)]
mod tests;
