//! Outbound backend calls.
//!
//! Every request carries the current credential when one exists. Responses
//! are inspected before the caller sees them: a 401 from a protected endpoint
//! tears the session down and sends the user to the login page with
//! `reason=session-expired`; a 401 from a credential attempt (login, register,
//! OAuth exchange) is handed back as an ordinary API error.

use crate::api::ApiEnvelope;
use crate::context::SessionContext;
use crate::navigation::{AppRoutes, LoginRedirect, Navigator};
use crate::{AuthError, AuthResult};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_MESSAGE_CHARS: usize = 200;

/// How a 401 from an endpoint is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Requires a live session; 401 means the session is gone
    Protected,
    /// Is itself an authentication attempt; 401 means bad credentials
    CredentialAttempt,
}

/// A backend route relative to the API base.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub method: Method,
    pub path: String,
    pub kind: EndpointKind,
}

impl Endpoint {
    pub fn get(path: impl Into<String>, kind: EndpointKind) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            kind,
        }
    }

    pub fn post(path: impl Into<String>, kind: EndpointKind) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            kind,
        }
    }
}

pub struct RequestPipeline {
    client: Client,
    api_base: String,
    context: Arc<SessionContext>,
    navigator: Arc<dyn Navigator>,
    routes: AppRoutes,
}

impl RequestPipeline {
    pub fn new(
        api_base: &str,
        timeout: Duration,
        context: Arc<SessionContext>,
        navigator: Arc<dyn Navigator>,
        routes: AppRoutes,
    ) -> AuthResult<Self> {
        url::Url::parse(api_base)?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            context,
            navigator,
            routes,
        })
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn routes(&self) -> &AppRoutes {
        &self.routes
    }

    /// Send a request without a body.
    pub async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
    ) -> AuthResult<ApiEnvelope<T>> {
        self.dispatch::<(), T>(endpoint, None).await
    }

    /// Send a request with a JSON body.
    pub async fn call_with<B, T>(
        &self,
        endpoint: &Endpoint,
        body: &B,
    ) -> AuthResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.dispatch(endpoint, Some(body)).await
    }

    async fn dispatch<B, T>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
    ) -> AuthResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.api_base, endpoint.path);
        let mut request = self.client.request(endpoint.method.clone(), &url);

        let token = self.context.credentials().get()?;
        let authenticated = token.is_some();
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(
            method = %endpoint.method,
            path = %endpoint.path,
            authenticated,
            "Sending request"
        );

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let body = response.bytes().await?;
            let envelope = serde_json::from_slice::<ApiEnvelope<T>>(&body)?;
            return Ok(envelope);
        }

        let text = response.text().await.unwrap_or_default();
        let message = extract_message(&text, status);

        if status == StatusCode::UNAUTHORIZED && endpoint.kind == EndpointKind::Protected {
            warn!(path = %endpoint.path, "Protected call rejected, tearing down session");
            self.context.teardown();
            self.navigator
                .navigate(&self.routes.login_url(Some(LoginRedirect::SessionExpired)));
            return Err(AuthError::SessionExpired);
        }

        debug!(path = %endpoint.path, status = status.as_u16(), "Request failed");
        Err(AuthError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Unwrap the payload of a successful envelope.
pub fn expect_data<T>(envelope: ApiEnvelope<T>) -> AuthResult<T> {
    if !envelope.success {
        return Err(AuthError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "Request was rejected".to_string()),
        ));
    }
    envelope
        .data
        .ok_or_else(|| AuthError::Rejected("Response carried no data".to_string()))
}

/// Check an acknowledgement envelope, returning its message if any.
pub fn expect_ack<T>(envelope: ApiEnvelope<T>) -> AuthResult<Option<String>> {
    if !envelope.success {
        return Err(AuthError::Rejected(
            envelope
                .message
                .unwrap_or_else(|| "Request was rejected".to_string()),
        ));
    }
    Ok(envelope.message)
}

/// Best human-readable message from an error body.
fn extract_message(body: &str, status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
        match value.get("detail") {
            Some(serde_json::Value::String(detail)) => return detail.clone(),
            // Validation failures arrive as a list of {loc, msg}
            Some(serde_json::Value::Array(items)) => {
                if let Some(msg) = items
                    .first()
                    .and_then(|item| item.get("msg"))
                    .and_then(|m| m.as_str())
                {
                    return msg.to_string();
                }
            }
            _ => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string();
    }
    trimmed.chars().take(MAX_MESSAGE_CHARS).collect()
}
