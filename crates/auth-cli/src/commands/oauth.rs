//! Third-party login commands.

use super::Runtime;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use auth_session::{CallbackOutcome, OAuthCallbackParams};
use serde_json::json;

/// Start a provider login in the browser.
pub async fn oauth_begin(runtime: &Runtime, provider: &str, format: &OutputFormat) -> Result<()> {
    let redirect = runtime.initiator().begin_oauth(provider).await?;

    match format {
        OutputFormat::Text => {
            println!("Continue in your browser to sign in with {}.", redirect.provider);
            println!("When redirected back, run:");
            println!("  authctl oauth complete '<callback-url>'");
        }
        OutputFormat::Json => output::print_json(&json!({
            "status": "redirected",
            "provider": redirect.provider,
            "auth_url": redirect.auth_url,
        })),
    }
    Ok(())
}

/// Finish a provider login from the callback URL the browser landed on.
pub async fn oauth_complete(
    runtime: &Runtime,
    callback_url: &str,
    format: &OutputFormat,
) -> Result<()> {
    let params = OAuthCallbackParams::from_callback_url(callback_url)?;

    match runtime.coordinator().process(&params).await {
        CallbackOutcome::Succeeded(user) => {
            output::print_success(&format!("Logged in as {}", user.email), format);
            Ok(())
        }
        CallbackOutcome::Deferred => {
            anyhow::bail!("Human verification is required; re-run with --proof <token>")
        }
        CallbackOutcome::Ignored => {
            output::print_success("Callback already handled", format);
            Ok(())
        }
        CallbackOutcome::Failed(failure) => {
            let (_, marker) = failure.redirect().marker();
            Err(anyhow::Error::new(failure).context(format!("OAuth login failed ({})", marker)))
        }
    }
}
