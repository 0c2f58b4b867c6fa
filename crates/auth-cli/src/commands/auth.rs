//! Authentication commands.

use super::{secret_or_prompt, value_or_prompt, Runtime};
use crate::output::{self, OutputFormat};
use anyhow::{Context as _, Result};
use auth_session::{AuthError, ACTION_LOGIN, ACTION_REGISTER};
use serde_json::json;

/// Login with email and password.
pub async fn login(
    runtime: &Runtime,
    email: Option<String>,
    password: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let snapshot = runtime.session.status()?;
    if snapshot.authenticated {
        let who = snapshot
            .user
            .as_ref()
            .map(|u| u.email.clone())
            .unwrap_or_else(|| "current user".to_string());
        output::print_success(&format!("Already logged in as {}", who), format);
        return Ok(());
    }

    let email = value_or_prompt(email, "Email")?;
    let password = secret_or_prompt(password, "Password")?;
    let proof = runtime.gate.get_token(ACTION_LOGIN).await;

    let user = runtime
        .session
        .login(&email, &password, proof.as_deref())
        .await
        .context("Login failed")?;
    output::print_success(&format!("Logged in as {}", user.email), format);
    Ok(())
}

/// Create an account and sign in.
pub async fn register(
    runtime: &Runtime,
    email: Option<String>,
    name: Option<String>,
    password: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let email = value_or_prompt(email, "Email")?;
    let name = value_or_prompt(name, "Name")?;
    let password = secret_or_prompt(password, "Password")?;
    let proof = runtime.gate.get_token(ACTION_REGISTER).await;

    let user = runtime
        .session
        .register(&email, &password, &name, proof.as_deref())
        .await
        .context("Registration failed")?;
    output::print_success(&format!("Registered and logged in as {}", user.email), format);
    Ok(())
}

/// Logout and clear session.
pub fn logout(runtime: &Runtime, format: &OutputFormat) -> Result<()> {
    runtime.session.logout();
    output::print_success("Logged out successfully", format);
    Ok(())
}

/// Show local session status without contacting the backend.
pub fn status(runtime: &Runtime, format: &OutputFormat) -> Result<()> {
    let snapshot = runtime.session.status()?;

    match format {
        OutputFormat::Text => {
            output::print_row("API", &runtime.config.api_base_url);
            output::print_row(
                "Storage",
                &runtime.paths.storage_file().display().to_string(),
            );
            output::print_row(
                "Verification",
                if runtime.gate.is_enabled() {
                    "enabled"
                } else {
                    "disabled"
                },
            );
            let auth = if snapshot.authenticated {
                "logged in"
            } else {
                "not logged in"
            };
            output::print_row("Auth", auth);
            if let Some(user) = &snapshot.user {
                output::print_row("User", user.display_name());
            }
        }
        OutputFormat::Json => output::print_json(&json!({
            "api_base_url": runtime.config.api_base_url,
            "verification_enabled": runtime.gate.is_enabled(),
            "session": snapshot,
        })),
    }
    Ok(())
}

/// Show the signed-in user, fetching it if the cache is empty.
pub async fn whoami(runtime: &Runtime, format: &OutputFormat) -> Result<()> {
    let user = match runtime.session.current_user().await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(AuthError::NotLoggedIn.into()),
        Err(AuthError::SessionExpired) => {
            anyhow::bail!("Session expired, please log in again")
        }
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Text => {
            output::print_row("ID", &user.id);
            output::print_row("Email", &user.email);
            output::print_row("Name", user.display_name());
            if let Some(provider) = &user.oauth_provider {
                output::print_row("Provider", provider);
            }
            output::print_row("Active", if user.is_active { "yes" } else { "no" });
            output::print_row("Created", &user.created_at);
        }
        OutputFormat::Json => output::print_json(&user),
    }
    Ok(())
}

/// Request a password reset email.
pub async fn forgot_password(
    runtime: &Runtime,
    email: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let email = value_or_prompt(email, "Email")?;
    let message = runtime.session.forgot_password(&email).await?;
    output::print_success(
        message
            .as_deref()
            .unwrap_or("If the address is registered, a reset link is on its way"),
        format,
    );
    Ok(())
}

/// Set a new password using a reset token.
pub async fn reset_password(
    runtime: &Runtime,
    token: String,
    password: Option<String>,
    format: &OutputFormat,
) -> Result<()> {
    let password = secret_or_prompt(password, "New password")?;
    let message = runtime.session.reset_password(&token, &password).await?;
    output::print_success(
        message.as_deref().unwrap_or("Password reset, you can now log in"),
        format,
    );
    Ok(())
}

/// Change the password of the signed-in user.
pub async fn change_password(runtime: &Runtime, format: &OutputFormat) -> Result<()> {
    if !runtime.session.status()?.authenticated {
        return Err(AuthError::NotLoggedIn.into());
    }

    let current = secret_or_prompt(None, "Current password")?;
    let new_password = secret_or_prompt(None, "New password")?;
    let confirmation = secret_or_prompt(None, "Repeat new password")?;
    if new_password != confirmation {
        anyhow::bail!("Passwords do not match");
    }

    let message = runtime
        .session
        .change_password(&current, &new_password)
        .await?;
    output::print_success(message.as_deref().unwrap_or("Password changed"), format);
    Ok(())
}
