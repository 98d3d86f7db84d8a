//! Sign-in command implementation.

use anyhow::Result;
use colored::Colorize;
use passkey_core::SignInOptions;
use tracing::info;

use super::{AuthenticatorArgs, Settings};

/// Execute the sign-in command.
pub async fn execute(
    settings: &Settings,
    authenticator: &AuthenticatorArgs,
    autofill: bool,
) -> Result<()> {
    let client = settings.client(authenticator)?;

    info!(autofill, "Signing in with passkey");
    let outcome = client
        .sign_in_with_passkey(SignInOptions {
            auto_fill: autofill,
            fetch_options: settings.overrides.clone(),
        })
        .await;
    let data = settings.settle(outcome, "Sign-in")?;

    if settings.human() {
        println!("{} {}", "✓".green().bold(), "Signed in with passkey".green().bold());
        println!(
            "   {} {}",
            "User:".dimmed(),
            data.user.email.as_deref().unwrap_or(&data.user.id)
        );
        println!("   {} {}", "Session:".dimmed(), data.session.id);
        if let Some(expires_at) = data.session.expires_at {
            println!(
                "   {} {}",
                "Expires:".dimmed(),
                expires_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }
    Ok(())
}
