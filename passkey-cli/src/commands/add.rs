//! Add command implementation.

use anyhow::Result;
use colored::Colorize;
use passkey_core::{AddPasskeyOptions, AuthenticatorAttachment};
use tracing::info;

use super::{AuthenticatorArgs, Settings};

/// Execute the add command.
pub async fn execute(
    settings: &Settings,
    authenticator: &AuthenticatorArgs,
    name: Option<String>,
    attachment: Option<AuthenticatorAttachment>,
    auto_register: bool,
) -> Result<()> {
    let client = settings.client(authenticator)?;

    info!(name = ?name, attachment = ?attachment, auto_register, "Registering passkey");
    let outcome = client
        .add_passkey(AddPasskeyOptions {
            name,
            authenticator_attachment: attachment,
            use_auto_register: auto_register,
            fetch_options: settings.overrides.clone(),
        })
        .await;
    let registered = settings.settle(outcome, "Registration")?;

    if settings.human() {
        let passkey = registered.passkey;
        println!("{} {}", "✓".green().bold(), "Passkey registered".green().bold());
        println!(
            "   {} {}",
            "Name:".dimmed(),
            passkey.name.as_deref().unwrap_or("(unnamed)")
        );
        println!("   {} {}", "ID:".dimmed(), passkey.id);
        println!("   {} {}", "Credential:".dimmed(), passkey.credential_id);
    }
    Ok(())
}
