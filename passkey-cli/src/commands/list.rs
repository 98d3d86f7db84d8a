//! List command implementation.

use anyhow::Result;
use colored::Colorize;

use super::{AuthenticatorArgs, Settings};

/// Execute the list command.
pub async fn execute(settings: &Settings) -> Result<()> {
    let client = settings.client(&AuthenticatorArgs::default())?;
    let passkeys = settings.settle(client.passkey_list().fetch().await, "Listing passkeys")?;

    if !settings.human() {
        return Ok(());
    }

    if passkeys.is_empty() {
        println!("{}", "No passkeys registered".dimmed());
        return Ok(());
    }

    println!("{}", format!("{} passkey(s)", passkeys.len()).bold());
    for passkey in &passkeys {
        println!();
        println!(
            "   {} {}",
            "Name:".dimmed(),
            passkey.name.as_deref().unwrap_or("(unnamed)")
        );
        println!("   {} {}", "ID:".dimmed(), passkey.id);
        println!("   {} {}", "Credential:".dimmed(), passkey.credential_id);
        if let Some(device_type) = &passkey.device_type {
            let backed_up = match passkey.backed_up {
                Some(true) => " (backed up)",
                _ => "",
            };
            println!("   {} {device_type}{backed_up}", "Device:".dimmed());
        }
        if let Some(created_at) = passkey.created_at {
            println!(
                "   {} {}",
                "Created:".dimmed(),
                created_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }
    Ok(())
}
