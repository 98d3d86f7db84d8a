//! Options command implementation.

use anyhow::Result;
use colored::Colorize;
use passkey_core::{
    paths, AuthRequest, AuthService, AuthenticatorAttachment, CreationOptions, RequestOptions,
    INVALID_OPTIONS,
};
use tracing::debug;

use super::Settings;

/// Fetch and summarize authentication options.
pub async fn authenticate(settings: &Settings) -> Result<()> {
    let service = settings.service()?;
    let request =
        AuthRequest::get(paths::GENERATE_AUTHENTICATE_OPTIONS).with_overrides(&settings.overrides);

    let raw = service.call(request).await;
    let options: RequestOptions =
        settings.settle(raw.decode(INVALID_OPTIONS), "Fetching authentication options")?;
    debug!(challenge_bytes = options.challenge.as_bytes().len(), "Decoded options");

    if settings.human() {
        println!("{}", "Authentication options".bold());
        println!(
            "   {} {}",
            "RP ID:".dimmed(),
            options.rp_id.as_deref().unwrap_or("(origin)")
        );
        println!(
            "   {} {} bytes",
            "Challenge:".dimmed(),
            options.challenge.as_bytes().len()
        );
        print_timeout(options.timeout);
        println!(
            "   {} {}",
            "Allowed credentials:".dimmed(),
            options
                .allow_credentials
                .as_ref()
                .map_or_else(|| "any (discoverable)".to_string(), |c| c.len().to_string())
        );
        if let Some(user_verification) = &options.user_verification {
            println!("   {} {user_verification}", "User verification:".dimmed());
        }
    }
    Ok(())
}

/// Fetch and summarize registration options.
pub async fn register(
    settings: &Settings,
    name: Option<String>,
    attachment: Option<AuthenticatorAttachment>,
) -> Result<()> {
    let service = settings.service()?;
    let request = AuthRequest::get(paths::GENERATE_REGISTER_OPTIONS)
        .with_query_opt("authenticatorAttachment", attachment.map(|a| a.as_str()))
        .with_query_opt("name", name.filter(|n| !n.is_empty()))
        .with_overrides(&settings.overrides);

    let raw = service.call(request).await;
    let options: CreationOptions =
        settings.settle(raw.decode(INVALID_OPTIONS), "Fetching registration options")?;

    if settings.human() {
        println!("{}", "Registration options".bold());
        println!(
            "   {} {} ({})",
            "RP:".dimmed(),
            options.rp.name,
            options.rp.id.as_deref().unwrap_or("origin")
        );
        println!(
            "   {} {} <{}>",
            "User:".dimmed(),
            options.user.display_name,
            options.user.name
        );
        println!(
            "   {} {} bytes",
            "Challenge:".dimmed(),
            options.challenge.as_bytes().len()
        );
        let algorithms: Vec<String> = options
            .pub_key_cred_params
            .iter()
            .map(|p| p.alg.to_string())
            .collect();
        println!("   {} {}", "Algorithms:".dimmed(), algorithms.join(", "));
        print_timeout(options.timeout);
        if let Some(excluded) = &options.exclude_credentials {
            println!("   {} {}", "Excluded credentials:".dimmed(), excluded.len());
        }
    }
    Ok(())
}

fn print_timeout(timeout_ms: Option<u64>) {
    if let Some(timeout_ms) = timeout_ms {
        println!("   {} {}s", "Timeout:".dimmed(), timeout_ms / 1000);
    }
}
