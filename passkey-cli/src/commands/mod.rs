//! CLI command implementations.

pub mod add;
pub mod b64url;
pub mod list;
pub mod options;
pub mod sign_in;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use passkey_core::{
    ActionOutcome, CeremonyPlatform, CeremonyProvider, ClientConfig, HttpAuthService,
    PasskeyClient, RequestOverrides, UnsupportedCeremony,
};
use serde::Serialize;

use crate::ceremony::ExternalCeremony;

/// Authenticator program selection shared by the ceremony commands.
#[derive(Args, Debug, Default)]
pub struct AuthenticatorArgs {
    /// Authenticator program that performs the ceremony
    #[arg(long, env = "PASSKEY_AUTHENTICATOR", value_name = "PROGRAM")]
    pub authenticator: Option<PathBuf>,

    /// Argument passed to the authenticator program (repeatable)
    #[arg(long = "authenticator-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub authenticator_args: Vec<String>,
}

impl AuthenticatorArgs {
    pub fn ceremony(&self) -> Arc<dyn CeremonyProvider> {
        match &self.authenticator {
            Some(program) => Arc::new(
                ExternalCeremony::new(program).with_args(self.authenticator_args.iter().cloned()),
            ),
            None => Arc::new(UnsupportedCeremony::with_message(
                CeremonyPlatform::Native,
                "No authenticator configured (use --authenticator or PASSKEY_AUTHENTICATOR)",
            )),
        }
    }
}

/// Resolved global options.
pub struct Settings {
    pub config: ClientConfig,
    pub overrides: RequestOverrides,
    pub json: bool,
    pub quiet: bool,
}

impl Settings {
    pub fn service(&self) -> Result<HttpAuthService> {
        HttpAuthService::new(self.config.clone()).context("Invalid auth service configuration")
    }

    pub fn client(&self, authenticator: &AuthenticatorArgs) -> Result<PasskeyClient> {
        PasskeyClient::from_config(self.config.clone(), authenticator.ceremony())
            .context("Invalid auth service configuration")
    }

    /// Whether to print human-readable output.
    pub fn human(&self) -> bool {
        !self.json && !self.quiet
    }

    /// Print the outcome in JSON mode, then split it into payload or error.
    pub fn settle<T: Serialize>(&self, outcome: ActionOutcome<T>, action: &str) -> Result<T> {
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("Failed to serialize outcome")?
            );
        }
        outcome
            .into_result()
            .map_err(|error| anyhow::Error::new(error).context(format!("{action} failed")))
    }
}
