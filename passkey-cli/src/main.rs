//! Passkey CLI - sign in and register passkeys against a better-auth server.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use colored::Colorize;
use passkey_core::{
    AuthenticatorAttachment, ClientConfig, NormalizerMode, RequestOverrides, DEFAULT_BASE_URL,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod ceremony;
mod commands;
mod exit_codes;

use commands::{AuthenticatorArgs, Settings};
use exit_codes::ExitCode;

const EXIT_CODES_HELP: &str = "\
Exit codes:
  0   Success
  1   General error
  64  Usage error (invalid arguments or configuration)
  65  Data error (undecodable payload or base64url)
  66  Input file not readable
  69  Auth service unavailable
  74  Output file not writable
  75  Ceremony cancelled or unsupported
  77  Rejected by the auth service";

#[derive(Parser)]
#[command(name = "passkey")]
#[command(author, version, about = "Passkey sign-in and registration for better-auth servers", long_about = None)]
#[command(after_help = EXIT_CODES_HELP)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Auth service base URL
    #[arg(long, global = true, env = "PASSKEY_AUTH_URL", value_name = "URL")]
    url: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, global = true, env = "PASSKEY_AUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Extra header for verification requests (repeatable)
    #[arg(short = 'H', long = "header", global = true, value_name = "NAME:VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// Retries for transient failures on GET requests
    #[arg(long, global = true, value_name = "N")]
    retries: Option<u32>,

    /// Per-request timeout
    #[arg(long, global = true, value_name = "SECS")]
    timeout: Option<u64>,

    /// Error message policy (native or web)
    #[arg(long, global = true, value_name = "MODE")]
    mode: Option<NormalizerMode>,

    /// Allow plain HTTP to non-loopback hosts
    #[arg(long, global = true)]
    insecure: bool,

    /// Print the raw {data, error} outcome as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Suppress human-readable output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch ceremony options without running a ceremony
    Options {
        #[command(subcommand)]
        kind: OptionsKind,
    },

    /// Sign in with an existing passkey
    SignIn {
        #[command(flatten)]
        authenticator: AuthenticatorArgs,

        /// Request the autofill (conditional) ceremony
        #[arg(long)]
        autofill: bool,
    },

    /// Register a new passkey for the signed-in user
    Add {
        #[command(flatten)]
        authenticator: AuthenticatorArgs,

        /// Display name for the passkey
        #[arg(long)]
        name: Option<String>,

        /// Authenticator attachment (platform or cross-platform)
        #[arg(long, value_name = "ATTACHMENT")]
        attachment: Option<AuthenticatorAttachment>,

        /// Register without an explicit prompt where supported
        #[arg(long)]
        auto_register: bool,
    },

    /// List the signed-in user's passkeys
    List,

    /// Encode or decode URL-safe base64 without padding
    B64url {
        #[command(subcommand)]
        action: B64urlAction,
    },
}

#[derive(Subcommand)]
enum OptionsKind {
    /// Options for signing in
    Authenticate,

    /// Options for registering a passkey
    Register {
        /// Display name for the passkey
        #[arg(long)]
        name: Option<String>,

        /// Authenticator attachment (platform or cross-platform)
        #[arg(long, value_name = "ATTACHMENT")]
        attachment: Option<AuthenticatorAttachment>,
    },
}

#[derive(Subcommand)]
enum B64urlAction {
    /// Encode text or a file
    Encode {
        /// Text to encode
        #[arg(value_name = "TEXT", required_unless_present = "file")]
        text: Option<String>,

        /// Encode the contents of a file instead
        #[arg(long, value_name = "FILE", conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Decode a base64url value
    Decode {
        #[arg(value_name = "VALUE")]
        value: String,

        /// Write the decoded bytes to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn parse_header(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid header '{raw}' (expected NAME:VALUE)"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid header '{raw}' (empty name)"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default = match verbose {
        0 if quiet => "off",
        0 => "warn",
        1 => "passkey_core=debug,passkey=debug,info",
        _ => "passkey_core=trace,passkey=trace,debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn build_settings(global: &GlobalArgs) -> Result<Settings> {
    let base_url = global.url.as_deref().unwrap_or(DEFAULT_BASE_URL);
    let mut config = ClientConfig::new(base_url)
        .with_env_overrides()
        .context("Invalid environment configuration")?;

    if let Some(token) = &global.token {
        config.bearer_token = Some(token.clone());
    }
    if let Some(retries) = global.retries {
        config.max_retries = retries;
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(mode) = global.mode {
        config.normalizer_mode = Some(mode);
    }
    if global.insecure {
        config.require_https = false;
    }

    let overrides = global
        .headers
        .iter()
        .fold(RequestOverrides::new(), |overrides, (name, value)| {
            overrides.header(name, value)
        });

    Ok(Settings {
        config,
        overrides,
        json: global.json,
        quiet: global.quiet,
    })
}

async fn run(cli: Cli) -> Result<()> {
    let settings = build_settings(&cli.global)?;

    match cli.command {
        Commands::Options { kind } => match kind {
            OptionsKind::Authenticate => commands::options::authenticate(&settings).await,
            OptionsKind::Register { name, attachment } => {
                commands::options::register(&settings, name, attachment).await
            }
        },
        Commands::SignIn {
            authenticator,
            autofill,
        } => commands::sign_in::execute(&settings, &authenticator, autofill).await,
        Commands::Add {
            authenticator,
            name,
            attachment,
            auto_register,
        } => {
            commands::add::execute(&settings, &authenticator, name, attachment, auto_register)
                .await
        }
        Commands::List => commands::list::execute(&settings).await,
        Commands::B64url { action } => match action {
            B64urlAction::Encode { text, file } => commands::b64url::encode(text, file),
            B64urlAction::Decode { value, output } => commands::b64url::decode(&value, output),
        },
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let quiet = cli.global.quiet;
    init_tracing(cli.global.verbose, quiet);

    let exit = match run(cli).await {
        Ok(()) => ExitCode::success(),
        Err(err) => ExitCode::from_anyhow(&err),
    };

    if let Some(message) = &exit.message {
        if !quiet {
            eprintln!("{} {message}", "error:".red().bold());
        }
    }
    std::process::exit(exit.code);
}
