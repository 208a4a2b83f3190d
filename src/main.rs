//! SchemaGate server binary.
//!
//! Starts the web server that serves the operator UI and REST API.
//!
//! # Usage
//!
//! ```bash
//! # Start with the default config file and ./storage as root
//! schemagate
//!
//! # Explicit config, storage root and port
//! schemagate --config ./schemagate.toml --root /srv/buckets --port 8080
//!
//! # Print the digest to put in [auth] password_sha256
//! schemagate hash-password 's3cret'
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schemagate::config::Config;
use schemagate::services::auth::hash_password;
use schemagate::web;

/// SchemaGate - template-validated CSV/XLSX intake
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8501")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Configuration file.
    /// Defaults to the platform-specific config directory:
    /// - Linux: ~/.config/SchemaGate/config.toml
    /// - macOS: ~/Library/Application Support/SchemaGate/config.toml
    /// - Windows: %APPDATA%\SchemaGate\config.toml
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Storage root (overrides `[storage] root`)
    #[arg(short, long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the SHA-256 digest of a password for the config file
    HashPassword {
        /// Password to hash
        password: String,
    },
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().context("Failed to load configuration")?,
    };

    if let Some(root) = &args.root {
        config.storage.root.clone_from(root);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(Command::HashPassword { password }) = &args.command {
        println!("{}", hash_password(password));
        return Ok(());
    }

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(&args)?;

    match &args.config {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("Config directory: {}", Config::config_dir()?.display()),
    }

    // Build socket address
    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;

    web::run_server(config, addr).await
}
