//! Maison CLI - talk to a running storefront gateway.
//!
//! # Usage
//!
//! ```bash
//! # Fetch (and print) a CSRF token
//! maison csrf-token
//!
//! # Check who the configured token belongs to (admins only)
//! MAISON_TOKEN=eyJ... maison whoami
//!
//! # Send an arbitrary API call; state-changing methods carry the CSRF header
//! maison request POST /api/newsletter --data '{"email":"a@b.c"}'
//!
//! # Readiness of the gateway and its backend
//! maison health
//! ```
//!
//! # Environment Variables
//!
//! - `MAISON_GATEWAY_URL` - Gateway origin (default `http://localhost:3000`)
//! - `MAISON_TOKEN` - Backend session token sent as a bearer token

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use maison_cli::{ClientOptions, GatewayClient};
use reqwest::Method;
use secrecy::SecretString;
use url::Url;

#[derive(Parser)]
#[command(name = "maison")]
#[command(author, version, about = "Maison gateway CLI")]
struct Cli {
    /// Gateway origin
    #[arg(long, env = "MAISON_GATEWAY_URL", default_value = "http://localhost:3000")]
    gateway: Url,

    /// Backend session token, sent as `Authorization: Bearer`
    #[arg(long, env = "MAISON_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a CSRF token from the gateway
    CsrfToken,
    /// Show the admin identity of the configured token
    Whoami,
    /// Send a request through the gateway
    Request {
        /// HTTP method (GET, POST, PUT, PATCH, DELETE)
        #[arg(value_parser = parse_method)]
        method: Method,

        /// Path on the gateway, e.g. `/api/products`
        path: String,

        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Check gateway readiness
    Health,
}

/// Parse a method name case-insensitively.
fn parse_method(value: &str) -> Result<Method, String> {
    Method::from_bytes(value.to_ascii_uppercase().as_bytes()).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maison_cli=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let options = ClientOptions {
        bearer_token: cli.token.map(SecretString::from),
        ..ClientOptions::default()
    };
    let client = GatewayClient::with_options(cli.gateway, options)?;

    match cli.command {
        Commands::CsrfToken => {
            println!("{}", client.csrf_token().await?);
        }
        Commands::Whoami => {
            let identity = client.whoami().await?;
            println!("{}", serde_json::to_string_pretty(&identity)?);
        }
        Commands::Request { method, path, data } => {
            let body = data
                .as_deref()
                .map(serde_json::from_str::<serde_json::Value>)
                .transpose()?;
            let response = client.request(method, &path, body).await?;
            println!("{}", response.status);
            println!("{}", serde_json::to_string_pretty(&response.body)?);
            if !response.status.is_success() {
                return Err(format!("request failed with {}", response.status).into());
            }
        }
        Commands::Health => {
            if client.health().await? {
                println!("ok");
            } else {
                return Err("gateway not ready".into());
            }
        }
    }
    Ok(())
}
