use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use jwks_auth::{AuthConfig, ReqwestJwksClient, TokenService};
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Validates a JWT against the authority configured through `AUTH_*` variables.
#[derive(Debug, Parser)]
#[command(name = "token-inspector")]
#[command(version)]
struct Cli {
    /// Token to validate; read from stdin when omitted
    token: Option<String>,

    /// Seconds between JWKS downloads
    #[arg(long, env = "AUTH_JWKS_REFRESH_SECONDS", default_value_t = 600)]
    refresh_seconds: u64,

    /// Timeout in seconds for the JWKS request
    #[arg(long, env = "AUTH_JWKS_TIMEOUT_SECONDS", default_value_t = 10)]
    timeout_seconds: u64,

    /// Print Prometheus metrics after validating
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AuthConfig::from_env().context("failed to load AUTH_* configuration")?;
    let token = match cli.token.clone() {
        Some(token) => token,
        None => read_stdin().await?,
    };
    let token = normalize_token(&token)?;

    let client = ReqwestJwksClient::with_timeout(Duration::from_secs(cli.timeout_seconds))?;
    let service = TokenService::builder(config)
        .with_refresh_interval(Duration::from_secs(cli.refresh_seconds))
        .build(client);
    info!(jwks = service.cache().url(), "validating token");

    let outcome = service.decode_token(token).await;

    if cli.metrics {
        eprintln!("{}", service.metrics().render());
    }

    match outcome {
        Ok(claims) => {
            println!("{}", serde_json::to_string_pretty(&claims)?);
            Ok(())
        }
        Err(err) => {
            error!(code = err.code(), "token rejected: {err}");
            Err(err).context("token validation failed")
        }
    }
}

async fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buffer)
        .await
        .context("failed to read token from stdin")?;
    Ok(buffer)
}

/// Accepts a bare token or an `Authorization` header value.
fn normalize_token(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    let token = match trimmed.strip_prefix("Bearer") {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => trimmed,
    };
    if token.is_empty() {
        bail!("no token supplied");
    }
    Ok(token)
}
