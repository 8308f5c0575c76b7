//! Parley sync server binary.
//!
//! Runs the HTTP sync endpoints over an in-memory store. The identity
//! verifier is the insecure development one; production deployments
//! embed the library and supply a real Google token verifier.

use clap::Parser;
use parley_server::{router, InsecureVerifier, ServerConfig, SyncService};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Parley sync server.
#[derive(Parser)]
#[command(name = "parley-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8787")]
    bind: String,

    /// HMAC secret for bearer tokens
    #[arg(long, env = "PARLEY_SECRET")]
    secret: String,

    /// Token lifetime in hours
    #[arg(long, default_value_t = 24)]
    token_expiry_hours: u64,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ServerConfig::new(cli.secret.into_bytes())
        .with_bind_addr(cli.bind)
        .with_token_expiry(Duration::from_secs(cli.token_expiry_hours * 60 * 60));

    tracing::warn!("running with the insecure development identity verifier");

    let service = Arc::new(SyncService::new(config.clone(), Arc::new(InsecureVerifier)));
    let app = router(service);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "sync server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}
