// Finance Ledger - Web Server

use anyhow::{Context, Result};
use finance_ledger::api::{router, AppState};
use finance_ledger::{open_database, Config, TokenKeys};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let conn = open_database(&config.database_path)?;
    tracing::info!(path = %config.database_path.display(), "database opened");

    let state = AppState::new(
        conn,
        TokenKeys::new(&config.token_secret, config.token_ttl_hours),
    );
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.server_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server_address))?;

    tracing::info!(address = %config.server_address, version = finance_ledger::VERSION, "server listening");

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
