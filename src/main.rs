//! PumpSleuth Server
//!
//! Wallet login plus the bounty and trap card API

use std::sync::Arc;

use anyhow::Context;
use pump_sleuth::auth::generate_secret;
use pump_sleuth::server::{run_server, AppState};
use pump_sleuth::{BountyEngine, Config, IdentityGateway, PgStore, SqliteStore, Store, TokenIssuer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting PumpSleuth Server");

    let config = Config::load().context("Failed to load configuration")?;

    let store: Arc<dyn Store> = match config.database_url() {
        Some(url) => {
            let storage = PgStore::new(&url).await?;
            info!("PostgreSQL storage initialized");
            Arc::new(storage)
        }
        None => {
            let path = config.sqlite_path();
            Arc::new(SqliteStore::new(&path)?)
        }
    };

    let secret = match config.jwt_secret() {
        Some(secret) => secret,
        None => {
            warn!("JWT_SECRET not set; using an ephemeral secret, sessions end on restart");
            generate_secret()
        }
    };
    let tokens = TokenIssuer::new(
        &secret,
        chrono::Duration::days(config.auth.token_ttl_days),
    );

    let state = Arc::new(AppState {
        identity: IdentityGateway::new(store.clone(), tokens, config.auth.app_name.clone()),
        engine: BountyEngine::new(store.clone(), config.bounties.clone()),
        store,
        started_at: std::time::Instant::now(),
        max_body_bytes: config.server.max_body_bytes,
    });

    run_server(&config.host(), config.port(), state).await?;

    Ok(())
}
