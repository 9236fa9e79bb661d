// --- File: backend/src/main.rs ---

use backend::{
    config::AppConfig,
    db,
    web_server::{run_server, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // --- Setup ---
    // 1. Structured logging; RUST_LOG overrides the default level.
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 2. Config.toml, .env and the environment.
    let app_config = AppConfig::from_env()?;

    // 3. Database pool and schema.
    let db_pool = db::connect(&app_config.database).await?;
    tracing::info!("Running database migrations...");
    db::run_migrations(&db_pool).await?;
    tracing::info!("Migrations complete.");

    // --- Run Server ---
    run_server(AppState {
        db_pool,
        app_config,
    })
    .await
}
