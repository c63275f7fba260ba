use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;

use hub_server::config::AppConfig;
use hub_server::state::AppState;
use hub_server::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level())
        .init();

    let db = database::init_db(&config.database)
        .await
        .context("connecting to database")?;
    seed::ensure_indexes(&db).await?;
    seed::bootstrap_admin(&db, &config.bootstrap).await?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState { db, config };
    let app = build_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received Ctrl+C, shutting down");
}
