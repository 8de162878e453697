// src/main.rs

use std::{error::Error, sync::Arc, time::Duration};

use quizboard::{
    config::Config,
    routes,
    state::AppState,
    store::{MemoryStore, SqliteStore, TreeStore},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load configuration from environment (and .env, if present)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "quizboard.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let store: Arc<dyn TreeStore> = match &config.database_url {
        Some(url) => Arc::new(connect_with_retry(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set; the shared store lives in memory and is lost on exit");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(&config, store)?;
    let Config { listen_addr, .. } = config;

    // Publish the leaderboard once so subscribers start from current totals.
    if let Err(e) = state.leaderboard.recompute().await {
        tracing::error!("Initial leaderboard recompute failed: {}", e);
    }

    let app = routes::create_router(state);

    tracing::info!("Listening on {}", listen_addr);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, app).await?;
    Ok(())
}

async fn connect_with_retry(url: &str) -> Result<SqliteStore, Box<dyn Error>> {
    let mut retry_count = 0;
    loop {
        match SqliteStore::connect(url).await {
            Ok(store) => {
                tracing::info!("Shared store connected");
                return Ok(store);
            }
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    return Err(format!("Failed to open the shared store after 5 retries: {}", e).into());
                }
                tracing::warn!("Shared store not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}
