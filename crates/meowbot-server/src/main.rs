mod config;
mod routes;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use meowbot_core::{plugins, Dispatcher};
use meowbot_storage::Storage;

use config::Config;
use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,meowbot_server=debug".into()),
        )
        .with_target(false)
        .init();

    let config_path =
        std::env::var("MEOWBOT_CONFIG").unwrap_or_else(|_| "meowbot.yaml".to_string());
    let config = Config::load(Path::new(&config_path))?;
    let storage = Storage::new(&config.database_path)?;

    let registry = Arc::new(plugins::builtin(&config.bot_config()));
    info!(triggers = registry.len(), "trigger registry built");
    let dispatcher = Dispatcher::new(registry.clone());

    let listen_addr = config.listen_addr.clone();
    let state = Arc::new(AppState {
        config,
        storage,
        registry,
        dispatcher,
    });

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/meow", post(routes::meow))
        .route("/interactive", post(routes::interactive))
        .route("/authorize", get(routes::authorize))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!(addr = %listen_addr, "meowbot listening");
    axum::serve(listener, app).await?;
    Ok(())
}
