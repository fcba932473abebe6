//! Agent Wallboard API server entrypoint

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wallboard_shared::{
    create_pool, run_migrations, AgentStore, MemoryAgentStore, PgAgentStore, StatusWorkflow,
};

use wallboard_api::{config::Config, routes::create_router, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("wallboard_api=info,wallboard_shared=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let workflow = match &config.workflow_path {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read workflow file {path}"))?;
            let workflow = StatusWorkflow::from_json(&raw)
                .with_context(|| format!("invalid workflow file {path}"))?;
            tracing::info!(path = %path, "Loaded status workflow");
            workflow
        }
        None => StatusWorkflow::default(),
    };

    let store: Arc<dyn AgentStore> = match &config.database_url {
        Some(database_url) => {
            let pool = create_pool(database_url)
                .await
                .context("failed to connect to database")?;
            run_migrations(&pool)
                .await
                .context("failed to run migrations")?;
            tracing::info!("Using Postgres agent store");
            Arc::new(PgAgentStore::new(pool))
        }
        None => {
            tracing::info!("DATABASE_URL not set, using in-memory agent store");
            Arc::new(MemoryAgentStore::new())
        }
    };

    let state = AppState::new(config, store, workflow);
    let app = create_router(state.clone());

    let listener = tokio::net::TcpListener::bind(&state.config.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", state.config.bind_address))?;
    tracing::info!(address = %state.config.bind_address, "Agent Wallboard API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => tracing::error!(%error, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
