use anyhow::Result;
use axum::{http::StatusCode, response::Json, routing::get, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};

use prwarden::config::Config;
use prwarden::github::GitHubClient;
use prwarden::webhook::webhook_router;
use prwarden::AppState;

async fn health_check() -> Result<Json<serde_json::Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "prwarden"
    })))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting pull request contribution bot");

    let config =
        Config::from_env().expect("Failed to load configuration from environment variables");

    if config.dry_run {
        warn!("** prwarden running in dry-run mode! **");
    }

    let github = GitHubClient::new(config.github_app_id, config.github_private_key.clone());

    let app_state = Arc::new(AppState {
        config,
        github: Arc::new(github),
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(webhook_router(app_state.clone()))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(app_state.clone());

    let listener = TcpListener::bind(format!("0.0.0.0:{}", app_state.config.port)).await?;
    info!("Server listening on port {}", app_state.config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
