use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::{
    app_state::AppState,
    outbox::{self, EventConsumer},
    workers,
};

pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

pub fn init_env() {
    dotenvy::dotenv().ok();
}

/// Starts the outbox dispatcher, the background workers and the HTTP server.
/// Runs until the process stops.
pub async fn bootstrap(
    service_name: &str,
    app: Router<AppState>,
    state: AppState,
    consumers: &[(&str, EventConsumer)],
) -> Result<()> {
    let shared = Arc::new(state.clone());

    let consumers: Vec<(String, EventConsumer)> = consumers
        .iter()
        .map(|(topic, consumer)| (topic.to_string(), *consumer))
        .collect();
    tokio::spawn(outbox::run_dispatcher(shared.clone(), consumers));

    workers::spawn_all(shared.clone());

    let app = app
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state);

    let port = shared.config.server.port;
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;
    tracing::info!("{service_name} listening on port {port}");
    axum::serve(listener, app)
        .await
        .context("HTTP server stopped unexpectedly")?;
    Ok(())
}
