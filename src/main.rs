//! CipherHunt room coordination server.

use anyhow::Context;
use cipherhunt_rooms::config::Config;
use cipherhunt_rooms::handlers;
use cipherhunt_rooms::server;
use cipherhunt_rooms::state::AppState;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = Arc::new(AppState::new(config.clone()));

    // Presence sweep
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_state.config.presence.sweep_interval);
        loop {
            interval.tick().await;
            handlers::sweep(&sweep_state);
        }
    });

    let app = server::app(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("CipherHunt room server started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws", addr);

    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}
