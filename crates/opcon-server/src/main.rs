//! Operator console server - telemetry ingest, fleet tracking, and
//! survey mission planning.

use anyhow::Result;
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use opcon_server::config::Config;
use opcon_server::state::AppState;
use opcon_server::{api, loops, persistence};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("opcon_server=debug".parse()?),
        )
        .init();

    tracing::info!("Starting operator console server...");

    let config = Config::from_env();
    let port = config.server_port;

    let db = persistence::init_database(&config.database_path, config.database_max_connections)
        .await?;
    let state = Arc::new(AppState::with_database(db, config.clone()));
    state.load_from_database().await?;

    tokio::spawn(loops::reconcile_loop::run_reconcile_loop(
        state.clone(),
        config.clone(),
    ));

    let app = api::routes(&config)
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(CorsLayer::permissive());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
