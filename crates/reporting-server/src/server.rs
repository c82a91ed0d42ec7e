use crate::handlers;
use crate::session::SessionRegistry;
use anyhow::Context;
use axum::Router;
use axum::routing::{get, post};
use reporting_core::ServerConfig;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Shared application state: the session registry and the client used to
/// fetch report sources.
pub struct AppState {
    pub registry: SessionRegistry,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            registry: SessionRegistry::new(),
            http: reqwest::Client::new(),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/admin/health", get(handlers::health))
        .route("/ldp/config", get(handlers::list_config))
        .route(
            "/ldp/config/{key}",
            get(handlers::get_config_key).put(handlers::put_config_key),
        )
        .route("/ldp/db/tables", get(handlers::get_tables))
        .route("/ldp/db/columns", get(handlers::get_columns))
        .route("/ldp/db/query", post(handlers::post_query))
        .route("/ldp/db/reports", post(handlers::post_report))
        .nest_service("/htdocs", ServeDir::new("htdocs"))
        .route_service("/favicon.ico", ServeFile::new("htdocs/favicon.ico"))
        .fallback(handlers::not_found)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind the configured listener and serve until shutdown.
pub async fn launch(cfg: &ServerConfig, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);
    let hostspec = cfg.listen.hostspec();
    let listener = tokio::net::TcpListener::bind(&hostspec)
        .await
        .with_context(|| format!("could not listen on {hostspec}"))?;

    tracing::info!(target: "listen", "listening on {hostspec}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server failed")?;
    tracing::info!(target: "listen", "finished listening on {hostspec}");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::error!(target: "error", "could not install ctrl-c handler");
    }
}
