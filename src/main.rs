//! Cinevault - Telegram-fed movie catalog service
//!
//! Files posted to a private broadcast channel arrive as webhook updates,
//! get identified against TMDB, and land as catalog records in Postgres.
//! The same service proxies the underlying file bytes back out through
//! /stream and /download.

mod api;
mod config;
mod db;
mod services;
mod telegram;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::services::ingest::IngestPipeline;
use crate::services::metadata::TmdbResolver;
use crate::services::notify::TelegramNotifier;
use crate::services::tmdb::TmdbClient;
use crate::services::worker::IngestQueue;
use crate::telegram::TelegramClient;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub telegram: Arc<TelegramClient>,
    pub ingest: IngestQueue,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cinevault=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Cinevault");

    // Missing required variables are logged inside from_env; the service
    // still comes up so /healthz and /set-webhook stay reachable.
    let config = Arc::new(Config::from_env());
    tracing::info!("Configuration loaded");

    // Lazy pool: the first query connects, so a down database shows up in
    // /readyz instead of killing startup.
    let db = Database::connect(&config.database_url);
    if let Err(e) = db.ensure_schema().await {
        tracing::warn!(error = %e, "Schema setup failed - catalog writes will fail until the database is reachable");
    } else {
        tracing::info!("Database schema ready");
    }

    let telegram = Arc::new(TelegramClient::new(config.telegram_bot_token.clone()));

    let pipeline = Arc::new(IngestPipeline::new(
        Arc::new(db.movies()),
        Arc::new(TmdbResolver::new(TmdbClient::new(config.tmdb_api_key.clone()))),
        Arc::new(TelegramNotifier::new(telegram.clone())),
        config.allowed_channel_id,
        config.public_base_url.clone(),
    ));

    let ingest = IngestQueue::spawn(pipeline, config.ingest_workers, 256);
    tracing::info!(workers = config.ingest_workers, "Ingest worker pool started");

    let state = AppState {
        config: config.clone(),
        db,
        telegram,
        ingest,
    };

    let app = Router::new()
        .merge(api::health::router())
        .merge(api::webhook::router())
        .merge(api::stream::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
