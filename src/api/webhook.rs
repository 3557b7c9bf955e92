//! Telegram webhook endpoints
//!
//! The inbound path embeds the bot token: knowing the path is the
//! authentication. The handler acknowledges every delivery on the correct
//! path immediately - even when dispatch fails internally - so Telegram
//! never builds up a redelivery storm against us.

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use tracing::{debug, error, info};

use crate::AppState;
use crate::telegram::Update;

/// Receive one update envelope and dispatch at most one upload event
async fn webhook(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: String,
) -> (StatusCode, &'static str) {
    if token != state.config.telegram_bot_token {
        return (StatusCode::NOT_FOUND, "not found");
    }

    // Anything that doesn't decode to an update with an upload is ignored,
    // not an error: Telegram sends many shapes we don't care about.
    match serde_json::from_str::<Update>(&body) {
        Ok(update) => {
            if let Some(event) = update.upload_event() {
                debug!(filename = %event.file_name, "Dispatching upload event");
                state.ingest.dispatch(event);
            }
        }
        Err(e) => {
            error!(error = %e, "Ignoring undecodable webhook payload");
        }
    }

    (StatusCode::OK, "ok")
}

/// Ask Telegram to deliver updates to this service's webhook path
async fn set_webhook(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let url = format!(
        "{}/webhook/{}",
        state.config.public_base_url, state.config.telegram_bot_token
    );

    match state.telegram.set_webhook(&url).await {
        Ok(true) => {
            info!("Webhook registered");
            (StatusCode::OK, "Webhook set successfully!")
        }
        Ok(false) => (StatusCode::BAD_GATEWAY, "Webhook setup failed!"),
        Err(e) => {
            error!(error = %e, "Webhook registration failed");
            (StatusCode::BAD_GATEWAY, "Webhook setup failed!")
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/webhook/{token}", post(webhook))
        .route("/set-webhook", get(set_webhook))
}
