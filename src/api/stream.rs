//! File serving endpoints
//!
//! Both routes resolve an opaque file identifier through Telegram's getFile
//! and relay the upstream bytes as they arrive - no buffering, upstream
//! content-type preserved. /stream serves inline playback; /download adds
//! an attachment disposition. Any resolution or fetch failure maps to 404.

use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use tracing::{debug, warn};

use crate::AppState;
use crate::telegram::TelegramClient;

/// Not-found-class wrapper for anything that goes wrong upstream
#[derive(Debug)]
struct StreamError(anyhow::Error);

impl<E: Into<anyhow::Error>> From<E> for StreamError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for StreamError {
    fn into_response(self) -> Response {
        warn!(error = %self.0, "Streaming request failed");
        (StatusCode::NOT_FOUND, format!("Streaming error: {:#}", self.0)).into_response()
    }
}

#[derive(Clone, Copy)]
enum Disposition {
    Inline,
    Attachment,
}

/// Resolve the file, open the upstream fetch, and build the relay response
async fn relay(
    telegram: &TelegramClient,
    file_id: &str,
    disposition: Disposition,
) -> Result<Response, StreamError> {
    let file = telegram.get_file(file_id).await?;
    let file_path = file
        .file_path
        .ok_or_else(|| anyhow::anyhow!("file has no downloadable path"))?;

    let upstream = telegram.fetch_file(&file_path).await?;

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    debug!(file_id = file_id, content_type = %content_type, "Relaying file bytes");

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);

    if let Disposition::Attachment = disposition {
        // The transient path ends in a stable-enough name for the save-as
        // dialog; fall back to the opaque identifier.
        let name = file_path.rsplit('/').next().unwrap_or(file_id);
        builder = builder.header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{name}\""),
        );
    }

    let response = builder.body(Body::from_stream(upstream.bytes_stream()))?;
    Ok(response)
}

/// Inline playback
async fn stream_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, StreamError> {
    relay(&state.telegram, &file_id, Disposition::Inline).await
}

/// Forced download
async fn download_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, StreamError> {
    relay(&state.telegram, &file_id, Disposition::Attachment).await
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/stream/{file_id}", get(stream_file))
        .route("/download/{file_id}", get(download_file))
}
