//! Browser UI: a single page with an upload button, an image preview and a text box.
//!
//! The first file of each upload is written to the upload directory so the analyzer can
//! work from a path, and is served back under `/uploads` for the preview. Failed uploads
//! are deleted and only the most recent [`MAX_STORED_UPLOADS`] are kept.

use crate::analyzer::DishAnalyzer;
use crate::error::{DishVisionError, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const INDEX_HTML: &str = include_str!("index.html");

/// Largest accepted multipart body.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Number of analyzed uploads kept on disk for previews.
pub const MAX_STORED_UPLOADS: usize = 50;

#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<DishAnalyzer>,
    upload_dir: PathBuf,
    max_stored_uploads: usize,
}

impl AppState {
    pub fn new(analyzer: Arc<DishAnalyzer>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            analyzer,
            upload_dir: upload_dir.into(),
            max_stored_uploads: MAX_STORED_UPLOADS,
        }
    }

    /// Keep at most `max` uploads (at least the latest one).
    pub fn with_max_stored_uploads(mut self, max: usize) -> Self {
        self.max_stored_uploads = max.max(1);
        self
    }
}

/// Result of one upload event, as shown by the page.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filepath: String,
    pub preview_url: String,
    pub response: String,
}

pub fn router(state: AppState) -> Router {
    let uploads = ServeDir::new(&state.upload_dir);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/upload", post(upload))
        .nest_service("/uploads", uploads)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(addr: std::net::SocketAddr, state: AppState) -> Result<()> {
    tokio::fs::create_dir_all(&state.upload_dir).await?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    info!("Uploads stored in {:?}", state.upload_dir);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> &'static str {
    "ok"
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let mut stored: Option<PathBuf> = None;
    let mut ignored = 0usize;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DishVisionError::Upload(e.to_string()))?
    {
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => {
                debug!("Skipping non-file form field {:?}", field.name());
                continue;
            }
        };

        if stored.is_some() {
            ignored += 1;
            continue;
        }

        let data = field.bytes().await.map_err(|e| DishVisionError::Upload(e.to_string()))?;
        if data.is_empty() {
            debug!("Skipping empty file part {:?}", file_name);
            continue;
        }

        let path = store_upload(&state.upload_dir, &file_name, &data).await?;
        debug!("Stored {} ({} bytes) as {:?}", file_name, data.len(), path);
        stored = Some(path);
    }

    if ignored > 0 {
        info!("Ignoring {} additional uploaded file(s)", ignored);
    }

    let files: Vec<PathBuf> = stored.into_iter().collect();
    let (filepath, response) = match state.analyzer.process_uploaded_files(&files).await {
        Ok(result) => result,
        Err(e) => {
            for path in &files {
                discard_upload(path).await;
            }
            return Err(e);
        }
    };

    prune_uploads(&state.upload_dir, state.max_stored_uploads, &filepath).await;

    let file_name = filepath
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Json(UploadResponse {
        preview_url: format!("/uploads/{}", file_name),
        filepath: file_name,
        response,
    }))
}

async fn store_upload(dir: &Path, original_name: &str, data: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;

    let path = dir.join(format!("{}.{}", Uuid::new_v4(), upload_extension(original_name)));
    tokio::fs::write(&path, data).await?;

    Ok(path)
}

async fn discard_upload(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Could not remove upload {:?}: {}", path, e);
    }
}

/// Delete the oldest stored uploads so that at most `keep` remain, never touching `current`.
async fn prune_uploads(dir: &Path, keep: usize, current: &Path) {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list upload directory {:?}: {}", dir, e);
            return;
        }
    };

    let mut others = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path == current {
            continue;
        }
        let Ok(metadata) = entry.metadata().await else {
            continue;
        };
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
        others.push((modified, path));
    }

    let allowed = keep.saturating_sub(1);
    if others.len() <= allowed {
        return;
    }

    others.sort();
    let excess = others.len() - allowed;
    debug!("Pruning {} old upload(s) from {:?}", excess, dir);
    for (_, path) in others.into_iter().take(excess) {
        discard_upload(&path).await;
    }
}

// Keep the client's extension when it is plain ASCII, otherwise fall back to jpg
fn upload_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8)
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "jpg".to_string())
}

fn status_for(err: &DishVisionError) -> StatusCode {
    match err {
        DishVisionError::ImageNotFound(_) => StatusCode::NOT_FOUND,
        DishVisionError::NoUpload | DishVisionError::Upload(_) => StatusCode::BAD_REQUEST,
        DishVisionError::ApiError { .. }
        | DishVisionError::Blocked(_)
        | DishVisionError::GatewayError(_)
        | DishVisionError::HttpError(_) => StatusCode::BAD_GATEWAY,
        DishVisionError::SerializationError(_)
        | DishVisionError::ConfigError(_)
        | DishVisionError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for DishVisionError {
    fn into_response(self) -> Response {
        let status = status_for(&self);

        if status.is_server_error() {
            error!("Upload failed: {}", self);
        } else {
            warn!("Upload rejected: {}", self);
        }

        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
