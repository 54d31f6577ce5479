// bases/web_api/src/server.rs
use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use download_service::{DownloadRecord, DownloadService, QualityOption, RecordId};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppError;

/// Application state shared across handlers
#[derive(Clone)]
struct AppState {
    service: Arc<DownloadService>,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    version: &'static str,
    active_downloads: usize,
}

/// Missing or null fields reach the service as empty strings and are rejected there
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FormatsRequest {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DownloadLinkRequest {
    url: Option<String>,
    format_id: Option<String>,
}

/// A missing or null `format_id` fetches the extractor's default pairing
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StartDownloadRequest {
    url: Option<String>,
    format_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FormatsResponse {
    title: String,
    formats: Vec<FormatEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FormatEntry {
    quality: String,
    format_id: String,
    ext: String,
    /// Always in megabytes, e.g. `"500.0 MB"`
    filesize: String,
    vcodec: String,
    acodec: String,
    fps: f64,
    tbr: f64,
}

impl From<QualityOption> for FormatEntry {
    fn from(option: QualityOption) -> Self {
        Self {
            filesize: option.filesize().megabytes_label(),
            quality: option.quality_label,
            format_id: option.combined_format_id,
            ext: option.extension,
            vcodec: option.video_codec,
            acodec: option.audio_codec,
            fps: option.fps,
            tbr: option.average_bitrate,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DownloadLinkResponse {
    download_url: String,
    filename: String,
}

/// One row of the local download history
#[derive(Debug, Serialize, Deserialize)]
struct DownloadView {
    id: RecordId,
    url: String,
    filename: Option<String>,
    format_id: Option<String>,
    status: String,
    progress: f64,
    file_size: String,
    created_at: String,
}

impl From<DownloadRecord> for DownloadView {
    fn from(record: DownloadRecord) -> Self {
        Self {
            status: record.status.to_string(),
            file_size: record.file_size_label(),
            created_at: record.created_at.to_rfc3339(),
            id: record.id,
            url: record.url,
            filename: record.filename,
            format_id: record.format_id,
            progress: record.progress,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CancelResponse {
    cancelled: bool,
}

pub fn router(service: Arc<DownloadService>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/get-formats", post(get_formats))
        .route("/api/download", post(download_link))
        .route("/api/downloads", get(list_downloads).post(start_download))
        .route(
            "/api/downloads/:id",
            get(download_progress).delete(cancel_download),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Serve until Ctrl-C, then cancel whatever is still downloading
pub async fn run(config: Config, service: Arc<DownloadService>) -> color_eyre::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("Video fetch API listening on http://{}", config.bind);

    axum::serve(listener, router(Arc::clone(&service)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.shutdown().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown requested"),
        Err(e) => {
            warn!("Could not listen for Ctrl-C, running until killed: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let template = IndexTemplate {
        version: env!("CARGO_PKG_VERSION"),
        active_downloads: state.service.active_count(),
    };
    Ok(Html(template.render()?))
}

async fn get_formats(
    State(state): State<AppState>,
    payload: Result<Json<FormatsRequest>, JsonRejection>,
) -> Result<Json<FormatsResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let url = request.url.unwrap_or_default();
    info!("Listing formats for {}", url);

    let listing = state.service.list_qualities(&url).await?;
    Ok(Json(FormatsResponse {
        title: listing.title,
        formats: listing.options.into_iter().map(FormatEntry::from).collect(),
    }))
}

async fn download_link(
    State(state): State<AppState>,
    payload: Result<Json<DownloadLinkRequest>, JsonRejection>,
) -> Result<Json<DownloadLinkResponse>, AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let url = request.url.unwrap_or_default();
    let format_id = request.format_id.unwrap_or_default();
    info!("Resolving {} for {}", format_id, url);

    let resolved = state.service.resolve(&url, &format_id).await?;
    Ok(Json(DownloadLinkResponse {
        download_url: resolved.direct_media_url,
        filename: resolved.suggested_filename,
    }))
}

async fn start_download(
    State(state): State<AppState>,
    payload: Result<Json<StartDownloadRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DownloadView>), AppError> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let url = request.url.unwrap_or_default();

    let ticket = state
        .service
        .start_download(&url, request.format_id.as_deref())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(ticket.record.into())))
}

async fn list_downloads(State(state): State<AppState>) -> Json<Vec<DownloadView>> {
    Json(
        state
            .service
            .history()
            .into_iter()
            .map(DownloadView::from)
            .collect(),
    )
}

async fn download_progress(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<DownloadView>, AppError> {
    Ok(Json(state.service.progress(id)?.into()))
}

async fn cancel_download(
    State(state): State<AppState>,
    Path(id): Path<RecordId>,
) -> Result<Json<CancelResponse>, AppError> {
    let cancelled = state.service.cancel(id)?;
    Ok(Json(CancelResponse { cancelled }))
}
