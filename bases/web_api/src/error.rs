// bases/web_api/src/error.rs
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use download_service::ServiceError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Application-level errors for HTTP handlers
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("failed to render page: {0}")]
    Template(#[from] askama::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Service(ServiceError::InvalidInput(_)) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Service(
                ServiceError::NoUsableFormat
                | ServiceError::FormatUnavailable(_)
                | ServiceError::UnknownDownload(_),
            ) => StatusCode::NOT_FOUND,
            AppError::Service(ServiceError::NoDirectUrl(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Service(ServiceError::Extraction(_)) => StatusCode::BAD_GATEWAY,
            AppError::Service(ServiceError::Cancelled) => StatusCode::CONFLICT,
            AppError::Service(ServiceError::Storage(_)) | AppError::Template(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();

        if status.is_server_error() {
            error!("Request failed ({}): {}", status, message);
        } else {
            warn!("Request rejected ({}): {}", status, message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
