use download_records::{RecordId, StoreError};
use format_selector::SelectionError;
use media_downloader::DownloadError;
use thiserror::Error;

/// Everything a front end can be told about a failed operation
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),

    /// Extractor message, verbatim
    #[error("{0}")]
    Extraction(String),

    #[error("No suitable video format found")]
    NoUsableFormat,

    #[error("Requested format is not available: {0}")]
    FormatUnavailable(String),

    /// A split video+audio pairing was asked for as one link
    #[error("Format {0} has separate video and audio streams; no single direct URL exists")]
    NoDirectUrl(String),

    #[error("Download cancelled")]
    Cancelled,

    #[error("No download with id {0}")]
    UnknownDownload(RecordId),

    #[error("Download records unavailable: {0}")]
    Storage(#[from] StoreError),
}

impl From<DownloadError> for ServiceError {
    fn from(error: DownloadError) -> Self {
        match error {
            DownloadError::InvalidUrl(message) => ServiceError::InvalidInput(message),
            DownloadError::Extraction(message) => ServiceError::Extraction(message),
            DownloadError::FormatUnavailable(format_id) => {
                ServiceError::FormatUnavailable(format_id)
            }
            DownloadError::NoDirectUrl(format_id) => ServiceError::NoDirectUrl(format_id),
            DownloadError::Cancelled => ServiceError::Cancelled,
            other @ (DownloadError::DependencyNotFound(_) | DownloadError::IoError(_)) => {
                ServiceError::Extraction(other.to_string())
            }
        }
    }
}

impl From<SelectionError> for ServiceError {
    fn from(error: SelectionError) -> Self {
        match error {
            SelectionError::NoUsableFormat => ServiceError::NoUsableFormat,
        }
    }
}
