use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storage_primitives::ByteSize;

pub type RecordId = u64;

/// Lifecycle of a download as shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    Completed,
    Failed(String),
    Cancelled,
}

impl DownloadStatus {
    /// No further transitions happen once a download is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DownloadStatus::Completed | DownloadStatus::Failed(_) | DownloadStatus::Cancelled
        )
    }
}

impl fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadStatus::Pending => f.write_str("Pending"),
            DownloadStatus::Downloading => f.write_str("Downloading"),
            DownloadStatus::Completed => f.write_str("Completed"),
            DownloadStatus::Failed(message) => write!(f, "Error: {message}"),
            DownloadStatus::Cancelled => f.write_str("Cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub id: RecordId,
    pub url: String,
    /// Known once the extractor has reported a title
    pub filename: Option<String>,
    pub format_id: Option<String>,
    pub status: DownloadStatus,
    /// Percent in `0.0..=100.0`
    pub progress: f64,
    pub file_size: Option<ByteSize>,
    pub created_at: DateTime<Utc>,
}

impl DownloadRecord {
    pub fn new(id: RecordId, url: impl Into<String>, format_id: Option<String>) -> Self {
        Self {
            id,
            url: url.into(),
            filename: None,
            format_id,
            status: DownloadStatus::Pending,
            progress: 0.0,
            file_size: None,
            created_at: Utc::now(),
        }
    }

    /// Size column text, `"Unknown"` until the extractor reports one
    pub fn file_size_label(&self) -> String {
        match self.file_size {
            Some(size) if !size.is_zero() => size.to_string(),
            _ => "Unknown".to_string(),
        }
    }

    /// File column text, falling back to the source URL
    pub fn display_name(&self) -> &str {
        self.filename.as_deref().unwrap_or(&self.url)
    }

    pub fn set_progress(&mut self, percent: f64) {
        self.progress = percent.clamp(0.0, 100.0);
    }
}
