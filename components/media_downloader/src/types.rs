// components/media_downloader/src/types.rs
use std::path::PathBuf;

use format_selector::RawFormatDescriptor;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use url::Url;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Required dependency not found: {0}")]
    DependencyNotFound(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Extractor failure, message kept verbatim for the user
    #[error("{0}")]
    Extraction(String),

    #[error("Requested format is not available: {0}")]
    FormatUnavailable(String),

    #[error("Format {0} has separate video and audio streams; no single direct URL exists")]
    NoDirectUrl(String),

    #[error("Download cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Title plus every stream variant the extractor offers for a URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    pub title: String,
    pub formats: Vec<RawFormatDescriptor>,
    /// Size of the default selection, when the extractor reports one
    pub filesize: Option<u64>,
}

/// Where a caller can fetch a chosen format itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedStream {
    pub direct_media_url: String,
    pub suggested_filename: String,
}

/// What to fetch and where to put it
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: Url,
    /// `None` lets the extractor pick its default best mp4 pairing
    pub format_id: Option<String>,
    pub output_dir: PathBuf,
}

/// Bytes received so far and the expected total (exact or estimated)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub bytes_done: u64,
    pub bytes_total: Option<u64>,
}

impl ProgressSnapshot {
    pub fn new(bytes_done: u64, bytes_total: Option<u64>) -> Self {
        Self {
            bytes_done,
            bytes_total,
        }
    }

    /// Percentage complete, `None` while the total is unknown
    pub fn percent(&self) -> Option<f64> {
        match self.bytes_total {
            Some(total) if total > 0 => Some(self.bytes_done as f64 / total as f64 * 100.0),
            _ => None,
        }
    }
}

/// Write side of a download's progress channel
pub struct ProgressSink {
    tx: watch::Sender<ProgressSnapshot>,
}

impl ProgressSink {
    pub fn new(tx: watch::Sender<ProgressSnapshot>) -> Self {
        Self { tx }
    }

    /// A sink and the receiver observing it
    pub fn channel() -> (Self, watch::Receiver<ProgressSnapshot>) {
        let (tx, rx) = watch::channel(ProgressSnapshot::default());
        (Self::new(tx), rx)
    }

    pub fn report(&self, bytes_done: u64, bytes_total: Option<u64>) {
        // Replacing never fails, even when every observer is gone.
        self.tx
            .send_replace(ProgressSnapshot::new(bytes_done, bytes_total));
    }

    pub fn current(&self) -> ProgressSnapshot {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_needs_a_known_total() {
        assert_eq!(ProgressSnapshot::new(50, Some(200)).percent(), Some(25.0));
        assert_eq!(ProgressSnapshot::new(50, None).percent(), None);
        assert_eq!(ProgressSnapshot::new(50, Some(0)).percent(), None);
    }

    #[test]
    fn sink_reports_reach_receiver() {
        let (sink, rx) = ProgressSink::channel();
        sink.report(10, Some(100));
        assert_eq!(*rx.borrow(), ProgressSnapshot::new(10, Some(100)));
        assert_eq!(sink.current().bytes_done, 10);
    }

    #[test]
    fn sink_survives_dropped_receiver() {
        let (sink, rx) = ProgressSink::channel();
        drop(rx);
        sink.report(1, None);
        assert_eq!(sink.current(), ProgressSnapshot::new(1, None));
    }
}
