// components/media_downloader/src/lib.rs
mod task;
mod types;
mod utils;
mod ytdlp;

pub use task::{spawn_download, DownloadHandle, DownloadMonitor};
pub use types::{
    DownloadError, DownloadRequest, ProbeResult, ProgressSink, ProgressSnapshot, ResolvedStream,
};
pub use utils::{parse_media_url, suggested_filename};
pub use ytdlp::{Extractor, YtDlp, YtDlpConfig, DEFAULT_FORMAT_SELECTOR, DEFAULT_USER_AGENT};
