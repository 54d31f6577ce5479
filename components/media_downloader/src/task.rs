// components/media_downloader/src/task.rs
//! Background downloads as cancellable, observable tasks
//!
//! The worker never touches UI state. It publishes [`ProgressSnapshot`]s on a
//! watch channel; callers poll or stream them at their own cadence and decide
//! when to cancel.

use std::path::PathBuf;
use std::sync::Arc;

use futures::Stream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::types::{DownloadError, DownloadRequest, ProgressSink, ProgressSnapshot};
use crate::ytdlp::Extractor;

/// Cloneable view of a running download: progress and a cancel switch
#[derive(Clone, Debug)]
pub struct DownloadMonitor {
    progress: watch::Receiver<ProgressSnapshot>,
    cancel: CancellationToken,
}

impl DownloadMonitor {
    /// Latest snapshot without waiting
    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.progress.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.clone()
    }

    /// Every snapshot change, starting with the current one; ends with the task
    pub fn progress_stream(&self) -> impl Stream<Item = ProgressSnapshot> {
        let mut rx = self.progress.clone();
        async_stream::stream! {
            let first = *rx.borrow_and_update();
            yield first;
            while rx.changed().await.is_ok() {
                let next = *rx.borrow_and_update();
                yield next;
            }
        }
    }

    /// Ask the worker to stop at its next checkpoint
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Owning handle of a spawned download
pub struct DownloadHandle {
    monitor: DownloadMonitor,
    join: JoinHandle<Result<PathBuf, DownloadError>>,
}

impl DownloadHandle {
    pub fn monitor(&self) -> DownloadMonitor {
        self.monitor.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the worker; a panicked or aborted worker counts as failed
    pub async fn wait(self) -> Result<PathBuf, DownloadError> {
        match self.join.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(DownloadError::Cancelled),
            Err(e) => Err(DownloadError::Extraction(format!(
                "download worker failed: {e}"
            ))),
        }
    }
}

/// Run one download on its own task
pub fn spawn_download(extractor: Arc<dyn Extractor>, request: DownloadRequest) -> DownloadHandle {
    let (sink, progress) = ProgressSink::channel();
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let join = tokio::spawn(async move {
        extractor
            .download_to_local_storage(&request, &sink, &token)
            .await
    });

    DownloadHandle {
        monitor: DownloadMonitor { progress, cancel },
        join,
    }
}
