use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use download_records::{DownloadRecord, DownloadStatus, RecordId, RecordStore, StoreError};
use format_selector::{select_qualities, QualityOption};
use media_downloader::{
    parse_media_url, spawn_download, suggested_filename, DownloadError, DownloadHandle,
    DownloadMonitor, DownloadRequest, Extractor, ProbeResult, ResolvedStream,
};
use parking_lot::Mutex;
use storage_primitives::ByteSize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::ServiceError;

type ActiveDownloads = Arc<Mutex<HashMap<RecordId, DownloadMonitor>>>;

/// Title and ranked quality options for one URL
#[derive(Debug, Clone)]
pub struct QualityListing {
    pub title: String,
    pub options: Vec<QualityOption>,
}

/// A started download: its record at start time and a live monitor
#[derive(Debug)]
pub struct DownloadTicket {
    pub record: DownloadRecord,
    pub monitor: DownloadMonitor,
}

impl DownloadTicket {
    pub fn id(&self) -> RecordId {
        self.record.id
    }
}

/// Shared context for both front ends
///
/// Built once in `main` and shared behind an `Arc`. Owns the extractor, the
/// record store and the registry of running downloads.
pub struct DownloadService {
    extractor: Arc<dyn Extractor>,
    records: Arc<RecordStore>,
    download_dir: PathBuf,
    active: ActiveDownloads,
    watchers: Mutex<Vec<JoinHandle<()>>>,
}

impl DownloadService {
    pub fn new(extractor: Arc<dyn Extractor>, records: RecordStore, download_dir: PathBuf) -> Self {
        Self {
            extractor,
            records: Arc::new(records),
            download_dir,
            active: Arc::new(Mutex::new(HashMap::new())),
            watchers: Mutex::new(Vec::new()),
        }
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Fails when the extractor binary can't be found
    pub async fn check_extractor(&self) -> Result<(), ServiceError> {
        self.extractor.check_available().await.map_err(Into::into)
    }

    pub async fn list_qualities(&self, url: &str) -> Result<QualityListing, ServiceError> {
        let url = validate_url(url)?;
        let probe = self.extractor.probe(&url).await?;
        debug!("{} formats reported for {}", probe.formats.len(), url);

        if probe.formats.is_empty() {
            return Err(ServiceError::NoUsableFormat);
        }
        let options = select_qualities(&probe.formats)?;
        info!("Found {} quality options for '{}'", options.len(), probe.title);

        Ok(QualityListing {
            title: probe.title,
            options,
        })
    }

    pub async fn resolve(&self, url: &str, format_id: &str) -> Result<ResolvedStream, ServiceError> {
        let url = validate_url(url)?;
        let format_id = require_format_id(format_id)?;
        let resolved = self.extractor.resolve_stream(&url, format_id).await?;
        info!("Resolved {} for {}", format_id, url);
        Ok(resolved)
    }

    /// Record and start a local download
    ///
    /// Without a format id the extractor's default mp4 pairing is fetched. The
    /// call returns once the download runs; its outcome lands in the record.
    pub async fn start_download(
        &self,
        url: &str,
        format_id: Option<&str>,
    ) -> Result<DownloadTicket, ServiceError> {
        let url = validate_url(url)?;
        let format_id = format_id
            .map(|id| require_format_id(id).map(str::to_string))
            .transpose()?;

        let id = self.create_record(&url, format_id.clone()).await?;

        let probe = match self.extractor.probe(&url).await {
            Ok(probe) => probe,
            Err(e) => {
                let error = ServiceError::from(e);
                warn!("Download {} failed before start: {}", id, error);
                let message = error.to_string();
                write_record(&self.records, move |store| {
                    store.update(id, |r| r.status = DownloadStatus::Failed(message))
                })
                .await?;
                return Err(error);
            }
        };

        let filename = suggested_filename(
            &probe.title,
            selection_extension(&probe, format_id.as_deref()),
        );
        let size = selection_size(&probe, format_id.as_deref());
        self.begin_download(id, url, format_id, filename, size).await
    }

    /// Start a download of an option from an earlier `list_qualities` call
    ///
    /// `title` and `option` come from that listing, so the extractor is not
    /// asked about the URL a second time.
    pub async fn start_listed_download(
        &self,
        url: &str,
        title: &str,
        option: &QualityOption,
    ) -> Result<DownloadTicket, ServiceError> {
        let url = validate_url(url)?;
        let format_id = require_format_id(&option.combined_format_id)?.to_string();

        let id = self.create_record(&url, Some(format_id.clone())).await?;

        let filename = suggested_filename(title, &option.extension);
        let size = Some(option.filesize()).filter(|size| !size.is_zero());
        self.begin_download(id, url, Some(format_id), filename, size).await
    }

    async fn create_record(
        &self,
        url: &Url,
        format_id: Option<String>,
    ) -> Result<RecordId, ServiceError> {
        let url = url.to_string();
        let record =
            write_record(&self.records, move |store| store.create(url, format_id)).await?;
        Ok(record.id)
    }

    async fn begin_download(
        &self,
        id: RecordId,
        url: Url,
        format_id: Option<String>,
        filename: String,
        size: Option<ByteSize>,
    ) -> Result<DownloadTicket, ServiceError> {
        let record = write_record(&self.records, move |store| {
            store.update(id, |r| {
                r.filename = Some(filename);
                r.file_size = size;
                r.status = DownloadStatus::Downloading;
            })
        })
        .await?;

        let handle = spawn_download(
            Arc::clone(&self.extractor),
            DownloadRequest {
                url,
                format_id,
                output_dir: self.download_dir.clone(),
            },
        );
        let monitor = handle.monitor();
        self.active.lock().insert(id, monitor.clone());

        let watcher = tokio::spawn(finish_download(
            id,
            handle,
            Arc::clone(&self.records),
            Arc::clone(&self.active),
        ));
        {
            let mut watchers = self.watchers.lock();
            watchers.retain(|w| !w.is_finished());
            watchers.push(watcher);
        }

        info!("Started download {} ({})", id, record.display_name());
        Ok(DownloadTicket { record, monitor })
    }

    /// Current record, with live progress while the download runs
    pub fn progress(&self, id: RecordId) -> Result<DownloadRecord, ServiceError> {
        let live = self.active.lock().get(&id).map(|m| m.snapshot());
        let mut record = self
            .records
            .get(id)
            .ok_or(ServiceError::UnknownDownload(id))?;

        if !record.status.is_terminal() {
            if let Some(percent) = live.and_then(|s| s.percent()) {
                record.set_progress(percent);
            }
        }
        Ok(record)
    }

    /// Signal one download to stop; `false` when it had already finished
    pub fn cancel(&self, id: RecordId) -> Result<bool, ServiceError> {
        if let Some(monitor) = self.active.lock().get(&id) {
            monitor.cancel();
            info!("Cancelling download {}", id);
            return Ok(true);
        }
        match self.records.get(id) {
            Some(_) => Ok(false),
            None => Err(ServiceError::UnknownDownload(id)),
        }
    }

    /// Signal every running download to stop, returning how many were signalled
    pub fn cancel_all(&self) -> usize {
        let active = self.active.lock();
        for monitor in active.values() {
            monitor.cancel();
        }
        active.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().len()
    }

    /// All records, newest first
    pub fn history(&self) -> Vec<DownloadRecord> {
        self.records.list()
    }

    /// Wait until every started download has settled its record
    pub async fn wait_all(&self) {
        let watchers = std::mem::take(&mut *self.watchers.lock());
        for watcher in watchers {
            if let Err(e) = watcher.await {
                warn!("Download watcher ended abnormally: {}", e);
            }
        }
    }

    /// Cancel running downloads and wait for their records to settle
    pub async fn shutdown(&self) {
        let cancelled = self.cancel_all();
        if cancelled > 0 {
            info!("Shutting down, cancelled {} active downloads", cancelled);
        }
        self.wait_all().await;
    }
}

async fn finish_download(
    id: RecordId,
    handle: DownloadHandle,
    records: Arc<RecordStore>,
    active: ActiveDownloads,
) {
    let monitor = handle.monitor();
    let outcome = handle.wait().await;
    let last_percent = monitor.snapshot().percent();

    let on_disk = match &outcome {
        Ok(path) => tokio::fs::metadata(path)
            .await
            .ok()
            .map(|meta| ByteSize::new(meta.len())),
        Err(_) => None,
    };

    match &outcome {
        Ok(path) => info!("Download {} finished: {}", id, path.display()),
        Err(DownloadError::Cancelled) => info!("Download {} cancelled", id),
        Err(e) => warn!("Download {} failed: {}", id, e),
    }

    let updated = write_record(&records, move |store| {
        store.update(id, |record| {
            if let Some(percent) = last_percent {
                record.set_progress(percent);
            }
            let status = match outcome {
                Ok(path) => {
                    if let Some(name) = path.file_name() {
                        record.filename = Some(name.to_string_lossy().into_owned());
                    }
                    if on_disk.is_some() {
                        record.file_size = on_disk;
                    }
                    record.set_progress(100.0);
                    DownloadStatus::Completed
                }
                Err(DownloadError::Cancelled) => DownloadStatus::Cancelled,
                Err(e) => DownloadStatus::Failed(e.to_string()),
            };
            record.status = status;
        })
    })
    .await;
    if let Err(e) = updated {
        warn!("Could not record outcome of download {}: {}", id, e);
    }

    active.lock().remove(&id);
}

/// Run a record-store write on the blocking pool
///
/// Every write rewrites the records file while the store lock is held.
async fn write_record<T, F>(records: &Arc<RecordStore>, write: F) -> Result<T, ServiceError>
where
    F: FnOnce(&RecordStore) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let records = Arc::clone(records);
    let written = tokio::task::spawn_blocking(move || write(&records))
        .await
        .map_err(|e| StoreError::WriteAborted(e.to_string()))?;
    Ok(written?)
}

fn validate_url(raw: &str) -> Result<Url, ServiceError> {
    if raw.trim().is_empty() {
        return Err(ServiceError::InvalidInput("URL is required".to_string()));
    }
    Ok(parse_media_url(raw)?)
}

fn require_format_id(format_id: &str) -> Result<&str, ServiceError> {
    let trimmed = format_id.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidInput(
            "Format ID is required".to_string(),
        ));
    }
    Ok(trimmed)
}

/// Extension of the video part of a combined id, else mp4
fn selection_extension<'a>(probe: &'a ProbeResult, format_id: Option<&str>) -> &'a str {
    format_id
        .and_then(|id| id.split('+').next())
        .and_then(|first| probe.formats.iter().find(|f| f.format_id == first))
        .map(|f| f.extension.as_str())
        .unwrap_or("mp4")
}

/// Sum of the known sizes of every part of the selection
///
/// Falls back to the extractor's size for its default selection.
fn selection_size(probe: &ProbeResult, format_id: Option<&str>) -> Option<ByteSize> {
    let parts_total = format_id.map(|id| {
        id.split('+')
            .filter_map(|part| probe.formats.iter().find(|f| f.format_id == part))
            .map(|f| ByteSize::new(f.best_known_size()))
            .fold(ByteSize::ZERO, ByteSize::saturating_add)
    });

    match parts_total {
        Some(total) if !total.is_zero() => Some(total),
        _ => probe.filesize.filter(|&bytes| bytes > 0).map(ByteSize::new),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use format_selector::RawFormatDescriptor;
    use media_downloader::ProgressSink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_util::sync::CancellationToken;

    const URL: &str = "https://www.youtube.com/watch?v=abc";

    struct ScriptedExtractor {
        formats: Vec<RawFormatDescriptor>,
        probe_error: Option<String>,
        download_error: Option<String>,
        step_delay: Duration,
        probe_calls: AtomicUsize,
    }

    impl ScriptedExtractor {
        fn new() -> Self {
            Self {
                formats: vec![
                    RawFormatDescriptor::new("137")
                        .with_video("avc1.640028", 1080)
                        .with_filesize(500 * 1024 * 1024),
                    RawFormatDescriptor::new("22")
                        .with_video("avc1.64001F", 720)
                        .with_audio("mp4a.40.2")
                        .with_filesize(90 * 1024 * 1024),
                    RawFormatDescriptor::new("136")
                        .with_video("avc1.4d401f", 720)
                        .with_filesize(300 * 1024 * 1024)
                        .with_extension("webm"),
                    RawFormatDescriptor::new("140")
                        .with_audio("mp4a.40.2")
                        .with_bitrate(128.0)
                        .with_filesize(4 * 1024 * 1024),
                ],
                probe_error: None,
                download_error: None,
                step_delay: Duration::from_millis(5),
                probe_calls: AtomicUsize::new(0),
            }
        }

        fn with_formats(mut self, formats: Vec<RawFormatDescriptor>) -> Self {
            self.formats = formats;
            self
        }

        fn failing_probe(mut self, message: &str) -> Self {
            self.probe_error = Some(message.to_string());
            self
        }

        fn failing_download(mut self, message: &str) -> Self {
            self.download_error = Some(message.to_string());
            self
        }

        fn slow(mut self) -> Self {
            self.step_delay = Duration::from_secs(30);
            self
        }
    }

    #[async_trait]
    impl Extractor for ScriptedExtractor {
        async fn check_available(&self) -> Result<(), DownloadError> {
            Ok(())
        }

        async fn probe(&self, _url: &Url) -> Result<ProbeResult, DownloadError> {
            self.probe_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.probe_error {
                return Err(DownloadError::Extraction(message.clone()));
            }
            Ok(ProbeResult {
                title: "Clip".to_string(),
                formats: self.formats.clone(),
                filesize: Some(2_048),
            })
        }

        async fn resolve_stream(
            &self,
            _url: &Url,
            format_id: &str,
        ) -> Result<ResolvedStream, DownloadError> {
            if format_id == "999" {
                return Err(DownloadError::FormatUnavailable(format_id.to_string()));
            }
            Ok(ResolvedStream {
                direct_media_url: format!("https://cdn.example.com/{format_id}"),
                suggested_filename: "Clip.mp4".to_string(),
            })
        }

        async fn download_to_local_storage(
            &self,
            request: &DownloadRequest,
            progress: &ProgressSink,
            cancel: &CancellationToken,
        ) -> Result<PathBuf, DownloadError> {
            for step in 1..=4u64 {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                    _ = tokio::time::sleep(self.step_delay) => {}
                }
                if step == 2 {
                    if let Some(message) = &self.download_error {
                        return Err(DownloadError::Extraction(message.clone()));
                    }
                }
                progress.report(step * 25, Some(100));
            }
            Ok(request.output_dir.join("Clip.mp4"))
        }
    }

    fn service(extractor: ScriptedExtractor) -> (DownloadService, Arc<ScriptedExtractor>) {
        let extractor = Arc::new(extractor);
        let service = DownloadService::new(
            Arc::clone(&extractor) as Arc<dyn Extractor>,
            RecordStore::in_memory(),
            PathBuf::from("/nonexistent/downloads"),
        );
        (service, extractor)
    }

    #[tokio::test]
    async fn lists_ranked_qualities() {
        let (service, _) = service(ScriptedExtractor::new());
        let listing = service.list_qualities(URL).await.unwrap();

        assert_eq!(listing.title, "Clip");
        let labels: Vec<_> = listing
            .options
            .iter()
            .map(|o| (o.quality_label.as_str(), o.combined_format_id.as_str()))
            .collect();
        assert_eq!(labels, vec![("1080p", "137+140"), ("720p", "136+140")]);
    }

    #[tokio::test]
    async fn blank_url_is_rejected_before_probing() {
        let (service, extractor) = service(ScriptedExtractor::new());

        assert_matches!(
            service.list_qualities("   ").await,
            Err(ServiceError::InvalidInput(m)) if m == "URL is required"
        );
        assert_matches!(
            service.start_download("", None).await,
            Err(ServiceError::InvalidInput(_))
        );
        assert_matches!(
            service.list_qualities("ftp://example.com/clip").await,
            Err(ServiceError::InvalidInput(_))
        );
        assert_eq!(extractor.probe_calls.load(Ordering::SeqCst), 0);
        assert!(service.history().is_empty());
    }

    #[tokio::test]
    async fn empty_format_list_has_no_usable_format() {
        let (service, _) = service(ScriptedExtractor::new().with_formats(vec![]));
        assert_matches!(
            service.list_qualities(URL).await,
            Err(ServiceError::NoUsableFormat)
        );
    }

    #[tokio::test]
    async fn audio_only_listing_has_no_usable_format() {
        let (service, _) = service(ScriptedExtractor::new().with_formats(vec![
            RawFormatDescriptor::new("140").with_audio("mp4a.40.2"),
        ]));
        assert_matches!(
            service.list_qualities(URL).await,
            Err(ServiceError::NoUsableFormat)
        );
    }

    #[tokio::test]
    async fn extraction_message_is_kept_verbatim() {
        let (service, _) =
            service(ScriptedExtractor::new().failing_probe("ERROR: Private video"));
        assert_matches!(
            service.list_qualities(URL).await,
            Err(ServiceError::Extraction(m)) if m == "ERROR: Private video"
        );
    }

    #[tokio::test]
    async fn resolve_validates_and_forwards() {
        let (service, _) = service(ScriptedExtractor::new());

        assert_matches!(
            service.resolve(URL, " ").await,
            Err(ServiceError::InvalidInput(m)) if m == "Format ID is required"
        );
        assert_matches!(
            service.resolve(URL, "999").await,
            Err(ServiceError::FormatUnavailable(id)) if id == "999"
        );

        let resolved = service.resolve(URL, "137+140").await.unwrap();
        assert_eq!(resolved.direct_media_url, "https://cdn.example.com/137+140");
        assert_eq!(resolved.suggested_filename, "Clip.mp4");
    }

    #[tokio::test]
    async fn download_completes_and_updates_record() {
        let (service, _) = service(ScriptedExtractor::new());
        let ticket = service.start_download(URL, Some("137+140")).await.unwrap();

        assert_eq!(ticket.record.status, DownloadStatus::Downloading);
        assert_eq!(ticket.record.filename.as_deref(), Some("Clip.mp4"));
        assert_eq!(ticket.record.file_size_label(), "504.0 MB");

        service.wait_all().await;

        let record = service.progress(ticket.id()).unwrap();
        assert_eq!(record.status, DownloadStatus::Completed);
        assert_eq!(record.progress, 100.0);
        assert_eq!(service.active_count(), 0);
    }

    #[tokio::test]
    async fn default_selection_uses_reported_size() {
        let (service, _) = service(ScriptedExtractor::new());
        let ticket = service.start_download(URL, None).await.unwrap();

        assert_eq!(ticket.record.format_id, None);
        assert_eq!(ticket.record.file_size_label(), "2.0 KB");
        service.wait_all().await;
    }

    #[tokio::test]
    async fn filename_uses_video_part_extension() {
        let (service, _) = service(ScriptedExtractor::new());
        let ticket = service.start_download(URL, Some("136+140")).await.unwrap();

        assert_eq!(ticket.record.filename.as_deref(), Some("Clip.webm"));
        service.wait_all().await;
    }

    #[tokio::test]
    async fn listed_option_starts_without_asking_the_extractor_again() {
        let (service, extractor) = service(ScriptedExtractor::new());
        let listing = service.list_qualities(URL).await.unwrap();
        assert_eq!(extractor.probe_calls.load(Ordering::SeqCst), 1);

        let option = &listing.options[1];
        let ticket = service
            .start_listed_download(URL, &listing.title, option)
            .await
            .unwrap();

        assert_eq!(extractor.probe_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ticket.record.format_id.as_deref(), Some("136+140"));
        assert_eq!(ticket.record.filename.as_deref(), Some("Clip.webm"));
        assert_eq!(ticket.record.file_size_label(), "300.0 MB");
        assert_eq!(ticket.record.status, DownloadStatus::Downloading);

        service.wait_all().await;
        assert_eq!(
            service.progress(ticket.id()).unwrap().status,
            DownloadStatus::Completed
        );
    }

    #[tokio::test]
    async fn listed_option_still_needs_a_valid_url() {
        let (service, _) = service(ScriptedExtractor::new());
        let listing = service.list_qualities(URL).await.unwrap();

        assert_matches!(
            service
                .start_listed_download(" ", &listing.title, &listing.options[0])
                .await,
            Err(ServiceError::InvalidInput(m)) if m == "URL is required"
        );
        assert!(service.history().is_empty());
    }

    #[tokio::test]
    async fn failed_download_keeps_message_and_progress() {
        let (service, _) =
            service(ScriptedExtractor::new().failing_download("ERROR: HTTP Error 403: Forbidden"));
        let ticket = service.start_download(URL, Some("22")).await.unwrap();
        service.wait_all().await;

        let record = service.progress(ticket.id()).unwrap();
        assert_eq!(
            record.status,
            DownloadStatus::Failed("ERROR: HTTP Error 403: Forbidden".to_string())
        );
        assert_eq!(record.progress, 25.0);
        assert_eq!(record.status.to_string(), "Error: ERROR: HTTP Error 403: Forbidden");
    }

    #[tokio::test]
    async fn failed_probe_marks_record_failed() {
        let (service, _) = service(ScriptedExtractor::new().failing_probe("ERROR: Gone"));

        assert_matches!(
            service.start_download(URL, Some("22")).await,
            Err(ServiceError::Extraction(_))
        );
        let history = service.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, DownloadStatus::Failed("ERROR: Gone".into()));
        assert_eq!(service.active_count(), 0);
    }

    #[tokio::test]
    async fn cancel_stops_a_running_download() {
        let (service, _) = service(ScriptedExtractor::new().slow());
        let ticket = service.start_download(URL, Some("22")).await.unwrap();
        assert_eq!(service.active_count(), 1);

        assert!(service.cancel(ticket.id()).unwrap());
        service.wait_all().await;

        let record = service.progress(ticket.id()).unwrap();
        assert_eq!(record.status, DownloadStatus::Cancelled);
        assert_eq!(service.active_count(), 0);
        // already settled
        assert!(!service.cancel(ticket.id()).unwrap());
    }

    #[tokio::test]
    async fn shutdown_cancels_everything() {
        let (service, _) = service(ScriptedExtractor::new().slow());
        let first = service.start_download(URL, Some("22")).await.unwrap();
        let second = service.start_download(URL, None).await.unwrap();
        assert_eq!(service.active_count(), 2);

        service.shutdown().await;

        assert_eq!(service.active_count(), 0);
        for id in [first.id(), second.id()] {
            assert_eq!(
                service.progress(id).unwrap().status,
                DownloadStatus::Cancelled
            );
        }
    }

    #[tokio::test]
    async fn unknown_ids_are_reported() {
        let (service, _) = service(ScriptedExtractor::new());
        assert_matches!(service.progress(42), Err(ServiceError::UnknownDownload(42)));
        assert_matches!(service.cancel(42), Err(ServiceError::UnknownDownload(42)));
    }

    #[tokio::test]
    async fn history_is_persisted() {
        let dir = TempDir::new().unwrap();
        let extractor: Arc<dyn Extractor> = Arc::new(ScriptedExtractor::new());
        let service = DownloadService::new(
            extractor,
            RecordStore::open(dir.path()).unwrap(),
            dir.path().join("downloads"),
        );
        service.start_download(URL, Some("22")).await.unwrap();
        service.wait_all().await;

        let reopened = RecordStore::open(dir.path()).unwrap();
        let records = reopened.list();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, DownloadStatus::Completed);
        assert_eq!(records[0].format_id.as_deref(), Some("22"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_starts_persist_every_record() {
        let dir = TempDir::new().unwrap();
        let extractor: Arc<dyn Extractor> = Arc::new(ScriptedExtractor::new());
        let service = DownloadService::new(
            extractor,
            RecordStore::open(dir.path()).unwrap(),
            dir.path().join("downloads"),
        );

        let (a, b, c) = tokio::join!(
            service.start_download(URL, Some("22")),
            service.start_download(URL, Some("137+140")),
            service.start_download(URL, None),
        );
        let mut ids = vec![a.unwrap().id(), b.unwrap().id(), c.unwrap().id()];
        service.wait_all().await;

        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3]);
        let reopened = RecordStore::open(dir.path()).unwrap();
        assert!(reopened
            .list()
            .iter()
            .all(|record| record.status == DownloadStatus::Completed));
        assert_eq!(reopened.list().len(), 3);
    }
}
