// components/media_downloader/src/ytdlp.rs
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use format_selector::RawFormatDescriptor;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::types::{DownloadError, DownloadRequest, ProbeResult, ProgressSink, ResolvedStream};
use crate::utils::suggested_filename;

/// Used when a download is started without an explicit format
pub const DEFAULT_FORMAT_SELECTOR: &str =
    "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

const PROGRESS_PREFIX: &str = "DOWNLOAD|";
const FILEPATH_PREFIX: &str = "FILEPATH|";
const FORMAT_UNAVAILABLE_MARKER: &str = "Requested format is not available";

/// The extraction capability: metadata, direct stream URLs and local downloads
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Check that the extractor and its dependencies are installed
    async fn check_available(&self) -> Result<(), DownloadError>;

    /// Title and format listing for a URL
    async fn probe(&self, url: &Url) -> Result<ProbeResult, DownloadError>;

    /// Direct media URL and a filename for one (combined) format id
    async fn resolve_stream(
        &self,
        url: &Url,
        format_id: &str,
    ) -> Result<ResolvedStream, DownloadError>;

    /// Fetch to `request.output_dir`, reporting progress until done or cancelled
    async fn download_to_local_storage(
        &self,
        request: &DownloadRequest,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError>;
}

/// Knobs passed through to every yt-dlp invocation
#[derive(Debug, Clone)]
pub struct YtDlpConfig {
    pub binary: PathBuf,
    pub user_agent: String,
    pub socket_timeout_secs: u32,
    pub extractor_retries: u32,
    pub cookie_file: Option<PathBuf>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            socket_timeout_secs: 30,
            extractor_retries: 3,
            cookie_file: None,
        }
    }
}

pub struct YtDlp {
    config: YtDlpConfig,
}

impl YtDlp {
    pub fn new(config: YtDlpConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.config.binary);
        command
            .arg("--no-warnings")
            .arg("--no-playlist")
            .arg("--user-agent")
            .arg(&self.config.user_agent)
            .arg("--socket-timeout")
            .arg(self.config.socket_timeout_secs.to_string())
            .arg("--extractor-retries")
            .arg(self.config.extractor_retries.to_string());
        if let Some(cookies) = &self.config.cookie_file {
            // a stale cookie path is not fatal
            if cookies.exists() {
                command.arg("--cookies").arg(cookies);
            } else {
                debug!("cookie file {} not found, continuing without", cookies.display());
            }
        }
        command.stdin(Stdio::null()).kill_on_drop(true);
        command
    }

    async fn dump_json(&self, url: &Url, format_id: Option<&str>) -> Result<YtDlpInfo, DownloadError> {
        let mut command = self.command();
        command.arg("--dump-single-json").arg("--no-download");
        if let Some(format_id) = format_id {
            command.arg("--format").arg(format_id);
        }
        command.arg("--").arg(url.as_str());

        debug!(%url, ?format_id, "querying yt-dlp metadata");
        let output = command.output().await.map_err(|e| spawn_error(&self.config.binary, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if let Some(format_id) = format_id {
                if stderr.contains(FORMAT_UNAVAILABLE_MARKER) {
                    return Err(DownloadError::FormatUnavailable(format_id.to_string()));
                }
            }
            return Err(DownloadError::Extraction(extractor_message(&stderr, output.status)));
        }

        parse_info(&output.stdout)
    }
}

#[async_trait]
impl Extractor for YtDlp {
    async fn check_available(&self) -> Result<(), DownloadError> {
        which::which(&self.config.binary)
            .map(|_| ())
            .map_err(|_| DownloadError::DependencyNotFound(self.config.binary.display().to_string()))
    }

    async fn probe(&self, url: &Url) -> Result<ProbeResult, DownloadError> {
        let info = self.dump_json(url, None).await?;
        info!(%url, formats = info.formats.len(), "probed media");
        Ok(ProbeResult {
            title: info.title.unwrap_or_default(),
            filesize: info.filesize.or(info.filesize_approx).map(|s| s as u64),
            formats: info.formats,
        })
    }

    async fn resolve_stream(
        &self,
        url: &Url,
        format_id: &str,
    ) -> Result<ResolvedStream, DownloadError> {
        let info = self.dump_json(url, Some(format_id)).await?;
        resolved_stream(&info, format_id)
    }

    async fn download_to_local_storage(
        &self,
        request: &DownloadRequest,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(&request.output_dir).await?;
        let template = request.output_dir.join("%(title)s.%(ext)s");
        let format = request.format_id.as_deref().unwrap_or(DEFAULT_FORMAT_SELECTOR);

        let mut command = self.command();
        command
            .arg("--format")
            .arg(format)
            .arg("--newline")
            .arg("--quiet")
            .arg("--progress")
            .arg("--progress-template")
            .arg(format!(
                "download:{PROGRESS_PREFIX}%(progress.downloaded_bytes)s|%(progress.total_bytes,progress.total_bytes_estimate)s"
            ))
            .arg("--print")
            .arg(format!("after_move:{FILEPATH_PREFIX}%(filepath)s"))
            .arg("--output")
            .arg(&template)
            .arg("--")
            .arg(request.url.as_str())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        info!(url = %request.url, format, "starting yt-dlp download");
        let mut child = command.spawn().map_err(|e| spawn_error(&self.config.binary, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DownloadError::Extraction("yt-dlp stdout unavailable".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DownloadError::Extraction("yt-dlp stderr unavailable".to_string()))?;
        let stderr_reader = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut final_path: Option<PathBuf> = None;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(url = %request.url, "download cancelled, stopping yt-dlp");
                    let _ = child.kill().await;
                    stderr_reader.abort();
                    return Err(DownloadError::Cancelled);
                }
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    if let Some(snapshot) = parse_progress_line(&line) {
                        progress.report(snapshot.0, snapshot.1);
                    } else if let Some(path) = line.strip_prefix(FILEPATH_PREFIX) {
                        final_path = Some(PathBuf::from(path.trim()));
                    } else if !line.trim().is_empty() {
                        debug!("yt-dlp: {}", line);
                    }
                }
            }
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                stderr_reader.abort();
                return Err(DownloadError::Cancelled);
            }
            status = child.wait() => status?,
        };
        let stderr = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            warn!(url = %request.url, %status, "yt-dlp download failed");
            return Err(DownloadError::Extraction(extractor_message(&stderr, status)));
        }

        // Mark the last snapshot as complete; merged outputs report per stream.
        let last = progress.current();
        if let Some(total) = last.bytes_total {
            progress.report(total, Some(total));
        }

        final_path.ok_or_else(|| {
            DownloadError::Extraction("yt-dlp finished without reporting a file".to_string())
        })
    }
}

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    ext: Option<String>,
    url: Option<String>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
    #[serde(default)]
    formats: Vec<RawFormatDescriptor>,
    #[serde(default)]
    requested_formats: Vec<RequestedFormat>,
}

#[derive(Debug, Deserialize)]
struct RequestedFormat {
    url: Option<String>,
    ext: Option<String>,
}

impl YtDlpInfo {
    /// The one URL serving the whole selection and that stream's extension
    ///
    /// Merged selections list one entry per stream in `requested_formats` and
    /// have no URL that carries both, so they are refused.
    fn direct_stream(&self, format_id: &str) -> Result<(String, String), DownloadError> {
        if self.requested_formats.len() > 1 {
            return Err(DownloadError::NoDirectUrl(format_id.to_string()));
        }
        let container = || self.ext.clone().unwrap_or_else(|| "mp4".to_string());

        if let Some(url) = &self.url {
            return Ok((url.clone(), container()));
        }
        self.requested_formats
            .first()
            .and_then(|stream| {
                let url = stream.url.clone()?;
                Some((url, stream.ext.clone().unwrap_or_else(container)))
            })
            .ok_or_else(|| DownloadError::FormatUnavailable(format_id.to_string()))
    }
}

fn resolved_stream(info: &YtDlpInfo, format_id: &str) -> Result<ResolvedStream, DownloadError> {
    let (direct_media_url, extension) = info.direct_stream(format_id)?;
    Ok(ResolvedStream {
        direct_media_url,
        suggested_filename: suggested_filename(
            info.title.as_deref().unwrap_or_default(),
            &extension,
        ),
    })
}

fn parse_info(stdout: &[u8]) -> Result<YtDlpInfo, DownloadError> {
    let value: Option<YtDlpInfo> = serde_json::from_slice(stdout)
        .map_err(|e| DownloadError::Extraction(format!("unreadable extractor output: {e}")))?;
    value.ok_or_else(|| DownloadError::Extraction("could not retrieve video information".to_string()))
}

/// `DOWNLOAD|<done>|<total>` as emitted by our progress template; `NA` means unknown
fn parse_progress_line(line: &str) -> Option<(u64, Option<u64>)> {
    let rest = line.trim().strip_prefix(PROGRESS_PREFIX)?;
    let (done, total) = rest.split_once('|')?;
    let done = parse_byte_field(done)?;
    let total = parse_byte_field(total).filter(|t| *t > 0);
    Some((done, total))
}

fn parse_byte_field(field: &str) -> Option<u64> {
    let value: f64 = field.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}

/// Last `ERROR:` line from stderr, or the whole stderr, or the exit status
fn extractor_message(stderr: &str, status: std::process::ExitStatus) -> String {
    let stderr = stderr.trim();
    stderr
        .lines()
        .rev()
        .find(|line| line.starts_with("ERROR:"))
        .map(|line| line.trim().to_string())
        .or_else(|| (!stderr.is_empty()).then(|| stderr.to_string()))
        .unwrap_or_else(|| format!("yt-dlp exited with status: {status}"))
}

fn spawn_error(binary: &Path, error: std::io::Error) -> DownloadError {
    if error.kind() == std::io::ErrorKind::NotFound {
        DownloadError::DependencyNotFound(binary.display().to_string())
    } else {
        DownloadError::IoError(error)
    }
}
