// components/media_downloader/src/utils.rs
use url::Url;

use crate::types::DownloadError;

const FALLBACK_TITLE: &str = "video";

/// Parse a user-supplied media URL; only http(s) is accepted
pub fn parse_media_url(raw: &str) -> Result<Url, DownloadError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DownloadError::InvalidUrl("URL is required".to_string()));
    }

    let url = Url::parse(trimmed).map_err(|e| DownloadError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DownloadError::InvalidUrl(format!(
            "unsupported scheme '{other}'"
        ))),
    }
}

/// `"{title}.{ext}"`, made safe for every filesystem
pub fn suggested_filename(title: &str, extension: &str) -> String {
    let title = title.trim();
    let title = if title.is_empty() { FALLBACK_TITLE } else { title };
    sanitize_filename::sanitize(format!("{title}.{extension}"))
}
