use serde::{Deserialize, Deserializer, Serialize};

/// Codec sentinel the extractor uses for "this track has no such stream"
pub const NO_CODEC: &str = "none";

const DEFAULT_EXTENSION: &str = "mp4";

/// One stream variant as reported by the extractor.
///
/// Field names follow the extractor's JSON (`vcodec`, `acodec`, `tbr`, ...).
/// Absent codecs are read as [`NO_CODEC`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFormatDescriptor {
    pub format_id: String,

    #[serde(rename = "vcodec", default)]
    pub video_codec: Option<String>,

    #[serde(rename = "acodec", default)]
    pub audio_codec: Option<String>,

    /// Pixel height; absent or zero means no known resolution
    #[serde(default)]
    pub height: Option<u32>,

    #[serde(default, deserialize_with = "lenient_byte_count")]
    pub filesize: Option<u64>,

    #[serde(
        rename = "filesize_approx",
        default,
        deserialize_with = "lenient_byte_count"
    )]
    pub approximate_filesize: Option<u64>,

    /// Average bitrate in kbit/s
    #[serde(rename = "tbr", default)]
    pub average_bitrate: Option<f64>,

    #[serde(default)]
    pub fps: Option<f64>,

    #[serde(rename = "ext", default = "default_extension")]
    pub extension: String,
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}

// Sizes occasionally arrive as floats (estimates), never negative in practice.
fn lenient_byte_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n.round() as u64))
}

impl RawFormatDescriptor {
    /// A descriptor with no streams; use the `with_*` builders to fill it in
    pub fn new(format_id: impl Into<String>) -> Self {
        Self {
            format_id: format_id.into(),
            video_codec: None,
            audio_codec: None,
            height: None,
            filesize: None,
            approximate_filesize: None,
            average_bitrate: None,
            fps: None,
            extension: default_extension(),
        }
    }

    pub fn with_video(mut self, codec: impl Into<String>, height: u32) -> Self {
        self.video_codec = Some(codec.into());
        self.height = Some(height);
        self
    }

    pub fn with_audio(mut self, codec: impl Into<String>) -> Self {
        self.audio_codec = Some(codec.into());
        self
    }

    pub fn with_filesize(mut self, bytes: u64) -> Self {
        self.filesize = Some(bytes);
        self
    }

    pub fn with_approximate_filesize(mut self, bytes: u64) -> Self {
        self.approximate_filesize = Some(bytes);
        self
    }

    pub fn with_bitrate(mut self, kbps: f64) -> Self {
        self.average_bitrate = Some(kbps);
        self
    }

    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn video_codec(&self) -> &str {
        self.video_codec.as_deref().unwrap_or(NO_CODEC)
    }

    pub fn audio_codec(&self) -> &str {
        self.audio_codec.as_deref().unwrap_or(NO_CODEC)
    }

    pub fn has_video(&self) -> bool {
        self.video_codec() != NO_CODEC
    }

    pub fn has_audio(&self) -> bool {
        self.audio_codec() != NO_CODEC
    }

    pub fn is_audio_only(&self) -> bool {
        self.has_audio() && !self.has_video()
    }

    /// Height if present and positive
    pub fn known_height(&self) -> Option<u32> {
        self.height.filter(|h| *h > 0)
    }

    /// Exact size, else the estimate, else 0
    pub fn best_known_size(&self) -> u64 {
        self.filesize
            .filter(|s| *s > 0)
            .or(self.approximate_filesize)
            .unwrap_or(0)
    }

    pub fn bitrate(&self) -> f64 {
        self.average_bitrate.unwrap_or(0.0)
    }
}
