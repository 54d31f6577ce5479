use serde::{Deserialize, Serialize};
use storage_primitives::ByteSize;

/// User-facing bucket name for a pixel height.
///
/// 2160 and 1440 get their marketing names, everything else is `"{h}p"`.
pub fn quality_label_for_height(height: u32) -> String {
    match height {
        2160 => "4K".to_string(),
        1440 => "2K".to_string(),
        h => format!("{h}p"),
    }
}

/// One selectable quality, ready for display and re-submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityOption {
    pub quality_label: String,

    /// `"<video>+<audio>"` for split streams, the plain id for pre-muxed ones
    pub combined_format_id: String,

    /// Best known size of the video track, 0 when unknown
    pub filesize_bytes: u64,

    pub height: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub extension: String,
    pub fps: f64,
    pub average_bitrate: f64,
}

impl QualityOption {
    pub fn filesize(&self) -> ByteSize {
        ByteSize::new(self.filesize_bytes)
    }

    /// Single-line summary, e.g. `1080p (mp4) - 500.0 MB`
    pub fn display_line(&self) -> String {
        format!(
            "{} ({}) - {}",
            self.quality_label,
            self.extension,
            self.filesize().megabytes_label()
        )
    }

    /// Codec, frame rate and bitrate lines for a detail pane.
    ///
    /// Frame rate and bitrate are omitted when the extractor did not report them.
    pub fn detail_lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Video codec: {}", self.video_codec),
            format!("Audio codec: {}", self.audio_codec),
        ];
        if self.fps > 0.0 {
            lines.push(format!("FPS: {}", self.fps));
        }
        if self.average_bitrate > 0.0 {
            lines.push(format!("Bitrate: {:.1}kbps", self.average_bitrate));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn option(fps: f64, tbr: f64) -> QualityOption {
        QualityOption {
            quality_label: "720p".to_string(),
            combined_format_id: "136+140".to_string(),
            filesize_bytes: 314_572_800,
            height: 720,
            video_codec: "avc1.4d401f".to_string(),
            audio_codec: "mp4a.40.2".to_string(),
            extension: "mp4".to_string(),
            fps,
            average_bitrate: tbr,
        }
    }

    #[rstest]
    #[case(2160, "4K")]
    #[case(1440, "2K")]
    #[case(1080, "1080p")]
    #[case(720, "720p")]
    #[case(480, "480p")]
    #[case(360, "360p")]
    #[case(240, "240p")]
    #[case(144, "144p")]
    #[case(1920, "1920p")]
    #[case(4320, "4320p")]
    #[case(1, "1p")]
    fn height_maps_to_label(#[case] height: u32, #[case] expected: &str) {
        assert_eq!(quality_label_for_height(height), expected);
    }

    #[test]
    fn display_line_renders_megabytes() {
        assert_eq!(option(30.0, 0.0).display_line(), "720p (mp4) - 300.0 MB");
    }

    #[test]
    fn detail_lines_include_rate_information_when_known() {
        let lines = option(30.0, 1250.26).detail_lines();
        assert_eq!(
            lines,
            vec![
                "Video codec: avc1.4d401f",
                "Audio codec: mp4a.40.2",
                "FPS: 30",
                "Bitrate: 1250.3kbps",
            ]
        );
    }

    #[test]
    fn detail_lines_skip_unknown_rates() {
        let lines = option(0.0, 0.0).detail_lines();
        assert_eq!(lines.len(), 2);
    }
}
