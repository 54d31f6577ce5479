use std::collections::HashMap;

use tracing::debug;

use crate::descriptor::RawFormatDescriptor;
use crate::error::SelectionError;
use crate::quality::{quality_label_for_height, QualityOption};

/// Build the ranked, one-per-label quality list for an extractor listing.
///
/// Split video tracks are paired with the highest-bitrate audio-only track.
/// When that yields nothing, pre-muxed streams are offered under their own id.
/// Within a label the larger known size wins; equal sizes keep the earlier
/// candidate. The result is ordered by height, highest first.
pub fn select_qualities(
    raw_formats: &[RawFormatDescriptor],
) -> Result<Vec<QualityOption>, SelectionError> {
    let mut table = QualityTable::default();

    if let Some(best_audio) = best_audio_track(raw_formats) {
        debug!(
            format_id = %best_audio.format_id,
            bitrate = best_audio.bitrate(),
            "pairing video tracks with best audio"
        );
        for video in raw_formats.iter().filter(|f| f.has_video()) {
            let Some(height) = video.known_height() else {
                continue;
            };
            table.offer(QualityOption {
                quality_label: quality_label_for_height(height),
                combined_format_id: format!("{}+{}", video.format_id, best_audio.format_id),
                filesize_bytes: video.best_known_size(),
                height,
                video_codec: video.video_codec().to_string(),
                audio_codec: best_audio.audio_codec().to_string(),
                extension: video.extension.clone(),
                fps: video.fps.unwrap_or(0.0),
                average_bitrate: video.bitrate(),
            });
        }
    }

    if table.is_empty() {
        debug!("no split pairing available, trying pre-muxed formats");
        for muxed in raw_formats.iter().filter(|f| f.has_video() && f.has_audio()) {
            let Some(height) = muxed.known_height() else {
                continue;
            };
            table.offer(QualityOption {
                quality_label: quality_label_for_height(height),
                combined_format_id: muxed.format_id.clone(),
                filesize_bytes: muxed.best_known_size(),
                height,
                video_codec: muxed.video_codec().to_string(),
                audio_codec: muxed.audio_codec().to_string(),
                extension: muxed.extension.clone(),
                fps: muxed.fps.unwrap_or(0.0),
                average_bitrate: muxed.bitrate(),
            });
        }
    }

    if table.is_empty() {
        return Err(SelectionError::NoUsableFormat);
    }

    Ok(table.into_ranked())
}

/// First audio-only track with the maximal bitrate (missing bitrate counts as 0)
fn best_audio_track(raw_formats: &[RawFormatDescriptor]) -> Option<&RawFormatDescriptor> {
    let mut best: Option<&RawFormatDescriptor> = None;
    for candidate in raw_formats.iter().filter(|f| f.is_audio_only()) {
        if best.map_or(true, |current| candidate.bitrate() > current.bitrate()) {
            best = Some(candidate);
        }
    }
    best
}

/// Working set keyed by quality label, remembering first-insertion order
#[derive(Default)]
struct QualityTable {
    slots: HashMap<String, usize>,
    options: Vec<QualityOption>,
}

impl QualityTable {
    fn offer(&mut self, candidate: QualityOption) {
        match self.slots.get(&candidate.quality_label) {
            Some(&index) => {
                let current = &mut self.options[index];
                if candidate.filesize_bytes > current.filesize_bytes {
                    debug!(
                        label = %candidate.quality_label,
                        replaced = %current.combined_format_id,
                        by = %candidate.combined_format_id,
                        "larger track replaces quality entry"
                    );
                    *current = candidate;
                }
            }
            None => {
                self.slots
                    .insert(candidate.quality_label.clone(), self.options.len());
                self.options.push(candidate);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    fn into_ranked(self) -> Vec<QualityOption> {
        let mut options = self.options;
        // Stable: equal heights keep first-insertion order.
        options.sort_by(|a, b| b.height.cmp(&a.height));
        options
    }
}
