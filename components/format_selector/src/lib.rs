//! Quality selection over extractor format listings
//!
//! The extractor reports every stream variant it can fetch: video-only tracks,
//! audio-only tracks and pre-muxed streams. This component turns that listing
//! into one user-facing option per resolution bucket, each paired with the
//! best audio track.
//!
//! ```
//! use format_selector::{select_qualities, RawFormatDescriptor};
//!
//! let formats = vec![
//!     RawFormatDescriptor::new("137").with_video("avc1", 1080).with_filesize(500),
//!     RawFormatDescriptor::new("140").with_audio("mp4a.40.2").with_bitrate(128.0),
//! ];
//!
//! let options = select_qualities(&formats)?;
//! assert_eq!(options[0].quality_label, "1080p");
//! assert_eq!(options[0].combined_format_id, "137+140");
//! # Ok::<(), format_selector::SelectionError>(())
//! ```
mod descriptor;
mod error;
mod quality;
mod selector;

pub use descriptor::{RawFormatDescriptor, NO_CODEC};
pub use error::SelectionError;
pub use quality::{quality_label_for_height, QualityOption};
pub use selector::select_qualities;
