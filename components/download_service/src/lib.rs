//! The download coordinator shared by the web and terminal front ends
//!
//! [`DownloadService`] ties the extractor, the quality selector and the record
//! store together. Front ends build one in `main`, wrap it in an `Arc` and
//! call it from handlers; `shutdown` cancels whatever is still running.
//!
//! Every operation returns [`ServiceError`], so front ends decide how each
//! failure kind is shown.
mod error;
mod service;

pub use error::ServiceError;
pub use service::{DownloadService, DownloadTicket, QualityListing};

pub use download_records::{DownloadRecord, DownloadStatus, RecordId, RecordStore};
pub use format_selector::QualityOption;
pub use media_downloader::{DownloadMonitor, ResolvedStream};
