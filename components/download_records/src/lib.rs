//! Bookkeeping for local downloads
//!
//! One [`DownloadRecord`] per download started from a front end, kept in a
//! single JSON file. There is no recovery: a record left in `downloading`
//! after a crash simply stays that way.
mod error;
mod record;
mod store;

pub use error::StoreError;
pub use record::{DownloadRecord, DownloadStatus, RecordId};
pub use store::{RecordStore, RECORDS_FILE_NAME};
