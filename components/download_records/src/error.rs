use std::path::PathBuf;
use thiserror::Error;

use crate::record::RecordId;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to {operation} record file {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("record file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("no download record with id {0}")]
    NotFound(RecordId),

    #[error("record write did not finish: {0}")]
    WriteAborted(String),
}

impl StoreError {
    pub fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
