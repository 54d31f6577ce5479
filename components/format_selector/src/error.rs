use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no suitable video format found")]
    NoUsableFormat,
}
