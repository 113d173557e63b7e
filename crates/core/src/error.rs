use thiserror::Error;

/// Error kinds shared across the workspace.
///
/// `Configuration` and `Dispatch` are terminal for a single firing and are
/// recorded in the execution history; `TriggerNotFound` surfaces
/// synchronously to callers of manual operations and never writes a record.
#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("trigger not found: {0}")]
    TriggerNotFound(i64),

    #[error("notification dispatch failed: {0}")]
    Dispatch(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, Error>;
