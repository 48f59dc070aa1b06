use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Invalid number. Please enter a new time in minutes.")]
    InvalidBudget,

    #[error("{0}")]
    InvalidPromptTime(String),

    #[error("invalid recurring interval '{0}' (expected never, daily, weekly, monthly or 0-3)")]
    InvalidInterval(String),

    #[error("invalid date '{0}', use YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time '{0}', use HH:MM")]
    InvalidTime(String),

    #[error("title must not be empty")]
    EmptyTitle,

    #[error("time cost must be a positive number of minutes")]
    InvalidTimeCost,

    #[error("a due date is required when the task recurs")]
    MissingAnchor,

    #[error("task {0} not found")]
    TaskNotFound(u64),

    #[error("task store unavailable at {path}: {source}")]
    StoreUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("task store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode JSON: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("console I/O failed: {0}")]
    Console(#[source] std::io::Error),

    #[error("transaction aborted at task {id}: {reason}")]
    TransactionAborted { id: u64, reason: String },

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T, E = TrackerError> = std::result::Result<T, E>;
