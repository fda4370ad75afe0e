use std::io;
use thiserror::Error;

/// Rejection reasons for blocked-site input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SiteError {
    #[error("{0} is already blocked")]
    AlreadyBlocked(String),

    #[error("invalid domain format: {0:?} (e.g. example.com)")]
    InvalidDomain(String),
}

impl SiteError {
    pub fn kind(&self) -> &'static str {
        match self {
            SiteError::AlreadyBlocked(_) => "alreadyBlocked",
            SiteError::InvalidDomain(_) => "invalidDomain",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} duration must be at least 1 minute")]
    ZeroDuration(&'static str),

    #[error("daily goal must be at least 1 session")]
    ZeroGoal,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures delivering a blocking payload to the enforcement side.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("no enforcement client is connected")]
    Unavailable,

    #[error("enforcement channel closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notifications are not supported here")]
    Unsupported,

    #[error("notification failed: {0}")]
    Failed(String),
}

#[derive(Error, Debug)]
pub enum CueError {
    #[error("audio playback is not supported here")]
    Unsupported,

    #[error("audio playback failed: {0}")]
    Failed(String),
}
