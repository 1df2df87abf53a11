use crate::config::ConfigError;
use thiserror::Error;

/// Platform status codes that signal rate limiting or temporary unavailability
pub const TRANSIENT_STATUS_CODES: [u16; 2] = [403, 503];

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Request failed: retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("Bot run cancelled")]
    Cancelled,

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Request failed with status {status}: {message}")]
    Request { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid platform URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

/// How the retry loop should react to a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rate limited or temporarily unavailable: back off, then retry
    Transient,
    /// Connection-level failure: retry immediately
    Transport,
    /// Anything else aborts the run
    Fatal,
}

/// Error recovery strategies for failed bot attempts
pub struct ErrorRecovery;

impl ErrorRecovery {
    /// Classify an error for the retry loop
    pub fn classify(error: &BotError) -> FailureKind {
        match error {
            BotError::Platform(PlatformError::Request { status, .. }) => {
                if Self::is_transient_status(*status) {
                    FailureKind::Transient
                } else {
                    FailureKind::Fatal
                }
            }
            BotError::Platform(PlatformError::Transport(_)) => FailureKind::Transport,
            _ => FailureKind::Fatal,
        }
    }

    pub fn is_transient_status(status: u16) -> bool {
        TRANSIENT_STATUS_CODES.contains(&status)
    }

    /// Errors after which the process should exit non-zero
    pub fn should_shutdown(error: &BotError) -> bool {
        !matches!(error, BotError::Cancelled)
    }
}
