/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Failure of a single external call. Isolated to the caller that made it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// Network failure, throttling or a non-success status.
    #[error("Transient fetch failure: {0}")]
    Transient(String),

    /// The payload did not have the expected shape.
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl From<tiktok_client::TikTokError> for FetchError {
    fn from(err: tiktok_client::TikTokError) -> Self {
        if err.is_rate_limited() {
            return FetchError::Transient(format!("Rate limited: {err}"));
        }
        match err {
            tiktok_client::TikTokError::Parse(msg) => FetchError::Malformed(msg),
            other => FetchError::Transient(other.to_string()),
        }
    }
}

/// Failures that abort a whole pass, refresh or command.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Registration rejected: {0}")]
    Registration(String),
}

impl From<reelwatch_common::ReelwatchError> for IngestError {
    fn from(err: reelwatch_common::ReelwatchError) -> Self {
        IngestError::Configuration(err.to_string())
    }
}
