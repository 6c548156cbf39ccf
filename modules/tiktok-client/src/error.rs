use thiserror::Error;

pub type Result<T> = std::result::Result<T, TikTokError>;

#[derive(Debug, Error)]
pub enum TikTokError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl TikTokError {
    /// True for upstream throttling (HTTP 429).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, TikTokError::Api { status: 429, .. })
    }
}

impl From<reqwest::Error> for TikTokError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return TikTokError::Parse(err.to_string());
        }
        TikTokError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for TikTokError {
    fn from(err: serde_json::Error) -> Self {
        TikTokError::Parse(err.to_string())
    }
}

impl From<url::ParseError> for TikTokError {
    fn from(err: url::ParseError) -> Self {
        TikTokError::Parse(err.to_string())
    }
}
