use reqwest::StatusCode;
use thiserror::Error;

/// Failures talking to the mail/TTS backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The configured base URL (or a URL derived from it) does not parse.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Transport-level failure: connect, timeout, broken body stream.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("server returned {status} for {url}")]
    Server { status: StatusCode, url: String },

    /// The body was not the expected JSON shape.
    #[error("malformed response body: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
