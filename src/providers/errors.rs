//! Error types for the external solution providers.
//!
//! Both enums are `Clone` because a single provider failure is handed to every
//! caller waiting on the same in-flight resolution.

/// Failure of the AI text-generation provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationError {
    #[error("AI provider is not configured")]
    NotConfigured,
    #[error("AI provider timed out")]
    Timeout,
    #[error("AI provider quota exhausted")]
    QuotaExhausted,
    #[error("AI provider returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("AI provider response was malformed: {0}")]
    Malformed(String),
    #[error("AI provider request failed: {0}")]
    Request(String),
}

impl GenerationError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// Failure of the video-search provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SearchError {
    #[error("video search is not configured")]
    NotConfigured,
    #[error("video search timed out")]
    Timeout,
    #[error("video search quota exhausted")]
    QuotaExhausted,
    #[error("video search returned status {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("video search response was malformed: {0}")]
    Malformed(String),
    #[error("video search request failed: {0}")]
    Request(String),
}

impl SearchError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}
