//! Notification error types.

use thiserror::Error;

/// Result type for notification operations.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Errors that can occur while posting a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Slack answered with a non-success HTTP status.
    #[error("Slack returned HTTP {status}")]
    HttpStatus { status: u16 },

    /// Slack answered `ok: false`.
    #[error("Slack API error: {0}")]
    Api(String),

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

impl NotifyError {
    /// Transport failures, throttling and server errors may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            NotifyError::RequestFailed(err) => err.is_timeout() || err.is_connect(),
            NotifyError::HttpStatus { status } => *status == 429 || *status >= 500,
            NotifyError::Api(code) => code == "ratelimited",
            NotifyError::ParseError(_) => false,
        }
    }
}
