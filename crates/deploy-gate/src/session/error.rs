//! Session store error types.

use thiserror::Error;

/// Result type for session store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while persisting sessions.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store was unreachable or refused the write.
    #[error("store write failed for {deploy_id}: {message}")]
    Write { deploy_id: String, message: String },

    /// A session with this id already exists.
    #[error("store write rejected for {0}: session already exists")]
    AlreadyExists(String),

    /// No session with this id.
    #[error("unknown deployment session: {0}")]
    UnknownKey(String),

    /// Reading a record failed.
    #[error("store read failed for {deploy_id}: {message}")]
    Read { deploy_id: String, message: String },

    /// A stored record could not be decoded.
    #[error("invalid session record {deploy_id}: {message}")]
    InvalidRecord { deploy_id: String, message: String },
}

impl StoreError {
    /// Whether the failure was a rejected or failed write.
    pub fn is_write_error(&self) -> bool {
        matches!(self, StoreError::Write { .. } | StoreError::AlreadyExists(_))
    }

    /// Transport-level failures may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Write { .. } | StoreError::Read { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::UnknownKey("abc".to_string());
        assert_eq!(err.to_string(), "unknown deployment session: abc");
    }

    #[test]
    fn test_duplicate_is_write_error_but_not_retryable() {
        let err = StoreError::AlreadyExists("abc".to_string());
        assert!(err.is_write_error());
        assert!(!err.is_retryable());
    }
}
