//! Event transport error types.

use thiserror::Error;

/// Result type for event transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur on the event transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Could not open a connection.
    #[error("Failed to connect to {url}: {message}")]
    Connect { url: String, message: String },

    /// The subscribe command failed.
    #[error("Failed to subscribe to channel {channel}: {message}")]
    Subscribe { channel: String, message: String },

    /// The transport could not deliver every message on the channel.
    #[error("Failed to receive on channel {channel}: {message}")]
    Receive { channel: String, message: String },

    /// The message stream ended before a decision arrived.
    #[error("subscription to channel {channel} closed before a decision arrived")]
    Closed { channel: String },
}
