//! Pub/sub transport abstraction.

use async_trait::async_trait;
use futures::stream::BoxStream;

use super::error::TransportResult;

/// Raw payloads delivered on one channel. The stream ends when the
/// connection is lost; an `Err` item means messages may have been dropped.
pub type MessageStream = BoxStream<'static, TransportResult<Vec<u8>>>;

/// A pub/sub service the gate can connect to.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Open a connection dedicated to one subscription.
    async fn connect(&self) -> TransportResult<Box<dyn EventConnection>>;
}

/// An open connection that has not subscribed yet.
#[async_trait]
pub trait EventConnection: Send {
    /// Subscribe to `channel`. Dropping the returned stream unsubscribes and
    /// closes the connection.
    async fn subscribe(self: Box<Self>, channel: &str) -> TransportResult<MessageStream>;
}
