//! In-process event bus.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::error::{TransportError, TransportResult};
use super::transport::{EventBus, EventConnection, MessageStream};

const CAPACITY: usize = 64;

#[derive(Debug, Clone)]
struct Published {
    channel: String,
    payload: Vec<u8>,
}

/// Broadcast bus shared by every connection, like one Redis server.
///
/// A subscription only sees messages published after its `subscribe`
/// call; anything published while a connection is open but not yet
/// subscribed is dropped.
#[derive(Debug)]
pub struct MemoryEventBus {
    sender: Arc<Mutex<Option<broadcast::Sender<Published>>>>,
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CAPACITY);
        Self {
            sender: Arc::new(Mutex::new(Some(sender))),
        }
    }

    /// Publish a payload; returns the number of subscriptions that saw it.
    pub fn publish(&self, channel: &str, payload: impl Into<Vec<u8>>) -> usize {
        let sender = lock(&self.sender);
        let Some(sender) = sender.as_ref() else {
            return 0;
        };
        sender
            .send(Published {
                channel: channel.to_string(),
                payload: payload.into(),
            })
            .unwrap_or(0)
    }

    /// Number of open subscriptions across all channels.
    pub fn subscriptions(&self) -> usize {
        lock(&self.sender)
            .as_ref()
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Shut the bus down. Open subscriptions end and new connections fail.
    pub fn close(&self) {
        lock(&self.sender).take();
    }
}

fn lock(
    sender: &Mutex<Option<broadcast::Sender<Published>>>,
) -> MutexGuard<'_, Option<broadcast::Sender<Published>>> {
    sender
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn connect(&self) -> TransportResult<Box<dyn EventConnection>> {
        if lock(&self.sender).is_none() {
            return Err(TransportError::Connect {
                url: "memory://".to_string(),
                message: "bus is closed".to_string(),
            });
        }
        Ok(Box::new(MemoryConnection {
            sender: Arc::clone(&self.sender),
        }))
    }
}

struct MemoryConnection {
    sender: Arc<Mutex<Option<broadcast::Sender<Published>>>>,
}

#[async_trait]
impl EventConnection for MemoryConnection {
    async fn subscribe(self: Box<Self>, channel: &str) -> TransportResult<MessageStream> {
        let receiver = lock(&self.sender)
            .as_ref()
            .map(broadcast::Sender::subscribe)
            .ok_or_else(|| TransportError::Subscribe {
                channel: channel.to_string(),
                message: "bus is closed".to_string(),
            })?;

        let channel = channel.to_string();
        let stream = futures::stream::unfold(receiver, move |mut receiver| {
            let channel = channel.clone();
            async move {
                loop {
                    match receiver.recv().await {
                        Ok(published) if published.channel == channel => {
                            return Some((Ok(published.payload), receiver));
                        }
                        Ok(_) => continue,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(%channel, skipped, "subscriber lagged; messages dropped");
                            let err = TransportError::Receive {
                                channel: channel.clone(),
                                message: format!("{skipped} messages dropped"),
                            };
                            return Some((Err(err), receiver));
                        }
                        Err(RecvError::Closed) => return None,
                    }
                }
            }
        });
        Ok(stream.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_filters_by_channel() {
        let bus = MemoryEventBus::new();
        let mut stream = bus.connect().await.unwrap().subscribe("a").await.unwrap();

        assert_eq!(bus.subscriptions(), 1);
        assert_eq!(bus.publish("b", "other"), 1);
        assert_eq!(bus.publish("a", "mine"), 1);

        assert_eq!(stream.next().await.unwrap().unwrap(), b"mine".to_vec());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_reports_receive_error() {
        let bus = MemoryEventBus::new();
        let mut stream = bus.connect().await.unwrap().subscribe("a").await.unwrap();

        for _ in 0..CAPACITY + 1 {
            bus.publish("a", "flood");
        }

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, TransportError::Receive { channel, .. } if channel == "a"));
    }

    #[tokio::test]
    async fn test_messages_before_subscribe_are_dropped() {
        let bus = MemoryEventBus::new();
        let connection = bus.connect().await.unwrap();

        assert_eq!(bus.publish("a", "early"), 0);
        let mut stream = connection.subscribe("a").await.unwrap();
        bus.publish("a", "late");

        assert_eq!(stream.next().await.unwrap().unwrap(), b"late".to_vec());
    }

    #[tokio::test]
    async fn test_subscribe_after_close_fails() {
        let bus = MemoryEventBus::new();
        let connection = bus.connect().await.unwrap();
        bus.close();

        let err = connection.subscribe("a").await.err().unwrap();
        assert!(matches!(err, TransportError::Subscribe { channel, .. } if channel == "a"));
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let bus = MemoryEventBus::new();
        let mut stream = bus.connect().await.unwrap().subscribe("a").await.unwrap();
        bus.close();

        assert!(stream.next().await.is_none());
        assert!(bus.connect().await.is_err());
        assert_eq!(bus.publish("a", "late"), 0);
    }
}
