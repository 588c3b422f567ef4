//! Redis pub/sub transport.

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use super::error::{TransportError, TransportResult};
use super::transport::{EventBus, EventConnection, MessageStream};
use crate::config::GateConfig;

/// Event bus backed by Redis `SUBSCRIBE`.
#[derive(Debug, Clone)]
pub struct RedisEventBus {
    client: redis::Client,
    url: String,
}

impl RedisEventBus {
    /// Create a bus for a `redis://` or `rediss://` URL. No connection is
    /// opened until [`EventBus::connect`].
    pub fn new(url: impl Into<String>) -> TransportResult<Self> {
        let url = url.into();
        let client = redis::Client::open(url.as_str()).map_err(|e| TransportError::Connect {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(Self { client, url })
    }

    pub fn from_config(config: &GateConfig) -> TransportResult<Self> {
        Self::new(config.redis_url())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EventBus for RedisEventBus {
    async fn connect(&self) -> TransportResult<Box<dyn EventConnection>> {
        let pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(|e| TransportError::Connect {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        debug!(url = %self.url, "redis pub/sub connection open");
        Ok(Box::new(RedisConnection { pubsub }))
    }
}

struct RedisConnection {
    pubsub: redis::aio::PubSub,
}

#[async_trait]
impl EventConnection for RedisConnection {
    async fn subscribe(self: Box<Self>, channel: &str) -> TransportResult<MessageStream> {
        let mut pubsub = self.pubsub;
        pubsub
            .subscribe(channel)
            .await
            .map_err(|e| TransportError::Subscribe {
                channel: channel.to_string(),
                message: e.to_string(),
            })?;

        let messages = pubsub
            .into_on_message()
            .map(|msg| Ok(msg.get_payload_bytes().to_vec()));
        Ok(messages.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_creation() {
        let bus = RedisEventBus::new("redis://localhost:6379").unwrap();
        assert_eq!(bus.url(), "redis://localhost:6379");
    }

    #[test]
    fn test_invalid_url() {
        let err = RedisEventBus::new("http://localhost:6379").unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
