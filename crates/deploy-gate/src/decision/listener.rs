//! Waiting for the decision on one deployment.

use deploy_gate_protocol::{DecisionEvent, ProtocolError, channel_for};
use futures::StreamExt;
use tracing::{debug, info, warn};

use super::error::{TransportError, TransportResult};
use super::transport::{EventBus, EventConnection, MessageStream};

/// Classification of one inbound payload.
#[derive(Debug)]
pub enum Screened {
    /// A valid decision for the awaited deployment.
    Matched(DecisionEvent),
    /// A valid decision for some other deployment.
    Mismatched(DecisionEvent),
    /// Not a decision event.
    Malformed(ProtocolError),
}

/// Decode a payload and check it against the awaited deploy id.
pub fn screen(deploy_id: &str, payload: &[u8]) -> Screened {
    match DecisionEvent::decode(payload) {
        Ok(event) if event.deployment_id == deploy_id => Screened::Matched(event),
        Ok(event) => Screened::Mismatched(event),
        Err(err) => Screened::Malformed(err),
    }
}

/// Connected listener that has not subscribed yet.
pub struct DecisionListener {
    connection: Box<dyn EventConnection>,
}

impl DecisionListener {
    /// Connect to the event transport.
    pub async fn connect(bus: &dyn EventBus) -> TransportResult<Self> {
        let connection = bus.connect().await?;
        Ok(Self { connection })
    }

    /// Subscribe to the deployment's channel.
    pub async fn subscribe(self, deploy_id: &str) -> TransportResult<PendingDecision> {
        let channel = channel_for(deploy_id);
        let messages = self.connection.subscribe(channel).await?;
        info!(deploy_id, "subscribed to decision channel");
        Ok(PendingDecision {
            deploy_id: deploy_id.to_string(),
            messages,
            skipped: 0,
        })
    }

    /// Subscribe and wait for the deployment's decision.
    pub async fn await_decision(self, deploy_id: &str) -> TransportResult<DecisionEvent> {
        self.subscribe(deploy_id).await?.wait().await
    }
}

/// An open subscription awaiting its decision.
pub struct PendingDecision {
    deploy_id: String,
    messages: MessageStream,
    skipped: usize,
}

impl PendingDecision {
    pub fn deploy_id(&self) -> &str {
        &self.deploy_id
    }

    /// Wait for the first valid decision naming this deployment.
    ///
    /// Consumes the subscription, so no later message is processed.
    pub async fn wait(mut self) -> TransportResult<DecisionEvent> {
        while let Some(item) = self.messages.next().await {
            let payload = item?;
            match screen(&self.deploy_id, &payload) {
                Screened::Matched(event) => {
                    info!(
                        deploy_id = %self.deploy_id,
                        status = %event.approval_status,
                        skipped = self.skipped,
                        "decision received"
                    );
                    return Ok(event);
                }
                Screened::Mismatched(event) => {
                    self.skipped += 1;
                    debug!(
                        deploy_id = %self.deploy_id,
                        other = %event.deployment_id,
                        "ignoring decision for another deployment"
                    );
                }
                Screened::Malformed(err) => {
                    self.skipped += 1;
                    warn!(deploy_id = %self.deploy_id, error = %err, "discarding malformed decision payload");
                }
            }
        }

        Err(TransportError::Closed {
            channel: self.deploy_id,
        })
    }
}
