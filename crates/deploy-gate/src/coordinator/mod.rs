//! Approval coordinator.
//!
//! Drives one deployment through the gate: record the session, announce it,
//! wait for the decision, persist the verdict, and hand a typed outcome back
//! to the caller.

mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

pub use state::GateState;

use crate::config::GateConfig;
use crate::decision::{DecisionEvent, DecisionListener, EventBus, PendingDecision, RedisEventBus};
use crate::error::GateError;
use crate::notify::{Notifier, NotifyError, SlackNotifier};
use crate::retry::RetryPolicy;
use crate::session::{
    DeploymentRequest, DeploymentSession, DynamoSessionStore, SessionStore, StatusFlag, StoreError,
};

/// Terminal result of a gate.
#[derive(Debug)]
pub enum GateOutcome {
    Approved,
    Rejected,
    Failed(GateError),
}

impl GateOutcome {
    pub fn state(&self) -> GateState {
        match self {
            GateOutcome::Approved => GateState::Approved,
            GateOutcome::Rejected => GateState::Rejected,
            GateOutcome::Failed(_) => GateState::Failed,
        }
    }

    /// Only an approval lets the pipeline continue.
    pub fn is_success(&self) -> bool {
        matches!(self, GateOutcome::Approved)
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Outcome plus the session it belongs to.
#[derive(Debug)]
pub struct GateReport {
    pub deploy_id: String,
    pub outcome: GateOutcome,
}

/// Orchestrates store, notifier and decision listener for one gate.
pub struct ApprovalCoordinator {
    store: Arc<dyn SessionStore>,
    notifier: Arc<dyn Notifier>,
    bus: Arc<dyn EventBus>,
    retry: RetryPolicy,
    decision_timeout: Option<Duration>,
}

impl ApprovalCoordinator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        notifier: Arc<dyn Notifier>,
        bus: Arc<dyn EventBus>,
    ) -> Self {
        Self {
            store,
            notifier,
            bus,
            retry: RetryPolicy::none(),
            decision_timeout: None,
        }
    }

    /// Wire up DynamoDB, Slack and Redis from configuration.
    pub fn from_config(config: &GateConfig) -> anyhow::Result<Self> {
        let store = DynamoSessionStore::from_config(config);
        let notifier = SlackNotifier::from_config(config)?;
        let bus = RedisEventBus::from_config(config)?;

        Ok(Self::new(Arc::new(store), Arc::new(notifier), Arc::new(bus))
            .with_retry(config.retry_policy())
            .with_decision_timeout(config.decision_timeout()))
    }

    /// Retry policy for store and notification calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fail the gate if no decision arrives in time.
    pub fn with_decision_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.decision_timeout = timeout;
        self
    }

    /// Run the gate for a new session.
    pub async fn run(&self, request: &DeploymentRequest) -> GateReport {
        self.run_session(DeploymentSession::new(request)).await
    }

    /// Run the gate for a prepared, not yet stored session.
    pub async fn run_session(&self, session: DeploymentSession) -> GateReport {
        let deploy_id = session.deploy_id.clone();
        let mut state = GateState::Initializing;

        let outcome = match self.gate(&session, &mut state).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%deploy_id, %state, error = %err, "gate failed");
                GateOutcome::Failed(err)
            }
        };

        match &outcome {
            GateOutcome::Approved => info!(%deploy_id, "deployment approved"),
            GateOutcome::Rejected => warn!(%deploy_id, "deployment rejected"),
            GateOutcome::Failed(_) => {}
        }

        GateReport { deploy_id, outcome }
    }

    async fn gate(
        &self,
        session: &DeploymentSession,
        state: &mut GateState,
    ) -> Result<GateOutcome, GateError> {
        let pending = self.initialize(session).await?;
        advance(state, GateState::AwaitingDecision);

        let event = self.await_decision(pending).await?;
        let (next, field) = GateState::decided(event.approval_status);

        let store = &self.store;
        let deploy_id = session.deploy_id.as_str();
        self.retry
            .run("record decision", StoreError::is_retryable, move || {
                store.update_field(deploy_id, field, StatusFlag::True)
            })
            .await
            .map_err(|source| GateError::RecordDecision {
                deploy_id: deploy_id.to_string(),
                field,
                source,
            })?;
        info!(deploy_id, %field, "decision recorded");

        advance(state, next);
        Ok(match next {
            GateState::Approved => GateOutcome::Approved,
            _ => GateOutcome::Rejected,
        })
    }

    /// Connect, record, announce, subscribe. The record is written before
    /// the announcement so a decision can never precede its session.
    async fn initialize(&self, session: &DeploymentSession) -> Result<PendingDecision, GateError> {
        let deploy_id = session.deploy_id.as_str();

        let listener = DecisionListener::connect(self.bus.as_ref())
            .await
            .map_err(GateError::Connect)?;

        let store = &self.store;
        self.retry
            .run("create session", StoreError::is_retryable, move || {
                store.create_session(session)
            })
            .await
            .map_err(|source| GateError::CreateSession {
                deploy_id: deploy_id.to_string(),
                source,
            })?;
        info!(
            deploy_id,
            service = %session.service,
            environment = %session.environment,
            "deployment session created"
        );

        let notifier = &self.notifier;
        self.retry
            .run("announce session", NotifyError::is_retryable, move || {
                notifier.announce(session)
            })
            .await
            .map_err(|source| GateError::Announce {
                deploy_id: deploy_id.to_string(),
                source,
            })?;
        info!(deploy_id, "approval request sent");

        listener
            .subscribe(deploy_id)
            .await
            .map_err(|source| GateError::Subscribe {
                deploy_id: deploy_id.to_string(),
                source,
            })
    }

    async fn await_decision(&self, pending: PendingDecision) -> Result<DecisionEvent, GateError> {
        let deploy_id = pending.deploy_id().to_string();
        info!(%deploy_id, "waiting for approval decision");

        let result = match self.decision_timeout {
            Some(timeout) => tokio::time::timeout(timeout, pending.wait())
                .await
                .map_err(|_| GateError::DecisionTimeout {
                    deploy_id: deploy_id.clone(),
                    timeout,
                })?,
            None => pending.wait().await,
        };

        result.map_err(|source| GateError::AwaitDecision { deploy_id, source })
    }
}

fn advance(state: &mut GateState, next: GateState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal gate transition {state} -> {next}"
    );
    tracing::debug!(from = %state, to = %next, "gate transition");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(GateOutcome::Approved.exit_code(), 0);
        assert_eq!(GateOutcome::Rejected.exit_code(), 1);
        let failed = GateOutcome::Failed(GateError::DecisionTimeout {
            deploy_id: "d".to_string(),
            timeout: Duration::from_secs(1),
        });
        assert_eq!(failed.exit_code(), 1);
        assert_eq!(failed.state(), GateState::Failed);
    }
}
