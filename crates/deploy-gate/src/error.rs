//! Gate failure types.

use std::time::Duration;

use thiserror::Error;

use crate::decision::TransportError;
use crate::notify::NotifyError;
use crate::session::{StatusField, StoreError};

/// Why a gate ended in the failed state.
///
/// Every variant names the failing operation and, once a session exists,
/// its deploy id.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("connecting to event transport: {0}")]
    Connect(#[source] TransportError),

    #[error("creating session {deploy_id}: {source}")]
    CreateSession {
        deploy_id: String,
        #[source]
        source: StoreError,
    },

    #[error("announcing session {deploy_id}: {source}")]
    Announce {
        deploy_id: String,
        #[source]
        source: NotifyError,
    },

    #[error("subscribing to decisions for {deploy_id}: {source}")]
    Subscribe {
        deploy_id: String,
        #[source]
        source: TransportError,
    },

    #[error("waiting for decision on {deploy_id}: {source}")]
    AwaitDecision {
        deploy_id: String,
        #[source]
        source: TransportError,
    },

    #[error("no decision for {deploy_id} within {}s", .timeout.as_secs())]
    DecisionTimeout { deploy_id: String, timeout: Duration },

    #[error("recording {field} for {deploy_id}: {source}")]
    RecordDecision {
        deploy_id: String,
        field: StatusField,
        #[source]
        source: StoreError,
    },
}

impl GateError {
    /// Deploy id of the affected session, if one had been assigned.
    pub fn deploy_id(&self) -> Option<&str> {
        match self {
            GateError::Connect(_) => None,
            GateError::CreateSession { deploy_id, .. }
            | GateError::Announce { deploy_id, .. }
            | GateError::Subscribe { deploy_id, .. }
            | GateError::AwaitDecision { deploy_id, .. }
            | GateError::DecisionTimeout { deploy_id, .. }
            | GateError::RecordDecision { deploy_id, .. } => Some(deploy_id),
        }
    }
}
