//! Gate state machine.

use deploy_gate_protocol::ApprovalStatus;

use crate::session::StatusField;

/// Lifecycle of one gate invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Connecting, recording the session, announcing, subscribing.
    Initializing,
    /// Subscribed and waiting for a decision event.
    AwaitingDecision,
    Approved,
    Rejected,
    /// Aborted by an infrastructure error or deadline.
    Failed,
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GateState::Approved | GateState::Rejected | GateState::Failed
        )
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: GateState) -> bool {
        matches!(
            (self, next),
            (GateState::Initializing, GateState::AwaitingDecision)
                | (GateState::Initializing, GateState::Failed)
                | (GateState::AwaitingDecision, GateState::Approved)
                | (GateState::AwaitingDecision, GateState::Rejected)
                | (GateState::AwaitingDecision, GateState::Failed)
        )
    }

    /// Terminal state a decision leads to, with the status field that must
    /// be set to `true`. Only legal out of `AwaitingDecision`.
    pub fn decided(status: ApprovalStatus) -> (GateState, StatusField) {
        match status {
            ApprovalStatus::Approved => (GateState::Approved, StatusField::Approved),
            ApprovalStatus::Rejected => (GateState::Rejected, StatusField::Rejected),
        }
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateState::Initializing => write!(f, "initializing"),
            GateState::AwaitingDecision => write!(f, "awaiting_decision"),
            GateState::Approved => write!(f, "approved"),
            GateState::Rejected => write!(f, "rejected"),
            GateState::Failed => write!(f, "failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_transitions() {
        let (approved, field) = GateState::decided(ApprovalStatus::Approved);
        assert_eq!((approved, field), (GateState::Approved, StatusField::Approved));
        assert!(GateState::AwaitingDecision.can_transition_to(approved));

        let (rejected, field) = GateState::decided(ApprovalStatus::Rejected);
        assert_eq!((rejected, field), (GateState::Rejected, StatusField::Rejected));
        assert!(GateState::AwaitingDecision.can_transition_to(rejected));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for state in [GateState::Approved, GateState::Rejected, GateState::Failed] {
            assert!(state.is_terminal());
            assert!(!state.can_transition_to(GateState::AwaitingDecision));
            assert!(!state.can_transition_to(GateState::Approved));
        }
    }

    #[test]
    fn test_decisions_need_a_subscription() {
        assert!(!GateState::Initializing.can_transition_to(GateState::Approved));
        assert!(!GateState::Initializing.can_transition_to(GateState::Rejected));
        assert!(GateState::Initializing.can_transition_to(GateState::Failed));
    }
}
