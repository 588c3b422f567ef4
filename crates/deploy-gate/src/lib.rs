//! Deployment approval gate.
//!
//! Pauses a deployment pipeline until a human approves or rejects it. The
//! gate records a session in DynamoDB, posts an approval request to Slack,
//! and waits on a Redis channel named after the session for the decision.

pub mod config;
pub mod coordinator;
pub mod decision;
pub mod error;
pub mod notify;
pub mod retry;
pub mod session;

pub use config::GateConfig;
pub use coordinator::{ApprovalCoordinator, GateOutcome, GateReport, GateState};
pub use error::GateError;
