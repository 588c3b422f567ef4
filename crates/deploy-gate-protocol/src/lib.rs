//! Wire protocol for deployment approval decisions.
//!
//! Decision producers (the chat integration that turns a button click into an
//! event) and the gate share these types. The payload shape is a compatibility
//! contract: a JSON object with `deployment_id` and a string `approval_status`
//! published on a channel named exactly after the deployment id.

pub mod decision;

pub use decision::{ApprovalStatus, DecisionEvent, ProtocolError, channel_for};
