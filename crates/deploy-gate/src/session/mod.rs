//! Deployment session records.
//!
//! A session is created once when the gate opens and receives at most one
//! terminal update when a decision is applied.

mod dynamo;
mod error;
mod memory;
mod models;
mod store;

pub use dynamo::DynamoSessionStore;
pub use error::{StoreError, StoreResult};
pub use memory::MemorySessionStore;
pub use models::{DeploymentRequest, DeploymentSession, StatusField, StatusFlag};
pub use store::SessionStore;

#[cfg(test)]
pub(crate) use models::sample_request;
