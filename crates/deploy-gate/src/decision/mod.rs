//! Decision event intake.
//!
//! The gate subscribes to a pub/sub channel named after the deploy id and
//! waits for the first well-formed event that names that id. Malformed
//! payloads and events for other deployments are skipped.

mod error;
mod listener;
mod memory;
mod redis_bus;
mod transport;

pub use deploy_gate_protocol::{ApprovalStatus, DecisionEvent, ProtocolError};
pub use error::{TransportError, TransportResult};
pub use listener::{DecisionListener, PendingDecision, Screened, screen};
pub use memory::MemoryEventBus;
pub use redis_bus::RedisEventBus;
pub use transport::{EventBus, EventConnection, MessageStream};
