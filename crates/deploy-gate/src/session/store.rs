//! Session store abstraction.

use async_trait::async_trait;

use super::error::StoreResult;
use super::models::{DeploymentSession, StatusField, StatusFlag};

/// Durable storage for deployment sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Write a new session. Fails if the id is already present.
    async fn create_session(&self, session: &DeploymentSession) -> StoreResult<()>;

    /// Set one status field on an existing session.
    ///
    /// Writing the value a field already holds succeeds.
    async fn update_field(
        &self,
        deploy_id: &str,
        field: StatusField,
        value: StatusFlag,
    ) -> StoreResult<()>;

    /// Fetch a session by id.
    async fn get_session(&self, deploy_id: &str) -> StoreResult<Option<DeploymentSession>>;
}
