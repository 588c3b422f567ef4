//! In-process session store.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::error::{StoreError, StoreResult};
use super::models::{DeploymentSession, StatusField, StatusFlag};
use super::store::SessionStore;

/// Session store backed by a map, for exercising the gate without DynamoDB.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, DeploymentSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, DeploymentSession>> {
        // A poisoned map still holds consistent records; every write is a
        // single insert or field assignment.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(&self, session: &DeploymentSession) -> StoreResult<()> {
        let mut sessions = self.lock();
        if sessions.contains_key(&session.deploy_id) {
            return Err(StoreError::AlreadyExists(session.deploy_id.clone()));
        }
        sessions.insert(session.deploy_id.clone(), session.clone());
        Ok(())
    }

    async fn update_field(
        &self,
        deploy_id: &str,
        field: StatusField,
        value: StatusFlag,
    ) -> StoreResult<()> {
        let mut sessions = self.lock();
        let session = sessions
            .get_mut(deploy_id)
            .ok_or_else(|| StoreError::UnknownKey(deploy_id.to_string()))?;
        session.set_flag(field, value);
        Ok(())
    }

    async fn get_session(&self, deploy_id: &str) -> StoreResult<Option<DeploymentSession>> {
        Ok(self.lock().get(deploy_id).cloned())
    }
}
