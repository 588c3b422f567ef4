//! Test utilities and common setup.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deploy_gate::ApprovalCoordinator;
use deploy_gate::decision::{DecisionEvent, MemoryEventBus};
use deploy_gate::notify::{Notifier, NotifyError, NotifyResult};
use deploy_gate::session::{
    DeploymentRequest, DeploymentSession, MemorySessionStore, SessionStore, StatusField,
    StatusFlag, StoreError, StoreResult,
};

/// Something an approver does once the request is visible.
pub type Reply = Box<dyn Fn(&MemoryEventBus, &DeploymentSession) + Send + Sync>;

pub fn approve() -> Reply {
    Box::new(|bus, session| {
        bus.publish(
            &session.deploy_id,
            DecisionEvent::approve(&session.deploy_id).encode(),
        );
    })
}

pub fn reject() -> Reply {
    Box::new(|bus, session| {
        bus.publish(
            &session.deploy_id,
            DecisionEvent::reject(&session.deploy_id).encode(),
        );
    })
}

/// Publish raw text on the session's channel.
pub fn raw(payload: &'static str) -> Reply {
    Box::new(move |bus, session| {
        bus.publish(&session.deploy_id, payload);
    })
}

/// Approve a deployment that was never issued, on this session's channel.
pub fn approve_other(other_id: &'static str) -> Reply {
    Box::new(move |bus, session| {
        bus.publish(&session.deploy_id, DecisionEvent::approve(other_id).encode());
    })
}

pub fn close_bus() -> Reply {
    Box::new(|bus, _| bus.close())
}

/// How long a reply task waits for the gate to subscribe.
const SUBSCRIBE_WAIT: Duration = Duration::from_secs(2);

/// Notifier that records announcements and plays replies on the bus, the
/// way approvers react to the Slack message.
///
/// Replies go out from a background task once the gate has subscribed,
/// since a real approver clicks some time after the post. With
/// `immediate` they are published inside `announce`, before the gate
/// subscribes.
pub struct ScriptedNotifier {
    bus: Arc<MemoryEventBus>,
    store: Arc<MemorySessionStore>,
    replies: Arc<Vec<Reply>>,
    immediate: bool,
    fail: bool,
    announced: Mutex<Vec<DeploymentSession>>,
    stored_before_announce: Mutex<Vec<bool>>,
}

impl ScriptedNotifier {
    pub fn new(bus: Arc<MemoryEventBus>, store: Arc<MemorySessionStore>, replies: Vec<Reply>) -> Self {
        Self {
            bus,
            store,
            replies: Arc::new(replies),
            immediate: false,
            fail: false,
            announced: Mutex::new(Vec::new()),
            stored_before_announce: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(bus: Arc<MemoryEventBus>, store: Arc<MemorySessionStore>) -> Self {
        Self {
            fail: true,
            ..Self::new(bus, store, Vec::new())
        }
    }

    pub fn immediate(bus: Arc<MemoryEventBus>, store: Arc<MemorySessionStore>, replies: Vec<Reply>) -> Self {
        Self {
            immediate: true,
            ..Self::new(bus, store, replies)
        }
    }

    pub fn announced(&self) -> Vec<DeploymentSession> {
        self.announced.lock().unwrap().clone()
    }

    pub fn stored_before_announce(&self) -> Vec<bool> {
        self.stored_before_announce.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for ScriptedNotifier {
    async fn announce(&self, session: &DeploymentSession) -> NotifyResult<()> {
        let stored = self
            .store
            .get_session(&session.deploy_id)
            .await
            .unwrap()
            .is_some();
        self.stored_before_announce.lock().unwrap().push(stored);

        if self.fail {
            return Err(NotifyError::Api("channel_not_found".to_string()));
        }

        self.announced.lock().unwrap().push(session.clone());
        if self.immediate {
            for reply in self.replies.iter() {
                reply(&self.bus, session);
            }
            return Ok(());
        }

        let bus = self.bus.clone();
        let replies = self.replies.clone();
        let session = session.clone();
        tokio::spawn(async move {
            let subscribed = tokio::time::timeout(SUBSCRIBE_WAIT, async {
                while bus.subscriptions() == 0 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
            .await;
            if subscribed.is_ok() {
                for reply in replies.iter() {
                    reply(&bus, &session);
                }
            }
        });
        Ok(())
    }
}

/// Store whose writes fail a configured number of times before reaching
/// the inner memory store.
pub struct FlakyStore {
    inner: Arc<MemorySessionStore>,
    create_failures: AtomicU32,
    update_failures: AtomicU32,
}

impl FlakyStore {
    pub fn new(inner: Arc<MemorySessionStore>, create_failures: u32, update_failures: u32) -> Self {
        Self {
            inner,
            create_failures: AtomicU32::new(create_failures),
            update_failures: AtomicU32::new(update_failures),
        }
    }

    fn take_failure(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl SessionStore for FlakyStore {
    async fn create_session(&self, session: &DeploymentSession) -> StoreResult<()> {
        if Self::take_failure(&self.create_failures) {
            return Err(StoreError::Write {
                deploy_id: session.deploy_id.clone(),
                message: "connection reset".to_string(),
            });
        }
        self.inner.create_session(session).await
    }

    async fn update_field(
        &self,
        deploy_id: &str,
        field: StatusField,
        value: StatusFlag,
    ) -> StoreResult<()> {
        if Self::take_failure(&self.update_failures) {
            return Err(StoreError::Write {
                deploy_id: deploy_id.to_string(),
                message: "throughput exceeded".to_string(),
            });
        }
        self.inner.update_field(deploy_id, field, value).await
    }

    async fn get_session(&self, deploy_id: &str) -> StoreResult<Option<DeploymentSession>> {
        self.inner.get_session(deploy_id).await
    }
}

pub fn payments_request() -> DeploymentRequest {
    DeploymentRequest {
        service: "payments".to_string(),
        environment: "prod".to_string(),
        build_id: "7781".to_string(),
        author: "octocat".to_string(),
        commit: "a1b2c3d".to_string(),
        run_url: "https://github.com/acme/payments/actions/runs/7781".to_string(),
    }
}

/// Coordinator over in-memory adapters.
pub struct Harness {
    pub bus: Arc<MemoryEventBus>,
    pub store: Arc<MemorySessionStore>,
    pub notifier: Arc<ScriptedNotifier>,
    pub coordinator: ApprovalCoordinator,
}

impl Harness {
    pub fn new(replies: Vec<Reply>) -> Self {
        let bus = Arc::new(MemoryEventBus::new());
        let store = Arc::new(MemorySessionStore::new());
        let notifier = Arc::new(ScriptedNotifier::new(bus.clone(), store.clone(), replies));
        Self::assemble(bus, store.clone(), store, notifier)
    }

    pub fn with_failing_notifier() -> Self {
        let bus = Arc::new(MemoryEventBus::new());
        let store = Arc::new(MemorySessionStore::new());
        let notifier = Arc::new(ScriptedNotifier::failing(bus.clone(), store.clone()));
        Self::assemble(bus, store.clone(), store, notifier)
    }

    /// Replies are published before the gate subscribes.
    pub fn with_immediate_replies(replies: Vec<Reply>) -> Self {
        let bus = Arc::new(MemoryEventBus::new());
        let store = Arc::new(MemorySessionStore::new());
        let notifier = Arc::new(ScriptedNotifier::immediate(bus.clone(), store.clone(), replies));
        Self::assemble(bus, store.clone(), store, notifier)
    }

    pub fn with_flaky_store(replies: Vec<Reply>, create_failures: u32, update_failures: u32) -> Self {
        let bus = Arc::new(MemoryEventBus::new());
        let store = Arc::new(MemorySessionStore::new());
        let notifier = Arc::new(ScriptedNotifier::new(bus.clone(), store.clone(), replies));
        let flaky = Arc::new(FlakyStore::new(store.clone(), create_failures, update_failures));
        Self::assemble(bus, store, flaky, notifier)
    }

    fn assemble(
        bus: Arc<MemoryEventBus>,
        store: Arc<MemorySessionStore>,
        gate_store: Arc<dyn SessionStore>,
        notifier: Arc<ScriptedNotifier>,
    ) -> Self {
        let coordinator = ApprovalCoordinator::new(gate_store, notifier.clone(), bus.clone());
        Self {
            bus,
            store,
            notifier,
            coordinator,
        }
    }

    pub async fn stored(&self, deploy_id: &str) -> Option<DeploymentSession> {
        self.store.get_session(deploy_id).await.unwrap()
    }
}
