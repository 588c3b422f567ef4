//! Approval notifications.
//!
//! Posts the approval request to Slack with one button per approver action.
//! Buttons carry the deploy id so whatever handles the click can publish a
//! decision for the right session.

mod error;
mod message;
mod slack;

use async_trait::async_trait;

pub use error::{NotifyError, NotifyResult};
pub use message::{ApprovalAction, ApprovalMessage, Block, ButtonStyle, Element, TextObject};
pub use slack::{DEFAULT_SLACK_API_URL, PostMessageResponse, SlackNotifier};

use crate::session::DeploymentSession;

/// Sends the approval request for a session.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn announce(&self, session: &DeploymentSession) -> NotifyResult<()>;
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn announce(&self, session: &DeploymentSession) -> NotifyResult<()> {
        let message = ApprovalMessage::for_session(session);
        self.post_message(&message).await.map(|_| ())
    }
}
