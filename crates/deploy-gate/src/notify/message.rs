//! Block Kit layout of the approval message.

use serde::Serialize;

use crate::session::DeploymentSession;

const FALLBACK_TEXT: &str = "Deployment Approval";

/// Text object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    PlainText { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        TextObject::PlainText { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        TextObject::Mrkdwn { text: text.into() }
    }

    pub fn text(&self) -> &str {
        match self {
            TextObject::PlainText { text } | TextObject::Mrkdwn { text } => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

/// Interactive element inside an actions block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Button {
        style: ButtonStyle,
        text: TextObject,
        /// Opaque payload echoed back on click.
        value: String,
        action_id: String,
    },
}

/// Layout block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Divider {
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
    Section {
        text: TextObject,
    },
    Actions {
        elements: Vec<Element>,
    },
    Context {
        elements: Vec<TextObject>,
    },
}

/// Controls offered to approvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    FirstApprover,
    SecondApprover,
    Reject,
}

impl ApprovalAction {
    pub const ALL: [ApprovalAction; 3] = [
        ApprovalAction::FirstApprover,
        ApprovalAction::SecondApprover,
        ApprovalAction::Reject,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ApprovalAction::FirstApprover => "1st Approver",
            ApprovalAction::SecondApprover => "2nd Approver",
            ApprovalAction::Reject => "Reject",
        }
    }

    /// Identifier the click handler receives.
    pub fn action_id(&self) -> &'static str {
        match self {
            ApprovalAction::FirstApprover => "first_approver",
            ApprovalAction::SecondApprover => "second_approver",
            ApprovalAction::Reject => "reject_1",
        }
    }

    pub fn style(&self) -> ButtonStyle {
        match self {
            ApprovalAction::Reject => ButtonStyle::Danger,
            _ => ButtonStyle::Primary,
        }
    }

    fn button(&self, deploy_id: &str) -> Element {
        Element::Button {
            style: self.style(),
            text: TextObject::plain(self.label()),
            value: deploy_id.to_string(),
            action_id: self.action_id().to_string(),
        }
    }
}

/// A complete `chat.postMessage` payload minus the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApprovalMessage {
    /// Fallback text for notifications and clients without blocks.
    pub text: String,
    pub blocks: Vec<Block>,
}

impl ApprovalMessage {
    pub fn for_session(session: &DeploymentSession) -> Self {
        let blocks = vec![
            Block::Divider {
                block_id: Some("divider1".to_string()),
            },
            Block::Section {
                text: TextObject::mrkdwn(format!("*{}*", FALLBACK_TEXT)),
            },
            Block::Actions {
                elements: ApprovalAction::ALL
                    .iter()
                    .map(|action| action.button(&session.deploy_id))
                    .collect(),
            },
            Block::Context {
                elements: vec![
                    TextObject::plain(format!("Actor: {}", session.author)),
                    TextObject::plain(format!("Service: {}", session.service)),
                    TextObject::plain(format!("Commit: {}", session.commit)),
                    TextObject::plain(format!("Build ID: {}", session.build_id)),
                    TextObject::plain(format!("Environment: {}", session.environment)),
                    TextObject::mrkdwn(format!("Build: <{}|Workflow Run>", session.run_url)),
                ],
            },
        ];

        Self {
            text: FALLBACK_TEXT.to_string(),
            blocks,
        }
    }
}
