//! Slack Web API client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{NotifyError, NotifyResult};
use super::message::{ApprovalMessage, Block};
use crate::config::GateConfig;

/// Public Slack Web API endpoint.
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Client posting messages to one Slack channel.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    /// HTTP client.
    client: Client,
    /// Base URL for the Web API (e.g., "https://slack.com/api").
    api_url: String,
    /// Bot token.
    token: String,
    /// Target channel id or name.
    channel: String,
}

#[derive(Debug, Serialize)]
struct PostMessageRequest<'a> {
    channel: &'a str,
    text: &'a str,
    blocks: &'a [Block],
}

/// Reply from `chat.postMessage`.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessageResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Channel the message landed in.
    #[serde(default)]
    pub channel: Option<String>,
    /// Message timestamp (Slack's message id).
    #[serde(default)]
    pub ts: Option<String>,
}

impl SlackNotifier {
    /// Create a new Slack client.
    pub fn new(
        api_url: impl Into<String>,
        token: impl Into<String>,
        channel: impl Into<String>,
    ) -> NotifyResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            channel: channel.into(),
        })
    }

    pub fn from_config(config: &GateConfig) -> NotifyResult<Self> {
        Self::new(
            config.slack_api_url.as_str(),
            config.slack_token.as_str(),
            config.slack_channel.as_str(),
        )
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Post a message to the configured channel.
    pub async fn post_message(&self, message: &ApprovalMessage) -> NotifyResult<PostMessageResponse> {
        let url = format!("{}/chat.postMessage", self.api_url);
        let request = PostMessageRequest {
            channel: &self.channel,
            text: &message.text,
            blocks: &message.blocks,
        };
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let reply: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::ParseError(e.to_string()))?;

        if !reply.ok {
            return Err(NotifyError::Api(
                reply.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }

        debug!(channel = %self.channel, ts = ?reply.ts, "Slack message posted");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = SlackNotifier::new("http://localhost:3000/api/", "xoxb-test", "C123").unwrap();
        assert_eq!(client.api_url, "http://localhost:3000/api");
        assert_eq!(client.channel(), "C123");
    }

    #[test]
    fn test_response_parse() {
        let reply: PostMessageResponse =
            serde_json::from_str(r#"{"ok":false,"error":"invalid_auth"}"#).unwrap();
        assert!(!reply.ok);
        assert_eq!(reply.error.as_deref(), Some("invalid_auth"));
        assert!(reply.ts.is_none());
    }
}
