//! Decision event payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding a decision payload.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Payload is not JSON, misses a field, or carries an unknown status.
    #[error("malformed decision payload: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Payload decoded but names no deployment.
    #[error("decision payload has an empty deployment_id")]
    EmptyDeploymentId,
}

/// Approval verdict carried by a decision event.
///
/// Encoded as the strings `"true"` and `"false"`, not JSON booleans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApprovalStatus {
    #[serde(rename = "true")]
    Approved,
    #[serde(rename = "false")]
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "true",
            Self::Rejected => "false",
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A decision for one deployment session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionEvent {
    /// Deployment id the decision applies to.
    pub deployment_id: String,
    /// The verdict.
    pub approval_status: ApprovalStatus,
}

impl DecisionEvent {
    pub fn approve(deployment_id: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            approval_status: ApprovalStatus::Approved,
        }
    }

    pub fn reject(deployment_id: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            approval_status: ApprovalStatus::Rejected,
        }
    }

    /// Decode a raw pub/sub payload.
    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        let event: Self = serde_json::from_slice(payload)?;
        if event.deployment_id.is_empty() {
            return Err(ProtocolError::EmptyDeploymentId);
        }
        Ok(event)
    }

    /// Encode for publishing.
    pub fn encode(&self) -> String {
        // Two string fields; serialization cannot fail.
        serde_json::json!({
            "deployment_id": self.deployment_id,
            "approval_status": self.approval_status.as_str(),
        })
        .to_string()
    }

    /// Channel this event must be published on.
    pub fn channel(&self) -> &str {
        channel_for(&self.deployment_id)
    }
}

/// Pub/sub channel carrying decisions for a deployment.
pub fn channel_for(deploy_id: &str) -> &str {
    deploy_id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_approval() {
        let event =
            DecisionEvent::decode(br#"{"deployment_id":"abc","approval_status":"true"}"#).unwrap();
        assert_eq!(event, DecisionEvent::approve("abc"));
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let payload = br#"{"deployment_id":"abc","approval_status":"false","user":"U123"}"#;
        let event = DecisionEvent::decode(payload).unwrap();
        assert_eq!(event.approval_status, ApprovalStatus::Rejected);
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let err = DecisionEvent::decode(b"approve it").unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_missing_status() {
        let err = DecisionEvent::decode(br#"{"deployment_id":"abc"}"#).unwrap_err();
        assert!(err.to_string().contains("approval_status"));
    }

    #[test]
    fn test_decode_rejects_boolean_status() {
        let payload = br#"{"deployment_id":"abc","approval_status":true}"#;
        assert!(DecisionEvent::decode(payload).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let payload = br#"{"deployment_id":"abc","approval_status":"maybe"}"#;
        assert!(DecisionEvent::decode(payload).is_err());
    }

    #[test]
    fn test_decode_rejects_empty_id() {
        let payload = br#"{"deployment_id":"","approval_status":"true"}"#;
        assert!(matches!(
            DecisionEvent::decode(payload),
            Err(ProtocolError::EmptyDeploymentId)
        ));
    }

    #[test]
    fn test_encode_uses_string_status() {
        let value: serde_json::Value =
            serde_json::from_str(&DecisionEvent::reject("abc").encode()).unwrap();
        assert_eq!(value["deployment_id"], "abc");
        assert_eq!(value["approval_status"], "false");
    }

    #[test]
    fn test_channel_is_deploy_id() {
        assert_eq!(DecisionEvent::approve("d-1").channel(), "d-1");
    }
}
