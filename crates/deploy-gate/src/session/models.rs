//! Session data models.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tri-state status value as persisted in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFlag {
    /// Never written.
    #[default]
    #[serde(rename = "")]
    Unset,
    #[serde(rename = "true")]
    True,
    #[serde(rename = "false")]
    False,
}

impl StatusFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusFlag::Unset => "",
            StatusFlag::True => "true",
            StatusFlag::False => "false",
        }
    }
}

impl std::fmt::Display for StatusFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StatusFlag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(StatusFlag::Unset),
            "true" => Ok(StatusFlag::True),
            "false" => Ok(StatusFlag::False),
            _ => Err(format!("unknown status flag: {}", s)),
        }
    }
}

/// Status fields the gate is allowed to mutate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusField {
    Approved,
    Rejected,
}

impl StatusField {
    /// Attribute name in the durable record.
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusField::Approved => "approved",
            StatusField::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for StatusField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts about the pipeline run being gated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub service: String,
    pub environment: String,
    /// Pipeline run identifier.
    pub build_id: String,
    pub author: String,
    pub commit: String,
    /// Link to the pipeline run.
    pub run_url: String,
}

/// One deployment approval session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSession {
    /// Correlation key shared by the record, the notification and decisions.
    pub deploy_id: String,
    pub service: String,
    pub environment: String,
    pub build_id: String,
    pub author: String,
    pub commit: String,
    pub run_url: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    #[serde(default)]
    pub first_approver: String,
    #[serde(default)]
    pub second_approver: String,
    #[serde(default)]
    pub approved: StatusFlag,
    #[serde(default)]
    pub rejected: StatusFlag,
}

impl DeploymentSession {
    /// Open a pending session with a fresh deploy id.
    ///
    /// Both status flags start as `false` so readers never see a missing
    /// field while the decision is outstanding.
    pub fn new(request: &DeploymentRequest) -> Self {
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        Self::with_id(Uuid::new_v4().to_string(), request, created_at)
    }

    pub fn with_id(
        deploy_id: impl Into<String>,
        request: &DeploymentRequest,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            deploy_id: deploy_id.into(),
            service: request.service.clone(),
            environment: request.environment.clone(),
            build_id: request.build_id.clone(),
            author: request.author.clone(),
            commit: request.commit.clone(),
            run_url: request.run_url.clone(),
            created_at: created_at.into(),
            first_approver: String::new(),
            second_approver: String::new(),
            approved: StatusFlag::False,
            rejected: StatusFlag::False,
        }
    }

    pub fn flag(&self, field: StatusField) -> StatusFlag {
        match field {
            StatusField::Approved => self.approved,
            StatusField::Rejected => self.rejected,
        }
    }

    pub fn set_flag(&mut self, field: StatusField, value: StatusFlag) {
        match field {
            StatusField::Approved => self.approved = value,
            StatusField::Rejected => self.rejected = value,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.approved == StatusFlag::True
    }

    pub fn is_rejected(&self) -> bool {
        self.rejected == StatusFlag::True
    }

    /// Check if a decision has been recorded.
    pub fn is_terminal(&self) -> bool {
        self.is_approved() || self.is_rejected()
    }
}

#[cfg(test)]
pub(crate) fn sample_request() -> DeploymentRequest {
    DeploymentRequest {
        service: "payments".to_string(),
        environment: "prod".to_string(),
        build_id: "4242".to_string(),
        author: "octocat".to_string(),
        commit: "9fceb02".to_string(),
        run_url: "https://github.com/acme/payments/actions/runs/4242".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_is_pending() {
        let session = DeploymentSession::new(&sample_request());
        assert!(!session.deploy_id.is_empty());
        assert_eq!(session.approved, StatusFlag::False);
        assert_eq!(session.rejected, StatusFlag::False);
        assert!(session.first_approver.is_empty());
        assert!(session.second_approver.is_empty());
        assert!(!session.is_terminal());
    }

    #[test]
    fn test_deploy_ids_are_unique() {
        let request = sample_request();
        let a = DeploymentSession::new(&request);
        let b = DeploymentSession::new(&request);
        assert_ne!(a.deploy_id, b.deploy_id);
    }

    #[test]
    fn test_created_at_is_rfc3339() {
        let session = DeploymentSession::new(&sample_request());
        assert!(chrono::DateTime::parse_from_rfc3339(&session.created_at).is_ok());
    }

    #[test]
    fn test_set_flag() {
        let mut session = DeploymentSession::new(&sample_request());
        session.set_flag(StatusField::Rejected, StatusFlag::True);
        assert!(session.is_rejected());
        assert!(session.is_terminal());
        assert_eq!(session.flag(StatusField::Approved), StatusFlag::False);
    }

    #[test]
    fn test_status_flag_parse() {
        assert_eq!("".parse::<StatusFlag>().unwrap(), StatusFlag::Unset);
        assert_eq!("true".parse::<StatusFlag>().unwrap(), StatusFlag::True);
        assert!("TRUE".parse::<StatusFlag>().is_err());
    }
}
