//! DynamoDB session store.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::AttributeValue;
use tracing::debug;

use super::error::{StoreError, StoreResult};
use super::models::{DeploymentSession, StatusField, StatusFlag};
use super::store::SessionStore;
use crate::config::GateConfig;

const KEY_ATTRIBUTE: &str = "deploy_id";

/// Session store writing one item per session into a DynamoDB table.
#[derive(Debug, Clone)]
pub struct DynamoSessionStore {
    client: Client,
    table: String,
}

impl DynamoSessionStore {
    pub fn new(client: Client, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    /// Build a client from static credentials in the gate configuration.
    pub fn from_config(config: &GateConfig) -> Self {
        let credentials = Credentials::new(
            config.aws_access_key.clone(),
            config.aws_secret_key.clone(),
            None,
            None,
            "deploy-gate",
        );
        let mut builder = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.aws_region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.dynamodb_endpoint {
            builder = builder.endpoint_url(endpoint.clone());
        }

        Self::new(Client::from_conf(builder.build()), config.dynamodb_table.clone())
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl SessionStore for DynamoSessionStore {
    async fn create_session(&self, session: &DeploymentSession) -> StoreResult<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(session_item(session)))
            .condition_expression("attribute_not_exists(deploy_id)")
            .send()
            .await
            .map_err(|err| put_error(&session.deploy_id, err.into_service_error()))?;

        debug!(deploy_id = %session.deploy_id, table = %self.table, "session item written");
        Ok(())
    }

    async fn update_field(
        &self,
        deploy_id: &str,
        field: StatusField,
        value: StatusFlag,
    ) -> StoreResult<()> {
        self.client
            .update_item()
            .table_name(&self.table)
            .key(KEY_ATTRIBUTE, AttributeValue::S(deploy_id.to_string()))
            .update_expression("SET #field = :value")
            .condition_expression("attribute_exists(deploy_id)")
            .expression_attribute_names("#field", field.as_str())
            .expression_attribute_values(":value", AttributeValue::S(value.as_str().to_string()))
            .send()
            .await
            .map_err(|err| update_error(deploy_id, err.into_service_error()))?;

        debug!(deploy_id, %field, %value, "session field updated");
        Ok(())
    }

    async fn get_session(&self, deploy_id: &str) -> StoreResult<Option<DeploymentSession>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(KEY_ATTRIBUTE, AttributeValue::S(deploy_id.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|err| StoreError::Read {
                deploy_id: deploy_id.to_string(),
                message: DisplayErrorContext(&err).to_string(),
            })?;

        output
            .item()
            .map(|item| {
                session_from_item(item).map_err(|message| StoreError::InvalidRecord {
                    deploy_id: deploy_id.to_string(),
                    message,
                })
            })
            .transpose()
    }
}

/// A failed `attribute_not_exists` condition means the id is taken.
fn put_error(deploy_id: &str, err: PutItemError) -> StoreError {
    if err.is_conditional_check_failed_exception() {
        StoreError::AlreadyExists(deploy_id.to_string())
    } else {
        StoreError::Write {
            deploy_id: deploy_id.to_string(),
            message: DisplayErrorContext(&err).to_string(),
        }
    }
}

/// A failed `attribute_exists` condition means there is no such session.
fn update_error(deploy_id: &str, err: UpdateItemError) -> StoreError {
    if err.is_conditional_check_failed_exception() {
        StoreError::UnknownKey(deploy_id.to_string())
    } else {
        StoreError::Write {
            deploy_id: deploy_id.to_string(),
            message: DisplayErrorContext(&err).to_string(),
        }
    }
}

/// Map a session onto the table's string attributes.
fn session_item(session: &DeploymentSession) -> HashMap<String, AttributeValue> {
    [
        (KEY_ATTRIBUTE, session.deploy_id.as_str()),
        ("timestamp", session.created_at.as_str()),
        ("environment", session.environment.as_str()),
        ("run_url", session.run_url.as_str()),
        ("first_approver", session.first_approver.as_str()),
        ("second_approver", session.second_approver.as_str()),
        ("service", session.service.as_str()),
        ("github_build_id", session.build_id.as_str()),
        ("author", session.author.as_str()),
        ("commit", session.commit.as_str()),
        ("approved", session.approved.as_str()),
        ("rejected", session.rejected.as_str()),
    ]
    .into_iter()
    .map(|(name, value)| (name.to_string(), AttributeValue::S(value.to_string())))
    .collect()
}

fn session_from_item(item: &HashMap<String, AttributeValue>) -> Result<DeploymentSession, String> {
    let text = |name: &str| -> Result<String, String> {
        match item.get(name) {
            Some(AttributeValue::S(value)) => Ok(value.clone()),
            Some(_) => Err(format!("attribute {} is not a string", name)),
            None => Err(format!("missing attribute {}", name)),
        }
    };
    // Approver and status attributes may be absent on records written by
    // other tools; treat them as unset.
    let optional = |name: &str| -> Result<String, String> {
        match item.get(name) {
            None => Ok(String::new()),
            Some(_) => text(name),
        }
    };

    Ok(DeploymentSession {
        deploy_id: text(KEY_ATTRIBUTE)?,
        service: text("service")?,
        environment: text("environment")?,
        build_id: text("github_build_id")?,
        author: text("author")?,
        commit: text("commit")?,
        run_url: text("run_url")?,
        created_at: text("timestamp")?,
        first_approver: optional("first_approver")?,
        second_approver: optional("second_approver")?,
        approved: optional("approved")?.parse()?,
        rejected: optional("rejected")?.parse()?,
    })
}
