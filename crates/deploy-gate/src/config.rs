//! Gate configuration.
//!
//! Loaded once at startup from, in increasing precedence: built-in defaults,
//! an optional TOML file, GitHub Actions inputs (`INPUT_<NAME>`), and
//! `DEPLOY_GATE_<NAME>` environment variables. Keys are the lowercase input
//! names, e.g. `slack_channel` or `github_run_id`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notify::DEFAULT_SLACK_API_URL;
use crate::retry::RetryPolicy;
use crate::session::DeploymentRequest;

/// Prefix GitHub Actions uses for step inputs.
pub const INPUT_ENV_PREFIX: &str = "INPUT";
/// Prefix for direct environment overrides.
pub const ENV_PREFIX: &str = "DEPLOY_GATE";

const REDACTED: &str = "<redacted>";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("loading configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("environment variable {var} referenced by {key} is not set")]
    EnvVarNotFound { key: &'static str, var: String },

    #[error("environment variable {var} referenced by {key} is empty")]
    EnvVarEmpty { key: &'static str, var: String },

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Everything one gate invocation needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Service being deployed.
    pub service: String,
    /// Target environment (e.g. "prod").
    pub environment: String,
    /// Pipeline run id.
    pub github_run_id: String,
    /// Actor who triggered the run.
    pub github_author: String,
    /// Commit being deployed.
    pub github_sha: String,
    /// `owner/name` of the source repository.
    pub github_repository: String,
    /// Host used to build the run URL.
    pub github_host: String,

    /// Channel receiving the approval request.
    pub slack_channel: String,
    /// Bot token. Accepts `env:VAR_NAME`.
    pub slack_token: String,
    pub slack_api_url: String,

    pub dynamodb_table: String,
    /// Custom endpoint, e.g. DynamoDB Local.
    pub dynamodb_endpoint: Option<String>,
    pub aws_region: String,
    /// Accepts `env:VAR_NAME`.
    pub aws_access_key: String,
    /// Accepts `env:VAR_NAME`.
    pub aws_secret_key: String,

    pub redis_host: String,
    pub redis_port: u16,
    /// Connect with `rediss://`.
    pub redis_tls: bool,

    /// Give up waiting after this many seconds. Unset waits forever.
    pub decision_timeout_secs: Option<u64>,
    /// Attempts for store and Slack calls, including the first.
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            service: String::new(),
            environment: String::new(),
            github_run_id: String::new(),
            github_author: String::new(),
            github_sha: String::new(),
            github_repository: String::new(),
            github_host: "github.com".to_string(),
            slack_channel: String::new(),
            slack_token: String::new(),
            slack_api_url: DEFAULT_SLACK_API_URL.to_string(),
            dynamodb_table: String::new(),
            dynamodb_endpoint: None,
            aws_region: String::new(),
            aws_access_key: String::new(),
            aws_secret_key: String::new(),
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_tls: false,
            decision_timeout_secs: None,
            retry_attempts: 1,
            retry_backoff_ms: 500,
        }
    }
}

impl GateConfig {
    /// Load the layered configuration.
    ///
    /// `env` is the process environment; empty values are ignored so that
    /// unset optional action inputs fall back to their defaults.
    pub fn load(file: Option<&Path>, env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let vars: config::Map<String, String> = env
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let built = builder
            .add_source(
                Environment::with_prefix(INPUT_ENV_PREFIX)
                    .prefix_separator("_")
                    .source(Some(vars.clone())),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .source(Some(vars)),
            )
            .build()?;

        let mut config: GateConfig = built.try_deserialize()?;
        config.resolve_secrets(env)?;
        Ok(config)
    }

    /// Expand `env:VAR_NAME` references in secret fields.
    fn resolve_secrets(&mut self, env: &HashMap<String, String>) -> Result<(), ConfigError> {
        for (key, value) in [
            ("slack_token", &mut self.slack_token),
            ("aws_access_key", &mut self.aws_access_key),
            ("aws_secret_key", &mut self.aws_secret_key),
        ] {
            if let Some(var) = value.strip_prefix("env:") {
                let var = var.to_string();
                match env.get(&var) {
                    Some(secret) if !secret.is_empty() => *value = secret.clone(),
                    Some(_) => return Err(ConfigError::EnvVarEmpty { key, var }),
                    None => return Err(ConfigError::EnvVarNotFound { key, var }),
                }
            }
        }
        Ok(())
    }

    /// Check that every required value is present.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("service", &self.service),
            ("environment", &self.environment),
            ("github_run_id", &self.github_run_id),
            ("github_author", &self.github_author),
            ("github_sha", &self.github_sha),
            ("github_repository", &self.github_repository),
            ("slack_channel", &self.slack_channel),
            ("slack_token", &self.slack_token),
            ("dynamodb_table", &self.dynamodb_table),
            ("aws_region", &self.aws_region),
            ("aws_access_key", &self.aws_access_key),
            ("aws_secret_key", &self.aws_secret_key),
        ];
        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(key, _)| *key)
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        if self.redis_host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "redis_host",
                message: "must not be empty".to_string(),
            });
        }
        if self.redis_port == 0 {
            return Err(ConfigError::Invalid {
                key: "redis_port",
                message: "must be between 1 and 65535".to_string(),
            });
        }
        Ok(())
    }

    /// Link to the pipeline run.
    pub fn run_url(&self) -> String {
        format!(
            "https://{}/{}/actions/runs/{}",
            self.github_host, self.github_repository, self.github_run_id
        )
    }

    pub fn redis_url(&self) -> String {
        let scheme = if self.redis_tls { "rediss" } else { "redis" };
        format!("{}://{}:{}", scheme, self.redis_host, self.redis_port)
    }

    pub fn deployment_request(&self) -> DeploymentRequest {
        DeploymentRequest {
            service: self.service.clone(),
            environment: self.environment.clone(),
            build_id: self.github_run_id.clone(),
            author: self.github_author.clone(),
            commit: self.github_sha.clone(),
            run_url: self.run_url(),
        }
    }

    pub fn decision_timeout(&self) -> Option<Duration> {
        self.decision_timeout_secs.map(Duration::from_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_attempts,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    /// Copy with secrets masked, for display.
    pub fn redacted(&self) -> Self {
        let mask = |value: &str| {
            if value.is_empty() {
                String::new()
            } else {
                REDACTED.to_string()
            }
        };
        Self {
            slack_token: mask(&self.slack_token),
            aws_access_key: mask(&self.aws_access_key),
            aws_secret_key: mask(&self.aws_secret_key),
            ..self.clone()
        }
    }
}
