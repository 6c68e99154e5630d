//! Infisical secret manager.
//!
//! Fetches raw secrets over HTTP, scoped by workspace, environment slug and
//! secret path. Accepts both the structured `{secrets: [...]}` response and a
//! flat key/value object.

use super::types::{normalize_environment_name, SecretManager, SecretManagerConfig};
use crate::config::DEFAULT_INFISICAL_URL;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Per-request timeout for the secret store.
const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Response keys that carry metadata rather than secrets.
const RESERVED_KEYS: &[&str] = &["secrets", "imports"];

pub struct InfisicalSecretManager {
    client: Client,
    endpoint: Url,
    token: String,
    project_id: Option<String>,
    environment: String,
    secret_path: String,
}

impl InfisicalSecretManager {
    /// Build a manager from configuration. The token must be present.
    pub fn new(config: &SecretManagerConfig) -> Result<Self> {
        let token = config
            .auth_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::missing("INFISICAL_TOKEN"))?;

        let base = config
            .endpoint_url
            .as_deref()
            .unwrap_or(DEFAULT_INFISICAL_URL)
            .trim_end_matches('/');
        let endpoint = Url::parse(&format!("{base}/api/v3/secrets/raw")).map_err(|e| {
            Error::InvalidConfiguration(format!("invalid INFISICAL_URL '{base}': {e}"))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token,
            project_id: config.project_id.clone(),
            environment: config.environment.clone(),
            secret_path: if config.secret_path.is_empty() {
                "/".to_string()
            } else {
                config.secret_path.clone()
            },
        })
    }

    fn query(&self) -> Result<Vec<(&'static str, String)>> {
        if self.environment.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "SECRET_MANAGER_ENVIRONMENT is required".to_string(),
            ));
        }

        let mut query = Vec::with_capacity(4);
        if let Some(project_id) = &self.project_id {
            query.push(("workspaceId", project_id.clone()));
        }
        query.push(("environment", normalize_environment_name(&self.environment)));
        query.push(("secretPath", self.secret_path.clone()));
        query.push(("recursive", "true".to_string()));
        Ok(query)
    }
}

#[async_trait]
impl SecretManager for InfisicalSecretManager {
    fn name(&self) -> &str {
        "infisical"
    }

    async fn get_secret(&self, key: &str) -> Result<String> {
        let secrets = self.get_secrets(None).await?;
        match secrets.get(key) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(Error::SecretNotFound {
                key: key.to_string(),
            }),
        }
    }

    async fn get_secrets(&self, prefix: Option<&str>) -> Result<HashMap<String, String>> {
        let query = self.query()?;
        debug!(
            "Fetching secrets from {} (prefix: {:?})",
            self.endpoint,
            prefix.unwrap_or("")
        );

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&query)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            warn!(
                "No secrets found at path '{}' in environment '{}'. This is normal if secrets haven't been created yet.",
                self.secret_path,
                normalize_environment_name(&self.environment)
            );
            return Ok(HashMap::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RemoteFetch {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response.json().await?;
        Ok(parse_secrets_response(&data, prefix))
    }
}

// ============================================================================
// Response parsing
// ============================================================================

/// Extract secrets from either supported response shape, filtered by prefix.
pub fn parse_secrets_response(data: &Value, prefix: Option<&str>) -> HashMap<String, String> {
    let matches = |key: &str| prefix.map_or(true, |p| key.starts_with(p));
    let mut secrets = HashMap::new();

    if let Some(entries) = data.get("secrets").and_then(Value::as_array) {
        for entry in entries {
            let Some(key) = first_string(entry, &["secretKey", "key"]) else {
                continue;
            };
            if !matches(&key) {
                continue;
            }
            if let Some(value) = first_value(entry, &["secretValue", "value"]) {
                secrets.insert(key, value);
            }
        }
    } else if let Some(map) = data.as_object() {
        for (key, value) in map {
            if RESERVED_KEYS.contains(&key.as_str()) || !matches(key) {
                continue;
            }
            if let Some(value) = coerce_to_string(value) {
                secrets.insert(key.clone(), value);
            }
        }
    }

    secrets
}

/// First field among `fields` holding a non-empty string.
fn first_string(entry: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| entry.get(*f).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(String::from)
}

/// First field among `fields` with a usable value; empty strings defer to
/// later fields but are kept if nothing better exists.
fn first_value(entry: &Value, fields: &[&str]) -> Option<String> {
    let values: Vec<String> = fields
        .iter()
        .filter_map(|f| entry.get(*f).and_then(coerce_to_string))
        .collect();
    values
        .iter()
        .find(|v| !v.is_empty())
        .or_else(|| values.first())
        .cloned()
}

fn coerce_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
