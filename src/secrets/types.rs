//! Core types for the secret-manager integration.

use crate::config::{EnvironmentStore, DEFAULT_INFISICAL_URL};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

// ============================================================================
// Backend selection
// ============================================================================

/// Which remote backend supplies secrets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretBackendKind {
    #[default]
    None,
    Infisical,
}

impl std::str::FromStr for SecretBackendKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "infisical" => Ok(Self::Infisical),
            other => Err(format!("unknown secret manager type: {other}")),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Settings for the remote secret store, read from the seed environment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretManagerConfig {
    pub backend: SecretBackendKind,
    pub enabled: bool,
    pub project_id: Option<String>,
    pub environment: String,
    pub secret_path: String,
    pub service_name: String,
    pub endpoint_url: Option<String>,
    #[serde(skip_serializing)]
    pub auth_token: Option<String>,
}

impl SecretManagerConfig {
    /// A disabled configuration that always yields the no-op manager.
    pub fn disabled(service_name: &str) -> Self {
        Self {
            backend: SecretBackendKind::None,
            enabled: false,
            project_id: None,
            environment: "prod".to_string(),
            secret_path: "/".to_string(),
            service_name: service_name.to_string(),
            endpoint_url: None,
            auth_token: None,
        }
    }

    /// Load secret-manager settings from `SECRET_MANAGER_*` and `INFISICAL_*`.
    pub fn from_env(env: &EnvironmentStore, service_name: &str) -> Self {
        let backend = match env.get("SECRET_MANAGER_TYPE") {
            Some(raw) => raw.parse().unwrap_or_else(|e: String| {
                warn!("{e}; falling back to no secret manager");
                SecretBackendKind::None
            }),
            None => SecretBackendKind::None,
        };
        let enabled = env.get("SECRET_MANAGER_ENABLED") == Some("true");

        if !enabled && backend == SecretBackendKind::None {
            return Self::disabled(service_name);
        }

        Self {
            backend,
            enabled,
            project_id: env.get_non_empty("SECRET_MANAGER_PROJECT_ID").map(String::from),
            environment: env
                .get_non_empty("SECRET_MANAGER_ENVIRONMENT")
                .unwrap_or("prod")
                .to_string(),
            secret_path: env
                .get_non_empty("SECRET_MANAGER_SECRET_PATH")
                .unwrap_or("/")
                .to_string(),
            service_name: service_name.to_string(),
            endpoint_url: Some(
                env.get_non_empty("INFISICAL_URL")
                    .unwrap_or(DEFAULT_INFISICAL_URL)
                    .to_string(),
            ),
            auth_token: env.get_non_empty("INFISICAL_TOKEN").map(String::from),
        }
    }

    /// Whether a remote fetch should be attempted at all.
    pub fn is_active(&self) -> bool {
        self.enabled && self.backend != SecretBackendKind::None
    }
}

// ============================================================================
// Manager trait
// ============================================================================

/// Capability for fetching key/value secrets from a backend.
#[async_trait]
pub trait SecretManager: Send + Sync {
    /// Display name for logging.
    fn name(&self) -> &str;

    /// Fetch a single secret; fails with `SecretNotFound` when absent.
    async fn get_secret(&self, key: &str) -> Result<String>;

    /// Fetch every secret whose key starts with `prefix` (all when `None`).
    /// An empty map is a valid result.
    async fn get_secrets(&self, prefix: Option<&str>) -> Result<HashMap<String, String>>;
}

// ============================================================================
// Environment slug normalization
// ============================================================================

/// Map common environment aliases to the secret store's slug format.
pub fn normalize_environment_name(env: &str) -> String {
    let normalized = env.trim().to_lowercase();
    match normalized.as_str() {
        "dev" | "development" => "dev".to_string(),
        "stage" | "staging" => "staging".to_string(),
        "prod" | "production" => "prod".to_string(),
        _ => normalized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvironmentStore {
        pairs.iter().copied().collect()
    }

    #[test]
    fn normalizes_aliases() {
        assert_eq!(normalize_environment_name("Production"), "prod");
        assert_eq!(normalize_environment_name("development"), "dev");
        assert_eq!(normalize_environment_name(" STAGE "), "staging");
        assert_eq!(normalize_environment_name("staging"), "staging");
        assert_eq!(normalize_environment_name(" QA-East "), "qa-east");
    }

    #[test]
    fn disabled_when_nothing_set() {
        let config = SecretManagerConfig::from_env(&env(&[]), "auth");
        assert!(!config.enabled);
        assert_eq!(config.backend, SecretBackendKind::None);
        assert!(!config.is_active());
    }

    #[test]
    fn reads_infisical_settings() {
        let config = SecretManagerConfig::from_env(
            &env(&[
                ("SECRET_MANAGER_ENABLED", "true"),
                ("SECRET_MANAGER_TYPE", "Infisical"),
                ("SECRET_MANAGER_PROJECT_ID", "proj-1"),
                ("SECRET_MANAGER_ENVIRONMENT", "staging"),
                ("INFISICAL_TOKEN", "st.token"),
            ]),
            "auth",
        );
        assert!(config.is_active());
        assert_eq!(config.project_id.as_deref(), Some("proj-1"));
        assert_eq!(config.secret_path, "/");
        assert_eq!(config.endpoint_url.as_deref(), Some(DEFAULT_INFISICAL_URL));
        assert_eq!(config.auth_token.as_deref(), Some("st.token"));
    }

    #[test]
    fn enabled_flag_must_be_exactly_true() {
        let config = SecretManagerConfig::from_env(
            &env(&[
                ("SECRET_MANAGER_ENABLED", "yes"),
                ("SECRET_MANAGER_TYPE", "infisical"),
            ]),
            "auth",
        );
        assert!(!config.enabled);
        assert!(!config.is_active());
    }

    #[test]
    fn unknown_backend_maps_to_none() {
        let config = SecretManagerConfig::from_env(
            &env(&[
                ("SECRET_MANAGER_ENABLED", "true"),
                ("SECRET_MANAGER_TYPE", "vault"),
            ]),
            "auth",
        );
        assert_eq!(config.backend, SecretBackendKind::None);
        assert!(!config.is_active());
    }
}
