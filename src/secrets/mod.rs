//! Remote secret-manager integration.
//!
//! Secrets are fetched once at startup and merged into the environment store
//! before any configuration is derived:
//! 1. **Select**: [`create_secret_manager`] picks a backend from
//!    [`SecretManagerConfig`]
//! 2. **Fetch**: prefixed passes, then one catch-all pass
//! 3. **Merge**: [`load_secrets_into_env`] applies the precedence rules

pub mod infisical_provider;
pub mod loader;
pub mod noop_provider;
pub mod types;

pub use infisical_provider::InfisicalSecretManager;
pub use loader::{load_secrets_into_env, LoadSummary};
pub use noop_provider::NoOpSecretManager;
pub use types::{normalize_environment_name, SecretBackendKind, SecretManager, SecretManagerConfig};

use crate::error::Result;
use std::sync::Arc;
use tracing::info;

/// Build the secret manager selected by `config`.
///
/// Disabled configurations get the no-op manager. An enabled remote backend
/// without a token is an error.
pub fn create_secret_manager(config: &SecretManagerConfig) -> Result<Arc<dyn SecretManager>> {
    if !config.is_active() {
        return Ok(Arc::new(NoOpSecretManager::new()));
    }

    match config.backend {
        SecretBackendKind::Infisical => {
            let manager = InfisicalSecretManager::new(config)?;
            info!(
                "Using Infisical secret manager for service '{}' (environment '{}', path '{}')",
                config.service_name,
                normalize_environment_name(&config.environment),
                config.secret_path
            );
            Ok(Arc::new(manager))
        }
        SecretBackendKind::None => Ok(Arc::new(NoOpSecretManager::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn disabled_config_yields_noop() {
        let manager = create_secret_manager(&SecretManagerConfig::disabled("auth")).unwrap();
        assert_eq!(manager.name(), "none");
    }

    #[test]
    fn enabled_without_token_fails() {
        let mut config = SecretManagerConfig::disabled("auth");
        config.enabled = true;
        config.backend = SecretBackendKind::Infisical;
        let err = create_secret_manager(&config).err().unwrap();
        assert!(matches!(err, Error::MissingConfiguration { .. }));
    }

    #[test]
    fn enabled_with_token_yields_infisical() {
        let mut config = SecretManagerConfig::disabled("auth");
        config.enabled = true;
        config.backend = SecretBackendKind::Infisical;
        config.auth_token = Some("tok".into());
        let manager = create_secret_manager(&config).unwrap();
        assert_eq!(manager.name(), "infisical");
    }
}
