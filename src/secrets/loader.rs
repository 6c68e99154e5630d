//! Merge secret-manager results into an [`EnvironmentStore`].

use super::types::SecretManager;
use crate::config::EnvironmentStore;
use crate::error::Result;
use tracing::debug;

/// Counts of keys written by [`load_secrets_into_env`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Keys written (with overwrite) by the prefixed passes.
    pub prefixed: usize,
    /// Keys written by the catch-all pass because they were absent.
    pub unscoped: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.prefixed + self.unscoped
    }
}

/// Load secrets for each prefix in order, then one unscoped pass.
///
/// Prefixed results overwrite whatever is in `env`, later prefixes winning.
/// The unscoped pass only fills keys that are still absent, so it never
/// clobbers explicit or prefixed values. An empty entry in `prefixes` marks
/// the catch-all position and is served by that final pass.
///
/// Stops at the first failed fetch; writes made before the failure stay in
/// `env`.
pub async fn load_secrets_into_env(
    manager: &dyn SecretManager,
    prefixes: &[&str],
    env: &mut EnvironmentStore,
) -> Result<LoadSummary> {
    let mut summary = LoadSummary::default();

    for prefix in prefixes.iter().filter(|p| !p.is_empty()) {
        let secrets = manager.get_secrets(Some(prefix)).await?;
        debug!(
            "Loaded {} secret(s) for prefix '{}' from {}",
            secrets.len(),
            prefix,
            manager.name()
        );
        for (key, value) in secrets {
            env.set(key, value);
            summary.prefixed += 1;
        }
    }

    let all = manager.get_secrets(None).await?;
    for (key, value) in all {
        if env.set_if_absent(&key, value) {
            summary.unscoped += 1;
        }
    }

    Ok(summary)
}
