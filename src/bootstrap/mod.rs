//! Startup bootstrap gate.
//!
//! The gate loads remote secrets into the environment store exactly once and
//! hands out the resulting [`ConfigSnapshot`]. Every subsystem that reads
//! configuration takes the snapshot returned by [`BootstrapGate::ensure_ready`],
//! so nothing can observe the environment before secrets are merged.

use crate::config::{Config, EnvironmentStore, DEFAULT_SECRET_PREFIXES, SERVICE_NAME};
use crate::error::Result;
use crate::secrets::{create_secret_manager, load_secrets_into_env, SecretManager, SecretManagerConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

// ============================================================================
// Snapshot
// ============================================================================

/// Where the values in a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Secret manager disabled; process environment only.
    Environment,
    /// Secrets were merged from the secret manager.
    SecretManager,
    /// Secret loading failed; whatever was merged before the failure plus
    /// the process environment.
    Fallback,
}

/// Finalized configuration, produced once by the gate.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub env: EnvironmentStore,
    pub config: Config,
    pub source: SnapshotSource,
    pub secrets_loaded: usize,
    pub resolved_at: DateTime<Utc>,
}

impl ConfigSnapshot {
    /// Build a snapshot directly from an environment store.
    pub fn from_env(env: EnvironmentStore, source: SnapshotSource, secrets_loaded: usize) -> Self {
        let config = Config::from_env(&env);
        Self {
            env,
            config,
            source,
            secrets_loaded,
            resolved_at: Utc::now(),
        }
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Settings for a [`BootstrapGate`].
#[derive(Clone)]
pub struct BootstrapOptions {
    pub service_name: String,
    /// Prefixes fetched in order; an empty entry marks the catch-all pass.
    pub prefixes: Vec<String>,
    /// Overrides the manager selected from configuration.
    pub manager: Option<Arc<dyn SecretManager>>,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
            prefixes: DEFAULT_SECRET_PREFIXES.iter().map(|p| p.to_string()).collect(),
            manager: None,
        }
    }
}

impl BootstrapOptions {
    pub fn with_manager(mut self, manager: Arc<dyn SecretManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn with_prefixes(mut self, prefixes: &[&str]) -> Self {
        self.prefixes = prefixes.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// Single-flight barrier in front of configuration.
///
/// The first call to [`ensure_ready`](Self::ensure_ready) runs the secret
/// loading sequence; concurrent callers wait on the same initialisation and
/// later callers get the cached snapshot. Loading failures are logged and the
/// gate still resolves.
pub struct BootstrapGate {
    seed: EnvironmentStore,
    options: BootstrapOptions,
    snapshot: OnceCell<Arc<ConfigSnapshot>>,
    runs: AtomicUsize,
}

impl BootstrapGate {
    pub fn new(seed: EnvironmentStore, options: BootstrapOptions) -> Self {
        Self {
            seed,
            options,
            snapshot: OnceCell::new(),
            runs: AtomicUsize::new(0),
        }
    }

    /// Gate seeded from the current process environment with default options.
    pub fn from_process() -> Self {
        Self::new(EnvironmentStore::from_process(), BootstrapOptions::default())
    }

    /// Wait until configuration is final and return it.
    pub async fn ensure_ready(&self) -> Arc<ConfigSnapshot> {
        self.snapshot
            .get_or_init(|| async { Arc::new(self.bootstrap().await) })
            .await
            .clone()
    }

    /// Non-blocking readiness check.
    pub fn is_ready(&self) -> bool {
        self.snapshot.initialized()
    }

    /// The snapshot, if the gate has resolved.
    pub fn snapshot(&self) -> Option<Arc<ConfigSnapshot>> {
        self.snapshot.get().cloned()
    }

    /// How many times the loading sequence has started (at most once).
    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    async fn bootstrap(&self) -> ConfigSnapshot {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let mut env = self.seed.clone();
        let sm_config = SecretManagerConfig::from_env(&env, &self.options.service_name);

        if !sm_config.is_active() {
            info!("[Secrets] Secret manager disabled, using process environment");
            return ConfigSnapshot::from_env(env, SnapshotSource::Environment, 0);
        }

        match self.load(&sm_config, &mut env).await {
            Ok(loaded) => {
                info!("[Secrets] Loaded {loaded} secret(s) from secret manager");
                ConfigSnapshot::from_env(env, SnapshotSource::SecretManager, loaded)
            }
            Err(e) => {
                warn!(
                    "[Secrets] Warning: Failed to load secrets from secret manager: {e}. Falling back to .env files"
                );
                ConfigSnapshot::from_env(env, SnapshotSource::Fallback, 0)
            }
        }
    }

    async fn load(&self, sm_config: &SecretManagerConfig, env: &mut EnvironmentStore) -> Result<usize> {
        let manager = match &self.options.manager {
            Some(manager) => manager.clone(),
            None => create_secret_manager(sm_config)?,
        };
        let prefixes: Vec<&str> = self.options.prefixes.iter().map(String::as_str).collect();
        let summary = load_secrets_into_env(manager.as_ref(), &prefixes, env).await?;
        Ok(summary.total())
    }
}
