//! Downstream clients constructed on first use.
//!
//! Each resource reads its configuration key from a finalized
//! [`ConfigSnapshot`], builds its client once and hands out the same `Arc`
//! afterwards. Resources do not wait on the bootstrap gate themselves; the
//! snapshot argument is the proof that the caller already did.

mod cache;
mod database;
mod mail;

pub use cache::{CacheClient, CacheResource, RetryPolicy};
pub use database::{parse_database_url, DatabasePool, DatabaseResource, DatabaseTarget, SqlitePool};
pub use mail::MailResource;

use crate::bootstrap::ConfigSnapshot;
use crate::error::{Error, Result};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Whether absence of a resource's configuration is fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    Optional,
}

/// Describes how to build one kind of resource.
pub trait ResourceSpec: Send + Sync {
    type Output: Send + Sync;

    /// Display name for logging.
    fn name(&self) -> &'static str;

    /// Environment key holding the connection string or credential.
    fn config_key(&self) -> &'static str;

    fn requirement(&self) -> Requirement {
        Requirement::Required
    }

    /// Build the client from the configured value. Must not block on I/O.
    fn construct(&self, value: &str, snapshot: &ConfigSnapshot) -> Result<Self::Output>;
}

/// A resource built at most once, on first successful access.
pub struct LazyResource<S: ResourceSpec> {
    spec: S,
    instance: OnceCell<Arc<S::Output>>,
    constructions: AtomicUsize,
}

impl<S: ResourceSpec> LazyResource<S> {
    pub fn new(spec: S) -> Self {
        Self {
            spec,
            instance: OnceCell::new(),
            constructions: AtomicUsize::new(0),
        }
    }

    /// Return the shared instance, building it on first call.
    ///
    /// Fails with `MissingConfiguration` when the key is absent. A failed
    /// construction is not cached; the next call tries again.
    pub fn get_instance(&self, snapshot: &ConfigSnapshot) -> Result<Arc<S::Output>> {
        self.instance
            .get_or_try_init(|| {
                let key = self.spec.config_key();
                let value = snapshot
                    .env
                    .get_non_empty(key)
                    .ok_or_else(|| Error::missing(key))?;
                let output = self.spec.construct(value, snapshot)?;
                self.constructions.fetch_add(1, Ordering::SeqCst);
                info!("Initialized {} client", self.spec.name());
                Ok(Arc::new(output))
            })
            .cloned()
    }

    /// Like [`get_instance`](Self::get_instance) but returns `None` when the
    /// resource is not configured or cannot be built.
    pub fn get_optional(&self, snapshot: &ConfigSnapshot) -> Option<Arc<S::Output>> {
        match self.get_instance(snapshot) {
            Ok(instance) => Some(instance),
            Err(Error::MissingConfiguration { key }) => {
                debug!("{} disabled: {key} not set", self.spec.name());
                None
            }
            Err(e) => {
                tracing::error!("{} unavailable: {e}", self.spec.name());
                None
            }
        }
    }

    /// Access according to the resource's [`Requirement`].
    pub fn get(&self, snapshot: &ConfigSnapshot) -> Result<Option<Arc<S::Output>>> {
        match self.spec.requirement() {
            Requirement::Required => self.get_instance(snapshot).map(Some),
            Requirement::Optional => Ok(self.get_optional(snapshot)),
        }
    }

    /// The instance if it has already been built; never constructs.
    pub fn instance(&self) -> Option<Arc<S::Output>> {
        self.instance.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Number of successful constructions (0 or 1).
    pub fn construction_count(&self) -> usize {
        self.constructions.load(Ordering::SeqCst)
    }

    pub fn spec(&self) -> &S {
        &self.spec
    }
}

/// The service's lazily built clients.
pub struct Resources {
    pub database: LazyResource<DatabaseResource>,
    pub cache: LazyResource<CacheResource>,
    pub mail: LazyResource<MailResource>,
}

impl Resources {
    pub fn new() -> Self {
        Self {
            database: LazyResource::new(DatabaseResource),
            cache: LazyResource::new(CacheResource::default()),
            mail: LazyResource::new(MailResource),
        }
    }
}

impl Default for Resources {
    fn default() -> Self {
        Self::new()
    }
}
