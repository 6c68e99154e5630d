//! Makes sure every catalog template exists and is published remotely.
//!
//! The run is strictly sequential with a pause between catalog entries, so the
//! store's request rate limit is respected without any concurrency control.

use super::classify::{classify_error, FailureClass};
use super::templates::{catalog, TemplateDesired, TemplateIdCache};
use super::types::{NewTemplate, TemplateRecord, TemplateStore};
use crate::error::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

// ============================================================================
// Options and results
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Pause between catalog entries.
    pub inter_call_delay: Duration,
    /// Pause before the single listing retry after a rate limit.
    pub retry_backoff: Duration,
    pub page_size: u32,
    pub max_pages: usize,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            inter_call_delay: Duration::from_millis(600),
            retry_backoff: Duration::from_millis(1000),
            page_size: 100,
            max_pages: 10,
        }
    }
}

impl ReconcileOptions {
    /// No pauses at all.
    pub fn immediate() -> Self {
        Self {
            inter_call_delay: Duration::ZERO,
            retry_backoff: Duration::ZERO,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    RateLimited,
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    AlreadyExists(String),
    Created(String),
    Skipped(SkipReason),
}

impl ReconciliationOutcome {
    pub fn template_id(&self) -> Option<&str> {
        match self {
            ReconciliationOutcome::AlreadyExists(id) | ReconciliationOutcome::Created(id) => {
                Some(id)
            }
            ReconciliationOutcome::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconcileReport {
    pub degraded: bool,
    /// `(logical name, outcome)` in catalog order. Empty when degraded.
    pub outcomes: Vec<(String, ReconciliationOutcome)>,
    pub finished_at: DateTime<Utc>,
}

impl ReconcileReport {
    pub fn count(&self, pred: impl Fn(&ReconciliationOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

// ============================================================================
// Reconciler
// ============================================================================

pub struct TemplateReconciler {
    store: Arc<dyn TemplateStore>,
    cache: Arc<TemplateIdCache>,
    options: ReconcileOptions,
}

impl TemplateReconciler {
    pub fn new(store: Arc<dyn TemplateStore>, cache: Arc<TemplateIdCache>) -> Self {
        Self::with_options(store, cache, ReconcileOptions::default())
    }

    pub fn with_options(
        store: Arc<dyn TemplateStore>,
        cache: Arc<TemplateIdCache>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            store,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &Arc<TemplateIdCache> {
        &self.cache
    }

    /// Run one reconciliation pass over the catalog.
    pub async fn run(&self) -> ReconcileReport {
        if self.access_is_restricted().await {
            warn!(
                "Template store credential is restricted to sending; \
                 using inline HTML for all emails"
            );
            self.cache.set_degraded(true);
            return ReconcileReport {
                degraded: true,
                outcomes: Vec::new(),
                finished_at: Utc::now(),
            };
        }

        let desired = catalog();
        let mut outcomes = Vec::with_capacity(desired.len());
        for (index, template) in desired.iter().enumerate() {
            if index > 0 && !self.options.inter_call_delay.is_zero() {
                tokio::time::sleep(self.options.inter_call_delay).await;
            }
            let outcome = self.reconcile_one(template).await;
            if let Some(id) = outcome.template_id() {
                self.cache.insert(&template.logical_name, id);
            }
            outcomes.push((template.logical_name.clone(), outcome));
        }

        self.cache.set_degraded(false);
        let report = ReconcileReport {
            degraded: false,
            outcomes,
            finished_at: Utc::now(),
        };
        info!(
            "Template sync finished: {} existing, {} created, {} skipped",
            report.count(|o| matches!(o, ReconciliationOutcome::AlreadyExists(_))),
            report.count(|o| matches!(o, ReconciliationOutcome::Created(_))),
            report.count(|o| matches!(o, ReconciliationOutcome::Skipped(_))),
        );
        report
    }

    /// True only when the store says this credential cannot manage templates.
    async fn access_is_restricted(&self) -> bool {
        match self.store.list_templates(1, None).await {
            Ok(_) => false,
            Err(e) => match classify_error(&e) {
                FailureClass::Restricted => true,
                FailureClass::RateLimited => {
                    warn!("Template access check was rate limited; continuing");
                    false
                }
                FailureClass::Other => {
                    warn!("Template access check failed: {e}; continuing");
                    false
                }
            },
        }
    }

    async fn reconcile_one(&self, template: &TemplateDesired) -> ReconciliationOutcome {
        let name = template.logical_name.as_str();

        let existing = match self.find_with_retry(name).await {
            Ok(existing) => existing,
            Err(e) if classify_error(&e) == FailureClass::RateLimited => {
                warn!("Rate limited while checking template \"{name}\"; skipping");
                return ReconciliationOutcome::Skipped(SkipReason::RateLimited);
            }
            Err(e) => {
                warn!("Failed to check template \"{name}\": {e}");
                return ReconciliationOutcome::Skipped(SkipReason::Error(e.to_string()));
            }
        };

        if let Some(record) = existing {
            if record.is_draft() {
                // left unpublished by an earlier run whose publish step failed
                info!("Template \"{name}\" exists as a draft ({}); publishing", record.id);
                if let Err(e) = self.store.publish_template(&record.id).await {
                    warn!("Failed to publish draft template \"{name}\": {e}");
                    return Self::skipped(e);
                }
            } else {
                info!("Template \"{name}\" already exists ({})", record.id);
            }
            return ReconciliationOutcome::AlreadyExists(record.id);
        }

        let new_template = NewTemplate {
            name: template.logical_name.clone(),
            html: template.html.clone(),
            variables: template.variables.clone(),
        };
        match self.store.create_and_publish(&new_template).await {
            Ok(record) => {
                info!(
                    "Created and published template \"{name}\" ({}, {})",
                    template.display_name, record.id
                );
                ReconciliationOutcome::Created(record.id)
            }
            Err(e) => {
                warn!("Failed to create template \"{name}\": {e}");
                Self::skipped(e)
            }
        }
    }

    fn skipped(error: crate::error::Error) -> ReconciliationOutcome {
        match classify_error(&error) {
            FailureClass::RateLimited => ReconciliationOutcome::Skipped(SkipReason::RateLimited),
            _ => ReconciliationOutcome::Skipped(SkipReason::Error(error.to_string())),
        }
    }

    async fn find_with_retry(&self, name: &str) -> Result<Option<TemplateRecord>> {
        match self.find_existing(name).await {
            Err(e) if classify_error(&e) == FailureClass::RateLimited => {
                info!(
                    "Rate limited listing templates; retrying in {}ms",
                    self.options.retry_backoff.as_millis()
                );
                tokio::time::sleep(self.options.retry_backoff).await;
                self.find_existing(name).await
            }
            other => other,
        }
    }

    /// Walk the listing pages looking for an exact name match.
    async fn find_existing(&self, name: &str) -> Result<Option<TemplateRecord>> {
        let mut cursor: Option<String> = None;
        for _ in 0..self.options.max_pages.max(1) {
            let page = self
                .store
                .list_templates(self.options.page_size, cursor.as_deref())
                .await?;
            if let Some(found) = page.data.iter().find(|t| t.name == name) {
                return Ok(Some(found.clone()));
            }
            match page.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => return Ok(None),
            }
        }
        warn!(
            "Stopped listing templates after {} pages",
            self.options.max_pages
        );
        Ok(None)
    }
}
