//! Transactional email: the remote template catalog, its reconciliation and
//! the sending service that falls back to inline HTML.

pub mod classify;
mod client;
mod email;
mod reconciler;
pub mod templates;
mod types;

pub use classify::{classify_error, classify_failure, FailureClass};
pub use client::ResendClient;
pub use email::EmailService;
pub use reconciler::{
    ReconcileOptions, ReconcileReport, ReconciliationOutcome, SkipReason, TemplateReconciler,
};
pub use templates::{catalog, OtpKind, TemplateDesired, TemplateIdCache};
pub use types::{
    MailSender, NewTemplate, SendEmail, SentEmail, TemplatePage, TemplateRecord, TemplateRef,
    TemplateStore, TemplateVariable, VariableKind,
};
