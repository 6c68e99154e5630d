//! Template-store and outbound-mail capability types.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Templates
// ============================================================================

/// Primitive type tag of a template variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    String,
    Number,
}

/// A variable declared by a template, with the value used when a send omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateVariable {
    pub key: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
    #[serde(rename = "fallback_value")]
    pub fallback: serde_json::Value,
}

impl TemplateVariable {
    pub fn string(key: &str, fallback: &str) -> Self {
        Self {
            key: key.to_string(),
            kind: VariableKind::String,
            fallback: serde_json::Value::String(fallback.to_string()),
        }
    }
}

/// A template as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// `draft` or `published`; absent on create responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl TemplateRecord {
    /// Created but never published; sends referencing it would fail.
    pub fn is_draft(&self) -> bool {
        self.status.as_deref() == Some("draft")
    }
}

/// One page of a template listing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplatePage {
    #[serde(default)]
    pub data: Vec<TemplateRecord>,
    #[serde(default)]
    pub has_more: bool,
}

impl TemplatePage {
    /// Cursor for the following page, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_more {
            self.data.last().map(|t| t.id.as_str())
        } else {
            None
        }
    }
}

/// Body of a template creation request.
#[derive(Debug, Clone, Serialize)]
pub struct NewTemplate {
    pub name: String,
    pub html: String,
    pub variables: Vec<TemplateVariable>,
}

/// Remote template store operations used by reconciliation.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn list_templates(&self, limit: u32, after: Option<&str>) -> Result<TemplatePage>;

    async fn create_template(&self, template: &NewTemplate) -> Result<TemplateRecord>;

    async fn publish_template(&self, id: &str) -> Result<()>;

    /// Create then publish in one step.
    async fn create_and_publish(&self, template: &NewTemplate) -> Result<TemplateRecord> {
        let record = self.create_template(template).await?;
        self.publish_template(&record.id).await?;
        Ok(record)
    }
}

// ============================================================================
// Sending
// ============================================================================

/// Reference to a stored template plus its variable values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateRef {
    pub id: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, serde_json::Value>,
}

/// An outbound message. Either `template` or at least one of `html`/`text`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SendEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateRef>,
}

impl SendEmail {
    /// Check the body rule before anything goes on the wire.
    pub fn validate(&self) -> Result<()> {
        if self.to.is_empty() {
            return Err(crate::error::Error::InvalidConfiguration(
                "email has no recipients".to_string(),
            ));
        }
        if self.template.is_none() && self.html.is_none() && self.text.is_none() {
            return Err(crate::error::Error::InvalidConfiguration(
                "either html or text must be provided when not using a template".to_string(),
            ));
        }
        Ok(())
    }

    pub fn uses_template(&self) -> bool {
        self.template.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SentEmail {
    pub id: String,
}

/// Outbound mail delivery.
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_email(&self, email: &SendEmail) -> Result<SentEmail>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn variable_wire_shape() {
        let var = TemplateVariable::string("OTP", "000000");
        assert_eq!(
            serde_json::to_value(&var).unwrap(),
            json!({"key": "OTP", "type": "string", "fallback_value": "000000"})
        );
    }

    #[test]
    fn next_cursor_only_when_more() {
        let page: TemplatePage = serde_json::from_value(json!({
            "object": "list",
            "has_more": true,
            "data": [
                {"id": "t1", "name": "a", "status": "published"},
                {"id": "t2", "name": "b", "status": "draft"}
            ]
        }))
        .unwrap();
        assert_eq!(page.next_cursor(), Some("t2"));
        assert!(!page.data[0].is_draft());

        let last = TemplatePage {
            has_more: false,
            ..page
        };
        assert_eq!(last.next_cursor(), None);
        assert!(last.data[1].is_draft());
    }

    #[test]
    fn send_requires_body_without_template() {
        let mut email = SendEmail {
            from: "a@example.com".into(),
            to: vec!["b@example.com".into()],
            subject: "hi".into(),
            html: None,
            text: None,
            template: None,
        };
        assert!(email.validate().is_err());
        email.text = Some("plain".into());
        assert!(email.validate().is_ok());
        email.to.clear();
        assert!(email.validate().is_err());
    }
}
