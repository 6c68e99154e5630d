use super::templates::{
    render_invitation_inline, render_otp_inline, render_reset_password_inline, OtpKind,
    TemplateIdCache, ORGANIZATION_INVITATION,
};
use super::types::{MailSender, SendEmail, SentEmail, TemplateRef};
use crate::error::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Sends the service's transactional emails.
///
/// A message goes out by remote template id when reconciliation cached one;
/// otherwise the locally rendered HTML is sent instead.
pub struct EmailService {
    sender: Arc<dyn MailSender>,
    templates: Arc<TemplateIdCache>,
    from_email: String,
}

impl EmailService {
    pub fn new(
        sender: Arc<dyn MailSender>,
        templates: Arc<TemplateIdCache>,
        from_email: String,
    ) -> Self {
        Self {
            sender,
            templates,
            from_email,
        }
    }

    pub fn from_email(&self) -> &str {
        &self.from_email
    }

    fn template_id(&self, logical_name: &str) -> Option<String> {
        if self.templates.is_degraded() {
            return None;
        }
        self.templates.get(logical_name)
    }

    fn message(&self, to: &str, subject: &str) -> SendEmail {
        SendEmail {
            from: self.from_email.clone(),
            to: vec![to.to_string()],
            subject: subject.to_string(),
            html: None,
            text: None,
            template: None,
        }
    }

    pub async fn send_verification_otp(
        &self,
        email: &str,
        otp: &str,
        kind: OtpKind,
    ) -> Result<SentEmail> {
        let mut message = self.message(email, kind.subject());
        match self.template_id(kind.template_name()) {
            Some(id) => {
                debug!("Sending {} via template {id}", kind.template_name());
                message.template = Some(TemplateRef {
                    id,
                    variables: HashMap::from([("OTP".to_string(), Value::from(otp))]),
                });
            }
            None => message.html = Some(render_otp_inline(kind, otp)),
        }
        let sent = self.sender.send_email(&message).await?;
        info!("Sent {} email ({})", kind.template_name(), sent.id);
        Ok(sent)
    }

    pub async fn send_invitation(
        &self,
        email: &str,
        organization: &str,
        invitation_url: Option<&str>,
    ) -> Result<SentEmail> {
        let subject = format!("Invitation to join {organization}");
        let mut message = self.message(email, &subject);
        match self.template_id(ORGANIZATION_INVITATION) {
            Some(id) => {
                message.template = Some(TemplateRef {
                    id,
                    variables: HashMap::from([
                        ("ORGANIZATION_NAME".to_string(), Value::from(organization)),
                        (
                            "INVITATION_URL".to_string(),
                            Value::from(invitation_url.unwrap_or_default()),
                        ),
                    ]),
                });
            }
            None => message.html = Some(render_invitation_inline(organization, invitation_url)),
        }
        let sent = self.sender.send_email(&message).await?;
        info!("Sent invitation email ({})", sent.id);
        Ok(sent)
    }

    /// Reset links have no remote template; always inline.
    pub async fn send_reset_password(&self, email: &str, url: &str) -> Result<SentEmail> {
        let mut message = self.message(email, "Reset your password");
        message.html = Some(render_reset_password_inline(url));
        self.sender.send_email(&message).await
    }

    /// Send a caller-built message; an empty `from` takes the service default.
    pub async fn send_custom(&self, mut message: SendEmail) -> Result<SentEmail> {
        if message.from.is_empty() {
            message.from = self.from_email.clone();
        }
        message.validate()?;
        self.sender.send_email(&message).await
    }
}
