//! Compiled-in template catalog and the id cache filled by reconciliation.

use super::types::TemplateVariable;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// Logical names
// ============================================================================

pub const OTP_SIGN_IN: &str = "otp-sign-in";
pub const OTP_EMAIL_VERIFICATION: &str = "otp-email-verification";
pub const OTP_FORGET_PASSWORD: &str = "otp-forget-password";
pub const ORGANIZATION_INVITATION: &str = "organization-invitation";

/// Which OTP email is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpKind {
    SignIn,
    EmailVerification,
    ForgetPassword,
}

impl OtpKind {
    pub fn template_name(self) -> &'static str {
        match self {
            OtpKind::SignIn => OTP_SIGN_IN,
            OtpKind::EmailVerification => OTP_EMAIL_VERIFICATION,
            OtpKind::ForgetPassword => OTP_FORGET_PASSWORD,
        }
    }

    pub fn subject(self) -> &'static str {
        match self {
            OtpKind::SignIn => "Your sign-in code",
            OtpKind::EmailVerification => "Verify your email",
            OtpKind::ForgetPassword => "Reset your password",
        }
    }

    fn display_name(self) -> &'static str {
        match self {
            OtpKind::SignIn => "Sign-In Verification Code",
            OtpKind::EmailVerification => "Email Verification Code",
            OtpKind::ForgetPassword => "Password Reset Code",
        }
    }

    fn copy(self) -> OtpCopy {
        match self {
            OtpKind::SignIn => OtpCopy {
                title: "Your Sign-In Code",
                description: "Your verification code is:",
                footer: "If you didn't request this code, please ignore this email.",
            },
            OtpKind::EmailVerification => OtpCopy {
                title: "Verify Your Email",
                description: "Your verification code is:",
                footer: "If you didn't request this code, please ignore this email.",
            },
            OtpKind::ForgetPassword => OtpCopy {
                title: "Reset Your Password",
                description: "Your password reset code is:",
                footer: "If you didn't request a password reset, please ignore this email.",
            },
        }
    }
}

struct OtpCopy {
    title: &'static str,
    description: &'static str,
    footer: &'static str,
}

// ============================================================================
// Catalog
// ============================================================================

/// A template that should exist remotely.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDesired {
    pub logical_name: String,
    pub display_name: String,
    pub html: String,
    pub variables: Vec<TemplateVariable>,
}

/// The fixed catalog, in reconciliation order.
pub fn catalog() -> Vec<TemplateDesired> {
    let mut templates: Vec<TemplateDesired> = [
        OtpKind::SignIn,
        OtpKind::EmailVerification,
        OtpKind::ForgetPassword,
    ]
    .into_iter()
    .map(|kind| TemplateDesired {
        logical_name: kind.template_name().to_string(),
        display_name: kind.display_name().to_string(),
        html: otp_template_html(kind),
        variables: vec![TemplateVariable::string("OTP", "000000")],
    })
    .collect();

    templates.push(TemplateDesired {
        logical_name: ORGANIZATION_INVITATION.to_string(),
        display_name: "Organization Invitation".to_string(),
        html: invitation_template_html(),
        variables: vec![
            TemplateVariable::string("ORGANIZATION_NAME", "Organization"),
            TemplateVariable::string("INVITATION_URL", ""),
        ],
    });

    templates
}

// ============================================================================
// Remote template bodies (placeholders filled by the store)
// ============================================================================

fn otp_template_html(kind: OtpKind) -> String {
    let copy = kind.copy();
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #333; margin-bottom: 20px;">{title}</h2>
  <p style="color: #666; font-size: 16px; margin-bottom: 20px;">{description}</p>
  <div style="background-color: #f4f4f4; padding: 20px; text-align: center; font-size: 32px; font-weight: bold; letter-spacing: 5px; margin: 20px 0; border-radius: 8px;">
    {{{{{{OTP}}}}}}
  </div>
  <p style="color: #666; font-size: 14px; margin-bottom: 10px;">This code will expire in 5 minutes.</p>
  <p style="color: #999; font-size: 12px; margin-top: 20px;">{footer}</p>
</div>"#,
        title = copy.title,
        description = copy.description,
        footer = copy.footer,
    )
}

fn invitation_template_html() -> String {
    r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #333; margin-bottom: 20px;">Organization Invitation</h2>
  <p style="color: #666; font-size: 16px; margin-bottom: 20px;">
    You have been invited to join <strong style="color: #333;">{{{ORGANIZATION_NAME}}}</strong>.
  </p>
  <p style="margin: 30px 0;">
    <a href="{{{INVITATION_URL}}}" style="background-color: #007bff; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; display: inline-block; font-weight: bold;">
      Accept Invitation
    </a>
  </p>
  <p style="color: #999; font-size: 12px; margin-top: 20px;">
    If you didn't expect this invitation, you can safely ignore this email.
  </p>
</div>"#
        .to_string()
}

// ============================================================================
// Inline fallback bodies (rendered locally)
// ============================================================================

/// Escape text for interpolation into HTML.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_otp_inline(kind: OtpKind, otp: &str) -> String {
    let copy = kind.copy();
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>{title}</h2>
  <p>{description}</p>
  <div style="background-color: #f4f4f4; padding: 20px; text-align: center; font-size: 32px; font-weight: bold; letter-spacing: 5px; margin: 20px 0;">
    {otp}
  </div>
  <p>This code will expire in 5 minutes.</p>
  <p>{footer}</p>
</div>"#,
        title = copy.title,
        description = copy.description,
        otp = escape_html(otp),
        footer = copy.footer,
    )
}

pub fn render_invitation_inline(organization: &str, invitation_url: Option<&str>) -> String {
    let button = match invitation_url.filter(|u| !u.is_empty()) {
        Some(url) => format!(
            r#"
  <p style="margin: 30px 0;">
    <a href="{url}" style="background-color: #007bff; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; display: inline-block;">
      Accept Invitation
    </a>
  </p>"#,
            url = escape_html(url)
        ),
        None => String::new(),
    };
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2>Organization Invitation</h2>
  <p>You have been invited to join <strong>{organization}</strong>.</p>{button}
  <p>If you didn't expect this invitation, you can safely ignore this email.</p>
</div>"#,
        organization = escape_html(organization),
    )
}

pub fn render_reset_password_inline(url: &str) -> String {
    let url = escape_html(url);
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h2 style="color: #333; margin-bottom: 20px;">Reset Your Password</h2>
  <p style="color: #666; font-size: 16px; margin-bottom: 20px;">
    Click the button below to reset your password. This link will expire in 1 hour.
  </p>
  <p style="margin: 30px 0;">
    <a href="{url}" style="background-color: #007bff; color: white; padding: 12px 24px; text-decoration: none; border-radius: 5px; display: inline-block; font-weight: bold;">
      Reset Password
    </a>
  </p>
  <p style="color: #999; font-size: 12px; margin-top: 20px;">
    If you didn't request a password reset, please ignore this email. Your password will remain unchanged.
  </p>
  <p style="color: #999; font-size: 12px; margin-top: 10px;">
    If the button doesn't work, copy and paste this link into your browser:<br>
    <a href="{url}" style="color: #007bff; word-break: break-all;">{url}</a>
  </p>
</div>"#
    )
}

// ============================================================================
// Id cache
// ============================================================================

/// Logical template name → remote id, plus the degraded-mode flag.
///
/// Only the reconciler writes; senders read.
#[derive(Debug, Default)]
pub struct TemplateIdCache {
    ids: DashMap<String, String>,
    degraded: AtomicBool,
}

impl TemplateIdCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, logical_name: &str) -> Option<String> {
        self.ids.get(logical_name).map(|id| id.value().clone())
    }

    pub fn insert(&self, logical_name: &str, id: &str) {
        self.ids.insert(logical_name.to_string(), id.to_string());
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// True when the last reconciliation found a send-only credential.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    pub fn set_degraded(&self, degraded: bool) {
        self.degraded.store(degraded, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_order_and_variables() {
        let names: Vec<String> = catalog().into_iter().map(|t| t.logical_name).collect();
        assert_eq!(
            names,
            vec![
                OTP_SIGN_IN,
                OTP_EMAIL_VERIFICATION,
                OTP_FORGET_PASSWORD,
                ORGANIZATION_INVITATION
            ]
        );

        let invitation = catalog().pop().unwrap();
        let keys: Vec<&str> = invitation.variables.iter().map(|v| v.key.as_str()).collect();
        assert_eq!(keys, vec!["ORGANIZATION_NAME", "INVITATION_URL"]);
    }

    #[test]
    fn remote_otp_template_has_placeholder() {
        let html = otp_template_html(OtpKind::ForgetPassword);
        assert!(html.contains("{{{OTP}}}"));
        assert!(html.contains("Reset Your Password"));
        assert!(invitation_template_html().contains("{{{INVITATION_URL}}}"));
    }

    #[test]
    fn inline_rendering_escapes_input() {
        let html = render_invitation_inline("<Acme & Co>", Some("https://x/?a=1&b=2"));
        assert!(html.contains("&lt;Acme &amp; Co&gt;"));
        assert!(html.contains("https://x/?a=1&amp;b=2"));

        let no_button = render_invitation_inline("Acme", None);
        assert!(!no_button.contains("Accept Invitation"));

        assert!(render_otp_inline(OtpKind::SignIn, "123456").contains("123456"));
        assert!(render_reset_password_inline("https://r").contains("https://r"));
    }

    #[test]
    fn cache_roundtrip_and_flag() {
        let cache = TemplateIdCache::new();
        assert!(cache.get(OTP_SIGN_IN).is_none());
        cache.insert(OTP_SIGN_IN, "tmpl_1");
        assert_eq!(cache.get(OTP_SIGN_IN).as_deref(), Some("tmpl_1"));
        assert!(!cache.is_degraded());
        cache.set_degraded(true);
        assert!(cache.is_degraded());
    }
}
