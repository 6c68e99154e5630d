//! Failure classification for template-store responses.
//!
//! Structured signals (HTTP status, error `name`) are checked first; free-text
//! matching on the message is the last resort. All matching lives here.

use crate::error::Error;

/// Error names the template store uses for the conditions we care about.
const RATE_LIMIT_CODES: &[&str] = &["rate_limit_exceeded", "daily_quota_exceeded"];
const RESTRICTED_CODES: &[&str] = &["restricted_api_key"];

const RATE_LIMIT_PHRASES: &[&str] = &["too many requests", "rate limit"];
const RESTRICTED_PHRASES: &[&str] = &["restricted", "only send", "only sending"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    RateLimited,
    Restricted,
    Other,
}

/// Classify a failed call from its status, error code and message.
pub fn classify_failure(status: Option<u16>, code: Option<&str>, message: &str) -> FailureClass {
    if status == Some(429) {
        return FailureClass::RateLimited;
    }
    if let Some(code) = code.map(str::to_lowercase) {
        if RESTRICTED_CODES.contains(&code.as_str()) {
            return FailureClass::Restricted;
        }
        if RATE_LIMIT_CODES.contains(&code.as_str()) {
            return FailureClass::RateLimited;
        }
    }

    let message = message.to_lowercase();
    if RESTRICTED_PHRASES.iter().any(|p| message.contains(p)) {
        FailureClass::Restricted
    } else if RATE_LIMIT_PHRASES.iter().any(|p| message.contains(p)) {
        FailureClass::RateLimited
    } else {
        FailureClass::Other
    }
}

/// Classify an already-built [`Error`].
pub fn classify_error(error: &Error) -> FailureClass {
    match error {
        Error::RateLimited(_) => FailureClass::RateLimited,
        Error::RestrictedAccess(_) => FailureClass::Restricted,
        Error::TemplateStore { status, message } => classify_failure(Some(*status), None, message),
        Error::Transport(e) => classify_failure(e.status().map(|s| s.as_u16()), None, &e.to_string()),
        _ => FailureClass::Other,
    }
}

/// Turn a failed response into the matching [`Error`] variant.
pub fn error_from_response(status: u16, code: Option<&str>, message: String) -> Error {
    match classify_failure(Some(status), code, &message) {
        FailureClass::RateLimited => Error::RateLimited(message),
        FailureClass::Restricted => Error::RestrictedAccess(message),
        FailureClass::Other => Error::TemplateStore { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_is_rate_limited() {
        assert_eq!(classify_failure(Some(429), None, ""), FailureClass::RateLimited);
    }

    #[test]
    fn codes_win_over_messages() {
        assert_eq!(
            classify_failure(Some(401), Some("restricted_api_key"), "unauthorized"),
            FailureClass::Restricted
        );
        assert_eq!(
            classify_failure(Some(400), Some("rate_limit_exceeded"), "slow down"),
            FailureClass::RateLimited
        );
    }

    #[test]
    fn message_heuristics_as_fallback() {
        assert_eq!(
            classify_failure(Some(401), None, "This API key is restricted to only send emails"),
            FailureClass::Restricted
        );
        assert_eq!(
            classify_failure(None, None, "Too Many Requests"),
            FailureClass::RateLimited
        );
        assert_eq!(classify_failure(Some(500), None, "internal"), FailureClass::Other);
    }

    #[test]
    fn builds_matching_errors() {
        assert!(error_from_response(429, None, "x".into()).is_rate_limited());
        assert!(error_from_response(401, Some("restricted_api_key"), "x".into()).is_restricted());
        assert!(matches!(
            error_from_response(422, Some("validation_error"), "bad".into()),
            Error::TemplateStore { status: 422, .. }
        ));
    }

    #[test]
    fn classifies_errors() {
        assert_eq!(classify_error(&Error::RateLimited("x".into())), FailureClass::RateLimited);
        assert_eq!(
            classify_error(&Error::TemplateStore {
                status: 403,
                message: "key can only send emails".into()
            }),
            FailureClass::Restricted
        );
        assert_eq!(classify_error(&Error::NotConfigured), FailureClass::Other);
    }
}
