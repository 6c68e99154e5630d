use super::ResourceSpec;
use crate::bootstrap::ConfigSnapshot;
use crate::config::RESEND_API_KEY;
use crate::error::Result;
use crate::mail::ResendClient;

/// Outbound mail and template-store client keyed by `RESEND_API_KEY`.
#[derive(Debug, Default)]
pub struct MailResource;

impl ResourceSpec for MailResource {
    type Output = ResendClient;

    fn name(&self) -> &'static str {
        "mail"
    }

    fn config_key(&self) -> &'static str {
        RESEND_API_KEY
    }

    fn construct(&self, value: &str, snapshot: &ConfigSnapshot) -> Result<ResendClient> {
        ResendClient::new(value.to_string(), snapshot.config.mail.api_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::SnapshotSource;
    use crate::config::EnvironmentStore;
    use crate::error::Error;
    use crate::resources::LazyResource;

    #[test]
    fn base_url_comes_from_snapshot() {
        let env: EnvironmentStore = [
            (RESEND_API_KEY, "re_test"),
            ("RESEND_API_URL", "http://127.0.0.1:4010/"),
        ]
        .into_iter()
        .collect();
        let snapshot = ConfigSnapshot::from_env(env, SnapshotSource::Environment, 0);

        let client = LazyResource::new(MailResource).get_instance(&snapshot).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:4010");
        let shown = format!("{client:?}");
        assert!(shown.contains("127.0.0.1:4010"));
        assert!(!shown.contains("re_test"));
    }

    #[test]
    fn required_key_is_reported() {
        let snapshot =
            ConfigSnapshot::from_env(EnvironmentStore::new(), SnapshotSource::Environment, 0);
        let resource = LazyResource::new(MailResource);
        let err = resource.get(&snapshot).unwrap_err();
        assert!(matches!(err, Error::MissingConfiguration { ref key } if key == RESEND_API_KEY));
        assert!(matches!(
            resource.get(&snapshot),
            Err(Error::MissingConfiguration { .. })
        ));
    }
}
