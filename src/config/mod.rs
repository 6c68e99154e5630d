mod defaults;
mod env;
mod validation;

pub use defaults::*;
pub use env::EnvironmentStore;
pub use validation::*;

use serde::Serialize;

/// Typed service configuration derived from a finalized [`EnvironmentStore`].
///
/// Built once by the bootstrap gate; nothing re-reads the environment after
/// that.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub environment: String,
    pub is_production: bool,

    pub port: u16,
    pub host: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_url: Option<String>,

    pub auth: AuthConfig,
    pub cors_allowed_origins: Vec<String>,
    pub mail: MailConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    pub base_url: String,
    pub secret: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookie_domain: Option<String>,
    pub secure_cookies: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub api_url: String,
    pub from_email: String,
}

impl MailConfig {
    /// Remote templates are only attempted with an API key.
    pub fn templates_enabled(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Config {
    /// Derive the configuration from the environment store.
    pub fn from_env(env: &EnvironmentStore) -> Self {
        let environment = env
            .first_of(&["APP_ENV", "NODE_ENV"])
            .unwrap_or("development")
            .to_string();
        let is_production = environment == "production";

        let port = parse_port(env.get_non_empty("PORT"), DEFAULT_PORT);
        let host = env.get_non_empty("HOST").unwrap_or(DEFAULT_HOST).to_string();

        let base_url = env
            .first_of(&["BETTER_AUTH_BASE_URL", "BETTER_AUTH_URL", "API_URL"])
            .map(String::from)
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let cors_allowed_origins = match env.get_non_empty("CORS_ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            None => DEFAULT_CORS_ORIGINS.iter().map(|o| o.to_string()).collect(),
        };

        Self {
            environment,
            is_production,
            port,
            host,
            database_url: env.get_non_empty(DATABASE_URL).map(String::from),
            redis_url: env.get_non_empty(REDIS_URL).map(String::from),
            auth: AuthConfig {
                base_url,
                secret: env
                    .first_of(&["BETTER_AUTH_SECRET", "AUTH_SECRET"])
                    .unwrap_or(DEV_AUTH_SECRET)
                    .to_string(),
                cookie_domain: env
                    .get_non_empty("BETTER_AUTH_COOKIE_DOMAIN")
                    .map(String::from),
                secure_cookies: env.get("BETTER_AUTH_SECURE_COOKIES") == Some("true"),
            },
            cors_allowed_origins,
            mail: MailConfig {
                api_key: env.get_non_empty(RESEND_API_KEY).map(String::from),
                api_url: env
                    .get_non_empty(RESEND_API_URL)
                    .unwrap_or(DEFAULT_RESEND_API_URL)
                    .trim_end_matches('/')
                    .to_string(),
                from_email: env
                    .get_non_empty("RESEND_FROM_EMAIL")
                    .unwrap_or(DEFAULT_FROM_EMAIL)
                    .to_string(),
            },
        }
    }

    /// Copy with every secret value redacted, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.auth.secret = redact_secret(&copy.auth.secret);
        copy.mail.api_key = copy.mail.api_key.as_deref().map(redact_secret);
        copy.database_url = copy.database_url.as_deref().map(redact_secret);
        copy.redis_url = copy.redis_url.as_deref().map(redact_secret);
        copy
    }
}

fn parse_port(raw: Option<&str>, default: u16) -> u16 {
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid PORT '{value}', using {default}");
            default
        }),
        None => default,
    }
}

/// Redact a secret value for display (show first 2 and last 2 chars).
pub fn redact_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 6 {
        return "***".to_string();
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> EnvironmentStore {
        pairs.iter().copied().collect()
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let config = Config::from_env(&EnvironmentStore::new());
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.host, "0.0.0.0");
        assert!(!config.is_production);
        assert_eq!(config.auth.base_url, "http://localhost:9090");
        assert_eq!(config.auth.secret, DEV_AUTH_SECRET);
        assert_eq!(config.cors_allowed_origins.len(), 2);
        assert!(config.database_url.is_none());
        assert!(!config.mail.templates_enabled());
        assert_eq!(config.mail.api_url, DEFAULT_RESEND_API_URL);
    }

    #[test]
    fn reads_aliases_in_order() {
        let config = Config::from_env(&env(&[
            ("BETTER_AUTH_URL", "https://auth.example.com"),
            ("API_URL", "https://api.example.com"),
            ("AUTH_SECRET", "fallback-secret"),
        ]));
        assert_eq!(config.auth.base_url, "https://auth.example.com");
        assert_eq!(config.auth.secret, "fallback-secret");
    }

    #[test]
    fn cors_list_is_trimmed() {
        let config = Config::from_env(&env(&[(
            "CORS_ALLOWED_ORIGINS",
            " https://a.example , https://b.example,",
        )]));
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn invalid_port_falls_back() {
        let config = Config::from_env(&env(&[("PORT", "not-a-port")]));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn production_flag_and_secure_cookies() {
        let config = Config::from_env(&env(&[
            ("NODE_ENV", "production"),
            ("BETTER_AUTH_SECURE_COOKIES", "true"),
        ]));
        assert!(config.is_production);
        assert!(config.auth.secure_cookies);
    }

    #[test]
    fn redacted_hides_secrets() {
        let config = Config::from_env(&env(&[
            ("RESEND_API_KEY", "re_1234567890abcdef"),
            ("DATABASE_URL", "sqlite://auth.db"),
        ]));
        let redacted = config.redacted();
        assert_eq!(redacted.mail.api_key.as_deref(), Some("re…ef"));
        assert_eq!(redacted.database_url.as_deref(), Some("sq…db"));
        assert_eq!(redact_secret("abc"), "***");
    }
}
