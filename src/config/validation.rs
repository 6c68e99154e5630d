use super::{Config, DEV_AUTH_SECRET};
use anyhow::Result;
use tracing::warn;

/// Validation errors for configuration.
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Validate a configuration object.
///
/// Only hard misconfigurations are errors. Optional features that are
/// merely absent (cache, mail) produce warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    if config.port == 0 {
        errors.push(ConfigValidationError {
            path: "PORT".to_string(),
            message: "Port must be greater than 0".to_string(),
        });
    }

    if config.database_url.is_none() {
        errors.push(ConfigValidationError {
            path: "DATABASE_URL".to_string(),
            message: "Database connection string is required".to_string(),
        });
    }

    if config.is_production && config.auth.secret == DEV_AUTH_SECRET {
        errors.push(ConfigValidationError {
            path: "BETTER_AUTH_SECRET".to_string(),
            message: "Default signing secret must not be used in production".to_string(),
        });
    }

    if config.is_production && !config.auth.secure_cookies {
        warn!("Running in production without BETTER_AUTH_SECURE_COOKIES=true");
    }

    if config.redis_url.is_none() {
        warn!("REDIS_URL is not set; cache-backed features are disabled");
    }

    if !config.mail.templates_enabled() {
        warn!("RESEND_API_KEY is not set; outbound mail is unavailable");
    }

    for origin in &config.cors_allowed_origins {
        if url::Url::parse(origin).is_err() {
            errors.push(ConfigValidationError {
                path: "CORS_ALLOWED_ORIGINS".to_string(),
                message: format!("'{origin}' is not a valid origin URL"),
            });
        }
    }

    errors
}

/// Validate configuration and return Result.
pub fn validate_config_object(config: &Config) -> Result<()> {
    let errors = validate_config(config);
    if errors.is_empty() {
        Ok(())
    } else {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Configuration validation failed:\n{}", messages.join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvironmentStore;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let env: EnvironmentStore = pairs.iter().copied().collect();
        Config::from_env(&env)
    }

    #[test]
    fn missing_database_is_an_error() {
        let errors = validate_config(&config(&[]));
        assert!(errors.iter().any(|e| e.path == "DATABASE_URL"));
    }

    #[test]
    fn dev_secret_rejected_in_production() {
        let errors = validate_config(&config(&[
            ("NODE_ENV", "production"),
            ("DATABASE_URL", "sqlite://auth.db"),
        ]));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "BETTER_AUTH_SECRET");
    }

    #[test]
    fn dev_secret_allowed_in_development() {
        let cfg = config(&[("DATABASE_URL", "sqlite://auth.db")]);
        assert!(validate_config_object(&cfg).is_ok());
    }

    #[test]
    fn bad_cors_origin_reported() {
        let errors = validate_config(&config(&[
            ("DATABASE_URL", "sqlite://auth.db"),
            ("CORS_ALLOWED_ORIGINS", "not a url"),
        ]));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("not a url"));
    }
}
