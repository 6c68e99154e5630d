//! Error taxonomy shared by the bootstrap, resource and mail layers.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The no-op secret manager was asked for a single secret.
    #[error("secret manager not configured")]
    NotConfigured,

    /// A single requested secret is absent after a full fetch.
    #[error("secret {key} not found")]
    SecretNotFound { key: String },

    /// The remote secret store answered with a non-success status.
    #[error("failed to fetch secrets from secret manager: {status} {body}")]
    RemoteFetch { status: u16, body: String },

    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A resource was first used without its configuration key.
    #[error(
        "{key} is not configured. Set it in the environment or store it in the secret manager \
         (SECRET_MANAGER_ENABLED=true, INFISICAL_TOKEN set and {key} present in the configured path)"
    )]
    MissingConfiguration { key: String },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    /// The template-store credential may only send email.
    #[error("restricted api key: {0}")]
    RestrictedAccess(String),

    #[error("template store error ({status}): {message}")]
    TemplateStore { status: u16, message: String },

    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("cache error: {0}")]
    Cache(#[from] redis::RedisError),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    pub fn missing(key: impl Into<String>) -> Self {
        Error::MissingConfiguration { key: key.into() }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RateLimited(_))
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, Error::RestrictedAccess(_))
    }
}
