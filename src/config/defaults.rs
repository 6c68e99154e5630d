/// Default configuration constants used across the service.

/// Default listener port.
pub const DEFAULT_PORT: u16 = 9090;

/// Default listener host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Service name used for secret-manager scoping and health responses.
pub const SERVICE_NAME: &str = "auth";

/// Signing secret used when none is configured. Rejected in production.
pub const DEV_AUTH_SECRET: &str = "better-auth-secret-change-in-production";

/// Default sender address for outbound mail.
pub const DEFAULT_FROM_EMAIL: &str = "updates@updates.nixopus.com";

/// Default CORS origins for local frontends.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:3000", "http://localhost:7443"];

/// Default secret-manager endpoint.
pub const DEFAULT_INFISICAL_URL: &str = "https://app.infisical.com";

/// Default template-store API endpoint.
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com";

/// Secret prefixes loaded (with overwrite) in order; the empty entry is the
/// catch-all pass, which only fills absent keys.
pub const DEFAULT_SECRET_PREFIXES: &[&str] = &["AUTH_", "NIXOPUS_AUTH_", ""];

/// Well-known configuration keys.
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const REDIS_URL: &str = "REDIS_URL";
pub const RESEND_API_KEY: &str = "RESEND_API_KEY";
pub const RESEND_API_URL: &str = "RESEND_API_URL";
