use super::ResourceSpec;
use crate::bootstrap::ConfigSnapshot;
use crate::config::DATABASE_URL;
use crate::error::{Error, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::path::PathBuf;
use std::time::Duration;

/// Maximum pooled connections.
const POOL_MAX_SIZE: u32 = 10;

/// How long a checkout waits for a free connection.
const POOL_CONNECTION_TIMEOUT_SECS: u64 = 5;

pub type SqlitePool = Pool<SqliteConnectionManager>;

/// Primary database pool, selected by the `DATABASE_URL` scheme.
#[derive(Debug, Clone)]
pub enum DatabasePool {
    /// `postgres://` and `postgresql://` URLs.
    Postgres(PgPool),
    /// `sqlite://`, `sqlite:`, `file:` or a bare path.
    Sqlite(SqlitePool),
}

impl DatabasePool {
    pub fn backend(&self) -> &'static str {
        match self {
            DatabasePool::Postgres(_) => "postgres",
            DatabasePool::Sqlite(_) => "sqlite",
        }
    }

    pub fn as_postgres(&self) -> Option<&PgPool> {
        match self {
            DatabasePool::Postgres(pool) => Some(pool),
            DatabasePool::Sqlite(_) => None,
        }
    }

    pub fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self {
            DatabasePool::Sqlite(pool) => Some(pool),
            DatabasePool::Postgres(_) => None,
        }
    }
}

/// Database backend named by a connection URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    Postgres(String),
    Sqlite(PathBuf),
}

/// Primary database pool. Required: first use fails fast without
/// `DATABASE_URL`. No connection is opened until the first checkout.
///
/// The Postgres pool is lazy but registers its maintenance task with the
/// current Tokio runtime, so construct it from inside one.
#[derive(Debug, Default)]
pub struct DatabaseResource;

impl ResourceSpec for DatabaseResource {
    type Output = DatabasePool;

    fn name(&self) -> &'static str {
        "database"
    }

    fn config_key(&self) -> &'static str {
        DATABASE_URL
    }

    fn construct(&self, value: &str, _snapshot: &ConfigSnapshot) -> Result<DatabasePool> {
        match parse_database_url(value)? {
            DatabaseTarget::Postgres(url) => {
                let pool = PgPoolOptions::new()
                    .max_connections(POOL_MAX_SIZE)
                    .acquire_timeout(Duration::from_secs(POOL_CONNECTION_TIMEOUT_SECS))
                    .connect_lazy(&url)?;
                Ok(DatabasePool::Postgres(pool))
            }
            DatabaseTarget::Sqlite(path) => {
                let manager = SqliteConnectionManager::file(path).with_init(|conn| {
                    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA foreign_keys = ON;")
                });
                Ok(DatabasePool::Sqlite(
                    Pool::builder()
                        .max_size(POOL_MAX_SIZE)
                        .min_idle(Some(0))
                        .connection_timeout(Duration::from_secs(POOL_CONNECTION_TIMEOUT_SECS))
                        .build_unchecked(manager),
                ))
            }
        }
    }
}

/// Classify a database URL.
///
/// Postgres URLs pass through untouched. `sqlite://path`, `sqlite:path`,
/// `file:path` and bare paths resolve to a SQLite file. Any other scheme is
/// rejected.
pub fn parse_database_url(url: &str) -> Result<DatabaseTarget> {
    let url = url.trim();
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        return Ok(DatabaseTarget::Postgres(url.to_string()));
    }

    let path = ["sqlite://", "sqlite:", "file:"]
        .iter()
        .find_map(|scheme| url.strip_prefix(scheme))
        .unwrap_or(url);

    if path.is_empty() {
        return Err(Error::InvalidConfiguration(format!(
            "{DATABASE_URL} has no database path"
        )));
    }
    if let Some((scheme, _)) = path.split_once("://") {
        return Err(Error::InvalidConfiguration(format!(
            "{DATABASE_URL} scheme '{scheme}' is not supported"
        )));
    }
    Ok(DatabaseTarget::Sqlite(PathBuf::from(path)))
}
