use super::{Requirement, ResourceSpec};
use crate::bootstrap::ConfigSnapshot;
use crate::config::REDIS_URL;
use crate::error::Result;
use redis::aio::MultiplexedConnection;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Linear connect backoff: `attempt * step`, capped at `cap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub step: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
    /// Upper bound on a single connection attempt, handshake included.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(200),
            cap: Duration::from_millis(2000),
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given 1-based failed attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.cap)
    }
}

/// Cache client with lazy, non-fatal connection handling.
///
/// Construction performs no I/O. [`connect`](Self::connect) retries per the
/// policy with every attempt time-boxed, and logs failure instead of
/// returning an error. Status reads never wait on a connect in progress.
pub struct CacheClient {
    client: redis::Client,
    policy: RetryPolicy,
    /// Serializes connect runs; never held by status reads.
    connecting: tokio::sync::Mutex<()>,
    connection: parking_lot::Mutex<Option<MultiplexedConnection>>,
    connected: AtomicBool,
    attempts: AtomicUsize,
}

impl CacheClient {
    pub fn new(url: &str, policy: RetryPolicy) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
            policy,
            connecting: tokio::sync::Mutex::new(()),
            connection: parking_lot::Mutex::new(None),
            connected: AtomicBool::new(false),
            attempts: AtomicUsize::new(0),
        })
    }

    fn current(&self) -> Option<MultiplexedConnection> {
        self.connection.lock().clone()
    }

    /// Return a live connection, establishing it on first use.
    pub async fn connect(&self) -> Option<MultiplexedConnection> {
        if let Some(conn) = self.current() {
            return Some(conn);
        }
        let _run = self.connecting.lock().await;
        // another caller may have finished while we waited
        if let Some(conn) = self.current() {
            return Some(conn);
        }

        let max_attempts = self.policy.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let outcome = tokio::time::timeout(
                self.policy.attempt_timeout,
                self.client.get_multiplexed_async_connection(),
            )
            .await;
            let failure = match outcome {
                Ok(Ok(conn)) => {
                    info!("[redis] connected");
                    *self.connection.lock() = Some(conn.clone());
                    self.connected.store(true, Ordering::SeqCst);
                    return Some(conn);
                }
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!(
                    "no response within {}ms",
                    self.policy.attempt_timeout.as_millis()
                ),
            };
            if attempt < max_attempts {
                let delay = self.policy.delay(attempt);
                warn!(
                    "[redis] connection error: {failure}; retrying in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            } else {
                error!("[redis] initial connect failed after {attempt} attempt(s): {failure}");
            }
        }
        None
    }

    /// Connect in the background; the handle yields whether it succeeded.
    pub fn spawn_connect(self: &Arc<Self>) -> JoinHandle<bool> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.connect().await.is_some() })
    }

    /// Non-blocking connection status.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Total connection attempts made so far.
    pub fn attempt_count(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// Optional cache client keyed by `REDIS_URL`.
#[derive(Debug, Default)]
pub struct CacheResource {
    pub policy: RetryPolicy,
}

impl ResourceSpec for CacheResource {
    type Output = CacheClient;

    fn name(&self) -> &'static str {
        "cache"
    }

    fn config_key(&self) -> &'static str {
        REDIS_URL
    }

    fn requirement(&self) -> Requirement {
        Requirement::Optional
    }

    fn construct(&self, value: &str, _snapshot: &ConfigSnapshot) -> Result<CacheClient> {
        CacheClient::new(value, self.policy)
    }
}
