//! Thin HTTP surface: health and readiness.

mod routes;

pub use routes::build_routes;

use crate::bootstrap::{BootstrapGate, ConfigSnapshot};
use crate::cli::ServeOpts;
use crate::config::validate_config;
use crate::mail::{EmailService, TemplateIdCache, TemplateReconciler, TemplateStore};
use crate::resources::Resources;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{error, info, warn};

/// Shared state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<BootstrapGate>,
    pub snapshot: Arc<ConfigSnapshot>,
    pub resources: Arc<Resources>,
    pub templates: Arc<TemplateIdCache>,
    pub email: Option<Arc<EmailService>>,
    pub start_time: Instant,
    pub version: String,
}

impl AppState {
    /// State with no resources built yet and email disabled.
    pub fn new(gate: Arc<BootstrapGate>, snapshot: Arc<ConfigSnapshot>) -> Self {
        Self {
            gate,
            snapshot,
            resources: Arc::new(Resources::new()),
            templates: Arc::new(TemplateIdCache::new()),
            email: None,
            start_time: Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

pub struct AuthServer {
    state: AppState,
    addr: SocketAddr,
}

impl AuthServer {
    /// Resolve configuration, build resources and prepare the listener address.
    pub async fn start(gate: Arc<BootstrapGate>, opts: &ServeOpts) -> Result<Self> {
        let snapshot = gate.ensure_ready().await;
        let config = &snapshot.config;

        let problems = validate_config(config);
        for problem in &problems {
            warn!("Config: {problem}");
        }
        if config.is_production && !problems.is_empty() {
            anyhow::bail!("refusing to start in production with {} config error(s)", problems.len());
        }

        let mut state = AppState::new(gate.clone(), snapshot.clone());

        state.resources.database.get_instance(&snapshot)?;

        if let Some(cache) = state.resources.cache.get_optional(&snapshot) {
            cache.spawn_connect();
        }

        if config.mail.templates_enabled() {
            let client = state.resources.mail.get_instance(&snapshot)?;
            if opts.skip_template_sync {
                info!("Template sync disabled; emails use inline HTML until the next sync");
            } else {
                let store: Arc<dyn TemplateStore> = client.clone();
                let reconciler = TemplateReconciler::new(store, state.templates.clone());
                tokio::spawn(async move {
                    reconciler.run().await;
                });
            }
            state.email = Some(Arc::new(EmailService::new(
                client,
                state.templates.clone(),
                config.mail.from_email.clone(),
            )));
        } else {
            warn!("RESEND_API_KEY not set; email sending disabled");
        }

        let host = opts.host.as_deref().unwrap_or(&config.host);
        let port = opts.port.unwrap_or(config.port);
        let addr: SocketAddr = format!("{host}:{port}").parse()?;

        Ok(Self { state, addr })
    }

    /// Run the server until a shutdown signal is received.
    pub async fn run_until_shutdown(self) -> Result<()> {
        let app = routes::build_routes(self.state.clone());
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        info!(
            "Auth service v{} listening on {}",
            self.state.version,
            listener.local_addr()?
        );
        info!("  Health: http://{}/health", self.addr);
        info!("  Secrets source: {:?}", self.state.snapshot.source);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Auth service shut down gracefully");
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown");
        }
    }
}
