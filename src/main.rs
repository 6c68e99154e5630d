use authgate::bootstrap::BootstrapGate;
use authgate::cli::{Cli, Commands, ConfigAction, TemplatesAction};
use authgate::config::validate_config_object;
use authgate::logging;
use authgate::mail::{ReconciliationOutcome, TemplateIdCache, TemplateReconciler, TemplateStore};
use authgate::resources::Resources;
use authgate::server::AuthServer;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let gate = Arc::new(BootstrapGate::from_process());

    match cli.command {
        Commands::Serve(opts) => {
            info!("Starting auth service");
            let server = AuthServer::start(gate, &opts).await?;
            server.run_until_shutdown().await?;
        }
        Commands::Templates(opts) => match opts.action {
            TemplatesAction::Sync => {
                let snapshot = gate.ensure_ready().await;
                let resources = Resources::new();
                let store: Arc<dyn TemplateStore> = resources.mail.get_instance(&snapshot)?;
                let reconciler = TemplateReconciler::new(store, Arc::new(TemplateIdCache::new()));
                let report = reconciler.run().await;
                if report.degraded {
                    println!("API key is restricted to sending; templates cannot be managed");
                }
                for (name, outcome) in &report.outcomes {
                    let line = match outcome {
                        ReconciliationOutcome::AlreadyExists(id) => format!("exists   {id}"),
                        ReconciliationOutcome::Created(id) => format!("created  {id}"),
                        ReconciliationOutcome::Skipped(reason) => format!("skipped  {reason:?}"),
                    };
                    println!("{name:<26} {line}");
                }
            }
        },
        Commands::Config(opts) => {
            let snapshot = gate.ensure_ready().await;
            match opts.action {
                ConfigAction::Show => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&snapshot.config.redacted())?
                    );
                }
                ConfigAction::Validate => {
                    validate_config_object(&snapshot.config)?;
                    info!("Configuration is valid");
                }
            }
        }
        Commands::Version => {
            println!("authgate {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
