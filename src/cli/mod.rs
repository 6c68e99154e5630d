use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "authgate", version, about = "Authentication service bootstrap")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service.
    Serve(ServeOpts),
    Templates(TemplatesOpts),
    Config(ConfigOpts),
    Version,
}

#[derive(clap::Args, Debug, Default)]
pub struct ServeOpts {
    #[arg(short, long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub host: Option<String>,
    /// Do not reconcile email templates on startup.
    #[arg(long, env = "AUTHGATE_SKIP_TEMPLATE_SYNC")]
    pub skip_template_sync: bool,
}

#[derive(clap::Args)]
pub struct TemplatesOpts {
    #[command(subcommand)]
    pub action: TemplatesAction,
}

#[derive(Subcommand)]
pub enum TemplatesAction {
    /// Create and publish any missing catalog templates.
    Sync,
}

#[derive(clap::Args)]
pub struct ConfigOpts {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    Show,
    Validate,
}
