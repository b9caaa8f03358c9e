//! mlpipe CLI
//!
//! Command-line interface for submitting pipeline jobs to the managed
//! pipeline platform and waiting on them.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "mlpipe")]
#[command(about = "Submit and monitor ML pipeline jobs", long_about = None)]
struct Cli {
    /// Platform API endpoint
    #[arg(long, env = "MLPIPE_ENDPOINT", default_value = "http://localhost:8080")]
    endpoint: String,

    /// Bearer token for the platform API
    #[arg(long, env = "MLPIPE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mlpipe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        endpoint: cli.endpoint,
        token: cli.token,
    };

    handle_command(cli.command, &config).await
}
