use anyhow::Result;
use attachkit_cli::commands;
use attachkit_cli::config::Cli;
use attachkit_media::Toolkit;
use clap::Parser;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.toolkit_config();
    debug!("toolkit config: {config:?}");

    let kit = Toolkit::new(config)?;
    commands::run(&kit, cli.command).await
}
