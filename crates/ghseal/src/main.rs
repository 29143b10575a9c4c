use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod source;

use cli::Cli;
use config::{ConfigOverrides, FileConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays pipeable
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("ghseal={}", level).parse()?)
                .add_directive(format!("ghseal_api={}", level).parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(FileConfig::default_path);
    let overrides = ConfigOverrides {
        api_url: cli.api_url.clone(),
        token: cli.token.clone(),
        organization: cli.organization(),
    };

    let config = FileConfig::load(&config_path).resolve(overrides)?;
    tracing::debug!(api_url = %config.api_url, "Configuration resolved");

    commands::run(cli.command, config).await
}
