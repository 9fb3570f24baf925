//! evalform CLI - review evaluation forms from the terminal.
//!
//! The main entry point for the `evalform` binary.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use evalform_cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.config();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        match cli.command {
            Commands::Show(args) => evalform_cli::commands::show::execute(args, &config).await,
            Commands::Review(args) => evalform_cli::commands::review::execute(args, &config).await,
            Commands::Whoami => evalform_cli::commands::whoami::execute(&config).await,
        }
    })
}
