mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve { ephemeral } => commands::serve(ephemeral).await,
        Command::Status => commands::status(&cli.server).await,
        Command::Jobs {
            limit,
            include_archived,
        } => commands::jobs(&cli.server, limit, include_archived).await,
        Command::Check => commands::check(&cli.server).await,
        Command::FixEncoding => commands::fix_encoding(&cli.server).await,
    }
}
