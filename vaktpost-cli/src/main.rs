//! ## vaktpost-cli
//! **Operational entrypoint**
//!
//! `vaktpost run` starts the supervised pipeline and keeps it running until
//! SIGINT or SIGTERM; `vaktpost check` validates a configuration and prints
//! the effective values.

use clap::Parser;

mod commands;
mod signal;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets such as VAKTPOST_DETECTION__API_KEY may live in .env.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => commands::run(args).await,
        Commands::Check(args) => commands::check(args),
    }
}
