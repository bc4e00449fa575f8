//! poolset CLI: reconcile stake pool records into one classified dataset.
//!
//! Fetches the pool registry and a classification source, applies the
//! authoritative override dataset and manual corrections, and exports the
//! result with its stake distribution.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
