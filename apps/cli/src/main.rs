//! OrgScout CLI — bounded-budget organization discovery runs.
//!
//! Searches, scores, and enriches candidate organizations for a segment,
//! writing CSV artifacts and a cross-run ledger.

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
