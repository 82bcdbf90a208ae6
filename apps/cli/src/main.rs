//! PageGrade CLI: score extracted pages against the compliance catalog.
//!
//! Reads normalized page documents (JSON), runs the six category
//! evaluators, and prints or exports the resulting reports.

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
