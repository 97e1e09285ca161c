//! notesgen CLI: syllabus in, study notes out.
//!
//! Parses a syllabus into a topic tree, stores it, and fills every topic with
//! generated notes, resuming where a previous run stopped.

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
