//! courtdocs CLI: download and extract the filings attached to a Texas court case page.
//!
//! Fetches the case page, downloads every linked PDF, and writes the extracted
//! text as one file per document or a single merged file.

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
