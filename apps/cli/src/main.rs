//! modbind CLI: bind every page of an LMS course module into one document.
//!
//! Walks the module's item sequence, fetches each page's alternate format
//! from the content service, and writes a single printable HTML or Markdown
//! file.

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
