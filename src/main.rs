//! snapfind CLI entrypoint

use anyhow::Result;
use clap::Parser;

use snapfind::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.execute()
}
