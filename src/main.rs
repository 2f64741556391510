//! Comparison report generator for multi-marker eDNA occurrence tables.
//!
//! Loads the per-marker TSV exports for one water sample, aggregates them
//! (per-phylum activity, read quality classes, top species, the species
//! by marker pivot, species set overlaps) and renders SVG charts, an
//! interactive HTML table and CSV exports.

mod aggregate;
mod cli;
mod config;
mod io;
mod occurrence;
mod pipeline;
mod taxonomy;
mod visualization;

use anyhow::Result;
use clap::Parser;

use cli::{run_cli, Cli};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Run CLI
    run_cli(cli)?;

    Ok(())
}
