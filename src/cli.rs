use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::aggregate::DEFAULT_TOP_N;
use crate::config::RunManifest;
use crate::pipeline::ReportRunner;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the full comparison report: charts, HTML table, CSV exports
    Report {
        /// Directory holding the per-marker occurrence tables
        #[arg(short, long, default_value = ".")]
        input_dir: PathBuf,

        /// Manifest JSON overriding the built-in W8 inputs
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Path to the output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of species in the top-species chart
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
    },

    /// Write CSV exports of every aggregate, nothing else
    Export {
        /// Directory holding the per-marker occurrence tables
        #[arg(short, long, default_value = ".")]
        input_dir: PathBuf,

        /// Manifest JSON overriding the built-in W8 inputs
        #[arg(short, long)]
        manifest: Option<PathBuf>,

        /// Path to the output directory
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Number of species in the top-species export
        #[arg(long, default_value_t = DEFAULT_TOP_N)]
        top_n: usize,
    },

    /// Print a text summary of the loaded occurrence tables
    Summary {
        /// Directory holding the per-marker occurrence tables
        #[arg(short, long, default_value = ".")]
        input_dir: PathBuf,

        /// Manifest JSON overriding the built-in W8 inputs
        #[arg(short, long)]
        manifest: Option<PathBuf>,
    },
}

fn resolve_manifest(manifest: Option<&PathBuf>, input_dir: &Path) -> anyhow::Result<RunManifest> {
    let base = match manifest {
        Some(path) => RunManifest::from_json(path)?,
        None => RunManifest::w8_default(),
    };
    Ok(base.resolved_against(input_dir))
}

/// Main entry point for CLI
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Report {
            input_dir,
            manifest,
            output,
            top_n,
        } => {
            let manifest = resolve_manifest(manifest.as_ref(), &input_dir)?;
            let runner = ReportRunner::new(manifest, &output, top_n);
            let summary = runner.run().context("report generation failed")?;
            println!("Report written to {}", output.display());
            print!("{}", summary.render_text());
            Ok(())
        }
        Commands::Export {
            input_dir,
            manifest,
            output,
            top_n,
        } => {
            let manifest = resolve_manifest(manifest.as_ref(), &input_dir)?;
            let runner = ReportRunner::new(manifest, &output, top_n);
            let summary = runner.export().context("export failed")?;
            println!(
                "Exported {} tables to {}",
                summary.outputs.len(),
                output.display()
            );
            Ok(())
        }
        Commands::Summary {
            input_dir,
            manifest,
        } => {
            let manifest = resolve_manifest(manifest.as_ref(), &input_dir)?;
            let runner = ReportRunner::new(manifest, PathBuf::new(), DEFAULT_TOP_N);
            let summary = runner.summarize().context("summary failed")?;
            print!("{}", summary.render_text());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_report_args_parse_with_defaults() {
        let cli = Cli::try_parse_from(["edna_compare", "report"]).unwrap();
        match cli.command {
            Commands::Report {
                input_dir,
                manifest,
                output,
                top_n,
            } => {
                assert_eq!(input_dir, PathBuf::from("."));
                assert!(manifest.is_none());
                assert_eq!(output, PathBuf::from("results"));
                assert_eq!(top_n, DEFAULT_TOP_N);
            }
            _ => panic!("expected report subcommand"),
        }
    }

    #[test]
    fn test_summary_args_parse() {
        let cli = Cli::try_parse_from([
            "edna_compare",
            "summary",
            "--input-dir",
            "data",
            "--manifest",
            "w8.json",
        ])
        .unwrap();
        match cli.command {
            Commands::Summary {
                input_dir,
                manifest,
            } => {
                assert_eq!(input_dir, PathBuf::from("data"));
                assert_eq!(manifest, Some(PathBuf::from("w8.json")));
            }
            _ => panic!("expected summary subcommand"),
        }
    }
}
