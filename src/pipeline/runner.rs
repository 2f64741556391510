//! End-to-end report orchestration.
//!
//! The runner owns a resolved manifest and an output directory, loads the
//! occurrence tables, computes every aggregate once and hands each to the
//! presenter and CSV writers. Loading happens before anything is written:
//! a failed input never leaves a half-rendered report behind.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use indexmap::IndexMap;
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{
    intersection_of, quality_breakdown, species_marker_pivot, species_sets, taxon_activity,
    top_species, union_of, venn_regions, MarkerPivot, OverlapPartition, QualityRow, SpeciesReads,
    TaxonActivityRow,
};
use crate::config::RunManifest;
use crate::io::loader::{load_manifest, LoadError};
use crate::io::{
    write_marker_pivot, write_overlap_regions, write_quality_breakdown, write_taxon_activity,
    write_top_species,
};
use crate::occurrence::OccurrenceTable;
use crate::visualization::{VisualizationError, Visualizer};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Visualization(#[from] VisualizationError),

    #[error("failed to encode run summary: {0}")]
    Summary(#[from] serde_json::Error),

    #[error(transparent)]
    Export(#[from] anyhow::Error),
}

/// Per-input slice of the loaded table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSummary {
    pub path: String,
    pub marker: String,
    pub otu_db: String,
    pub records: usize,
}

/// Machine-readable account of one run, written as `run_summary.json`.
///
/// Holds counts only. Elapsed time is logged but kept out of the file so
/// re-running on identical inputs reproduces it byte for byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub inputs: Vec<InputSummary>,
    pub records: usize,
    pub total_reads: f64,
    pub markers: Vec<String>,
    pub events: Vec<String>,
    pub species: usize,
    pub outputs: Vec<String>,
}

impl RunSummary {
    /// Console rendering for the `summary` subcommand.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Occurrence records: {}\n", self.records));
        out.push_str(&format!("Total reads: {}\n", self.total_reads));
        out.push_str(&format!("Markers: {}\n", self.markers.join(", ")));
        out.push_str(&format!("Events: {}\n", self.events.join(", ")));
        out.push_str(&format!("Species: {}\n", self.species));
        out.push_str("Inputs:\n");
        for input in &self.inputs {
            out.push_str(&format!(
                "  {} (marker {}, db {}): {} records\n",
                input.path, input.marker, input.otu_db, input.records
            ));
        }
        if !self.outputs.is_empty() {
            out.push_str("Outputs:\n");
            for output in &self.outputs {
                out.push_str(&format!("  {}\n", output));
            }
        }
        out
    }
}

/// Orchestrates one full comparison report.
pub struct ReportRunner {
    manifest: RunManifest,
    output_dir: PathBuf,
    top_n: usize,
}

impl ReportRunner {
    pub fn new(manifest: RunManifest, output_dir: impl Into<PathBuf>, top_n: usize) -> Self {
        ReportRunner {
            manifest,
            output_dir: output_dir.into(),
            top_n,
        }
    }

    /// Runs the whole pipeline: charts, HTML grid, CSV exports and the
    /// run summary.
    pub fn run(&self) -> Result<RunSummary, ReportError> {
        let start_time = Instant::now();
        info!("=== Starting comparison report ===");
        info!("Output directory: {}", self.output_dir.display());

        let table = load_manifest(&self.manifest)?;
        info!(
            "Loaded {} occurrence records from {} inputs",
            table.len(),
            self.manifest.inputs.len()
        );
        if table.is_empty() {
            warn!("No occurrence records loaded; the report will hold empty figures");
        }

        let activity = taxon_activity(&table);
        let quality = quality_breakdown(&table);
        let top = top_species(&table, self.top_n);
        let pivot = species_marker_pivot(
            &table,
            &self.manifest.singleplex_event,
            &self.manifest.multiplex_event,
        );
        let event_sets = species_sets(&table, OverlapPartition::ByEvent);
        let marker_sets = species_sets(&table, OverlapPartition::ByMarkerGroup);
        info!(
            "Aggregated {} activity rows, {} top species, {} pivot rows",
            activity.len(),
            top.len(),
            pivot.dimensions().0
        );
        info!(
            "{} species detected by both events, {} by at least one",
            intersection_of(&event_sets).len(),
            union_of(&event_sets).len()
        );

        let viz = Visualizer::new(&self.output_dir)?;
        let mut outputs = vec![
            viz.taxon_reads_chart(&activity)?,
            viz.taxon_asvs_chart(&activity)?,
            viz.quality_chart(&quality)?,
            viz.top_species_chart(&top)?,
            viz.overlap_diagram(
                &event_sets,
                "Species overlap between events",
                "overlap_events.svg",
            )?,
            viz.overlap_diagram(
                &marker_sets,
                "Species overlap between markers",
                "overlap_markers.svg",
            )?,
            viz.species_grid(
                &pivot,
                &format!(
                    "Species by marker: {} vs {}",
                    self.manifest.singleplex_event, self.manifest.multiplex_event
                ),
            )?,
        ];
        outputs.extend(self.write_exports(&activity, &quality, &top, &pivot, &event_sets, &marker_sets)?);

        let summary = self.build_summary(&table, &outputs);
        let summary_path = self.output_dir.join("run_summary.json");
        info!("Writing run summary to {}", summary_path.display());
        let mut writer = BufWriter::new(File::create(&summary_path)?);
        serde_json::to_writer_pretty(&mut writer, &summary)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        info!(
            "=== Report complete in {:.2}s ===",
            start_time.elapsed().as_secs_f64()
        );
        Ok(summary)
    }

    /// CSV exports only, for piping aggregates into other tooling.
    pub fn export(&self) -> Result<RunSummary, ReportError> {
        let start_time = Instant::now();
        let table = load_manifest(&self.manifest)?;

        let activity = taxon_activity(&table);
        let quality = quality_breakdown(&table);
        let top = top_species(&table, self.top_n);
        let pivot = species_marker_pivot(
            &table,
            &self.manifest.singleplex_event,
            &self.manifest.multiplex_event,
        );
        let event_sets = species_sets(&table, OverlapPartition::ByEvent);
        let marker_sets = species_sets(&table, OverlapPartition::ByMarkerGroup);

        let outputs =
            self.write_exports(&activity, &quality, &top, &pivot, &event_sets, &marker_sets)?;
        info!(
            "Exported {} tables in {:.2}s",
            outputs.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(self.build_summary(&table, &outputs))
    }

    /// Loads and summarizes without writing anything.
    pub fn summarize(&self) -> Result<RunSummary, ReportError> {
        let table = load_manifest(&self.manifest)?;
        Ok(self.build_summary(&table, &[]))
    }

    fn write_exports(
        &self,
        activity: &[TaxonActivityRow],
        quality: &[QualityRow],
        top: &[SpeciesReads],
        pivot: &MarkerPivot,
        event_sets: &IndexMap<String, BTreeSet<String>>,
        marker_sets: &IndexMap<String, BTreeSet<String>>,
    ) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(&self.output_dir)?;

        let activity_path = self.output_dir.join("taxon_activity.csv");
        write_taxon_activity(activity, &activity_path)?;
        let quality_path = self.output_dir.join("quality_breakdown.csv");
        write_quality_breakdown(quality, &quality_path)?;
        let top_path = self.output_dir.join("top_species.csv");
        write_top_species(top, &top_path)?;
        let pivot_path = self.output_dir.join("species_pivot.csv");
        write_marker_pivot(pivot, &pivot_path)?;
        let events_path = self.output_dir.join("overlap_events.csv");
        write_overlap_regions(&venn_regions(event_sets), &events_path)?;
        let markers_path = self.output_dir.join("overlap_markers.csv");
        write_overlap_regions(&venn_regions(marker_sets), &markers_path)?;

        Ok(vec![
            activity_path,
            quality_path,
            top_path,
            pivot_path,
            events_path,
            markers_path,
        ])
    }

    fn build_summary(&self, table: &OccurrenceTable, outputs: &[PathBuf]) -> RunSummary {
        let species = table
            .records()
            .iter()
            .filter(|r| r.taxon_rank.is_species())
            .map(|r| r.scientific_name.as_str())
            .unique()
            .count();

        let inputs = self
            .manifest
            .inputs
            .iter()
            .map(|input| InputSummary {
                path: input.path.display().to_string(),
                marker: input.marker.clone(),
                otu_db: input.otu_db.clone(),
                records: table
                    .records()
                    .iter()
                    .filter(|r| r.marker == input.marker && r.otu_db == input.otu_db)
                    .count(),
            })
            .collect();

        RunSummary {
            inputs,
            records: table.len(),
            total_reads: table.total_reads(),
            markers: table.markers(),
            events: table.events(),
            species,
            outputs: outputs
                .iter()
                .map(|path| {
                    path.file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.display().to_string())
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InputSpec;
    use std::path::Path;
    use tempfile::tempdir;

    const HEADER: &str = "scientificName\ttaxonRank\tphylum\teventID\torganismQuantity\n";

    fn write_input(dir: &Path, name: &str, rows: &[&str]) -> PathBuf {
        let path = dir.join(name);
        let mut body = String::from(HEADER);
        for row in rows {
            body.push_str(row);
            body.push('\n');
        }
        fs::write(&path, body).unwrap();
        path
    }

    fn two_marker_manifest(dir: &Path) -> RunManifest {
        let coi = write_input(
            dir,
            "coi.tsv",
            &[
                "Salmo salar\tspecies\tChordata\tW-8-singleplex\t100",
                "Gadus morhua\tspecies\tChordata\tW-8-multi-tot\t40",
            ],
        );
        let s16 = write_input(
            dir,
            "16s.tsv",
            &["Salmo salar\tspecies\tChordata\tW-8-multi-tot\t10"],
        );
        RunManifest {
            inputs: vec![
                InputSpec::new(coi, "COI", "MIDORI"),
                InputSpec::new(s16, "16S", "NCBI-16S"),
            ],
            singleplex_event: "W-8-singleplex".to_string(),
            multiplex_event: "W-8-multi-tot".to_string(),
        }
    }

    #[test]
    fn test_run_writes_all_outputs() {
        let dir = tempdir().unwrap();
        let manifest = two_marker_manifest(dir.path());
        let out = dir.path().join("report");

        let summary = ReportRunner::new(manifest, &out, 10).run().unwrap();

        assert_eq!(summary.records, 3);
        assert_eq!(summary.markers, ["COI", "16S"]);
        assert_eq!(summary.species, 2);
        assert_eq!(summary.inputs[0].records, 2);
        assert_eq!(summary.inputs[1].records, 1);
        for name in [
            "taxon_reads.svg",
            "taxon_asvs.svg",
            "quality_breakdown.svg",
            "top_species.svg",
            "overlap_events.svg",
            "overlap_markers.svg",
            "species_table.html",
            "taxon_activity.csv",
            "quality_breakdown.csv",
            "top_species.csv",
            "species_pivot.csv",
            "overlap_events.csv",
            "overlap_markers.csv",
            "run_summary.json",
        ] {
            assert!(out.join(name).exists(), "missing {}", name);
        }
        dir.close().unwrap();
    }

    #[test]
    fn test_run_summary_round_trips_as_json() {
        let dir = tempdir().unwrap();
        let manifest = two_marker_manifest(dir.path());
        let out = dir.path().join("report");
        ReportRunner::new(manifest, &out, 10).run().unwrap();

        let raw = fs::read_to_string(out.join("run_summary.json")).unwrap();
        let parsed: RunSummary = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.records, 3);
        assert_eq!(parsed.total_reads, 150.0);
        assert!(parsed.outputs.contains(&"species_table.html".to_string()));
        dir.close().unwrap();
    }

    #[test]
    fn test_run_aborts_before_writing_when_input_missing() {
        let dir = tempdir().unwrap();
        let manifest = RunManifest {
            inputs: vec![InputSpec::new(
                dir.path().join("absent.tsv"),
                "COI",
                "MIDORI",
            )],
            singleplex_event: "W-8-singleplex".to_string(),
            multiplex_event: "W-8-multi-tot".to_string(),
        };
        let out = dir.path().join("report");

        let err = ReportRunner::new(manifest, &out, 10).run().unwrap_err();
        assert!(matches!(err, ReportError::Load(_)));
        assert!(!out.exists());
        dir.close().unwrap();
    }

    #[test]
    fn test_export_writes_only_tables() {
        let dir = tempdir().unwrap();
        let manifest = two_marker_manifest(dir.path());
        let out = dir.path().join("tables");

        let summary = ReportRunner::new(manifest, &out, 10).export().unwrap();

        assert_eq!(summary.outputs.len(), 6);
        assert!(out.join("taxon_activity.csv").exists());
        assert!(!out.join("taxon_reads.svg").exists());
        assert!(!out.join("run_summary.json").exists());
        dir.close().unwrap();
    }

    #[test]
    fn test_summarize_touches_nothing() {
        let dir = tempdir().unwrap();
        let manifest = two_marker_manifest(dir.path());
        let out = dir.path().join("report");

        let summary = ReportRunner::new(manifest, &out, 10).summarize().unwrap();

        assert_eq!(summary.records, 3);
        assert!(summary.outputs.is_empty());
        assert!(!out.exists());
        let text = summary.render_text();
        assert!(text.contains("Occurrence records: 3"));
        assert!(text.contains("Markers: COI, 16S"));
        dir.close().unwrap();
    }
}
