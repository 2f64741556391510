//! Run configuration.
//!
//! A run manifest names the occurrence tables to load, the marker and
//! reference-database labels their rows are tagged with, and the two
//! event ids the singleplex/multiplex read totals are computed from.
//! Manifest order is load order, which fixes the record order of the
//! combined table.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};

/// One input table and the labels every row it contributes is tagged with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    /// Path to the tab-separated occurrence table, usually relative to
    /// the run's input directory.
    pub path: PathBuf,
    /// Genetic marker the run amplified (e.g. "COI").
    pub marker: String,
    /// Reference database the run was classified against. Two runs of
    /// the same marker against different databases stay separate
    /// partitions and are never merged.
    pub otu_db: String,
}

impl InputSpec {
    pub fn new(path: impl Into<PathBuf>, marker: &str, otu_db: &str) -> Self {
        InputSpec {
            path: path.into(),
            marker: marker.to_string(),
            otu_db: otu_db.to_string(),
        }
    }
}

/// Inputs and event names of one comparison run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub inputs: Vec<InputSpec>,
    /// Event id of the one-marker-at-a-time PCR runs.
    pub singleplex_event: String,
    /// Event id of the all-markers-at-once PCR runs.
    pub multiplex_event: String,
}

impl RunManifest {
    /// The built-in manifest for the W8 water sample: five markers, with
    /// MiFish and MiMammal sharing the MitoFish reference database.
    pub fn w8_default() -> Self {
        RunManifest {
            inputs: vec![
                InputSpec::new("occurrence_coi.tsv", "COI", "MIDORI"),
                InputSpec::new("occurrence_16s.tsv", "16S", "NCBI-16S"),
                InputSpec::new("occurrence_mifish.tsv", "MiFish", "MitoFish"),
                InputSpec::new("occurrence_mimammal.tsv", "MiMammal", "MitoFish"),
                InputSpec::new("occurrence_teleo.tsv", "Teleo", "NCBI-Teleo"),
            ],
            singleplex_event: "W-8-singleplex".to_string(),
            multiplex_event: "W-8-multi-tot".to_string(),
        }
    }

    /// Loads a manifest from a JSON file.
    pub fn from_json(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open manifest '{}'", path.display()))?;
        let manifest: RunManifest = serde_json::from_reader(file)
            .with_context(|| format!("failed to parse manifest '{}'", path.display()))?;
        if manifest.inputs.is_empty() {
            bail!("manifest '{}' lists no input tables", path.display());
        }
        Ok(manifest)
    }

    /// Returns a copy with every relative input path joined onto
    /// `base_dir`. Absolute paths are kept as they are.
    pub fn resolved_against(&self, base_dir: &Path) -> Self {
        let mut resolved = self.clone();
        for input in &mut resolved.inputs {
            if input.path.is_relative() {
                input.path = base_dir.join(&input.path);
            }
        }
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_w8_default_lists_all_five_markers() {
        let manifest = RunManifest::w8_default();
        let markers: Vec<&str> = manifest.inputs.iter().map(|i| i.marker.as_str()).collect();
        assert_eq!(markers, vec!["COI", "16S", "MiFish", "MiMammal", "Teleo"]);
        // MiFish and MiMammal map to the same reference database.
        assert_eq!(manifest.inputs[2].otu_db, manifest.inputs[3].otu_db);
        assert_eq!(manifest.singleplex_event, "W-8-singleplex");
        assert_eq!(manifest.multiplex_event, "W-8-multi-tot");
    }

    #[test]
    fn test_from_json_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("manifest.json");
        let mut file = File::create(&path).unwrap();
        let json = serde_json::to_string(&RunManifest::w8_default()).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let loaded = RunManifest::from_json(&path).unwrap();
        assert_eq!(loaded.inputs.len(), 5);
        assert_eq!(loaded.inputs[0].marker, "COI");
    }

    #[test]
    fn test_from_json_rejects_empty_inputs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.json");
        let mut file = File::create(&path).unwrap();
        file.write_all(
            br#"{"inputs": [], "singleplex_event": "s", "multiplex_event": "m"}"#,
        )
        .unwrap();

        assert!(RunManifest::from_json(&path).is_err());
    }

    #[test]
    fn test_from_json_missing_file() {
        assert!(RunManifest::from_json(Path::new("no_such_manifest.json")).is_err());
    }

    #[test]
    fn test_resolved_against_joins_relative_paths_only() {
        let mut manifest = RunManifest::w8_default();
        manifest.inputs[0].path = PathBuf::from("/abs/occurrence_coi.tsv");
        let resolved = manifest.resolved_against(Path::new("/data/w8"));
        assert_eq!(resolved.inputs[0].path, PathBuf::from("/abs/occurrence_coi.tsv"));
        assert_eq!(
            resolved.inputs[1].path,
            PathBuf::from("/data/w8/occurrence_16s.tsv")
        );
    }
}
