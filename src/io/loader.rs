//! Reading occurrence tables.
//!
//! Each input is a tab-separated table with a header row, produced by the
//! upstream bioinformatics pipeline. The loader locates the columns it
//! needs by name, normalizes the missing-value encodings (empty string,
//! literal `nan`), tags every row with the marker and reference-database
//! labels from the run manifest, and concatenates all inputs in manifest
//! order. Any failure aborts the load immediately; there is no
//! partial-result recovery.

use csv::ReaderBuilder;
use log::info;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::RunManifest;
use crate::occurrence::{non_missing, OccurrenceRecord, OccurrenceTable};
use crate::taxonomy::TaxonRank;

/// Column names exactly as the upstream pipeline writes them.
pub const COL_SCIENTIFIC_NAME: &str = "scientificName";
pub const COL_TAXON_RANK: &str = "taxonRank";
pub const COL_PHYLUM: &str = "phylum";
pub const COL_EVENT_ID: &str = "eventID";
pub const COL_ORGANISM_QUANTITY: &str = "organismQuantity";

/// A required column is absent from an input table's header.
#[derive(Error, Debug)]
#[error("'{}': required column '{column}' missing from header", .path.display())]
pub struct DataShapeError {
    pub path: PathBuf,
    pub column: &'static str,
}

/// A fatal load failure. The run aborts on the first one.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to open '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed table '{}': {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Shape(#[from] DataShapeError),

    #[error("'{}' row {row}: organismQuantity '{value}' is not a non-negative number", .path.display())]
    BadQuantity {
        path: PathBuf,
        row: usize,
        value: String,
    },
}

/// Header positions of the columns a table contributes. `phylum` is the
/// only optional column; when it is absent every row loads unclassified.
struct ColumnIndices {
    scientific_name: usize,
    taxon_rank: usize,
    phylum: Option<usize>,
    event_id: usize,
    organism_quantity: usize,
}

fn locate_columns(path: &Path, headers: &csv::StringRecord) -> Result<ColumnIndices, DataShapeError> {
    let find = |name: &str| headers.iter().position(|h| h.trim() == name);
    let require = |name: &'static str| {
        find(name).ok_or_else(|| DataShapeError {
            path: path.to_path_buf(),
            column: name,
        })
    };

    Ok(ColumnIndices {
        scientific_name: require(COL_SCIENTIFIC_NAME)?,
        taxon_rank: require(COL_TAXON_RANK)?,
        phylum: find(COL_PHYLUM),
        event_id: require(COL_EVENT_ID)?,
        organism_quantity: require(COL_ORGANISM_QUANTITY)?,
    })
}

/// Reads one occurrence table, tagging every row with `marker`/`otu_db`.
///
/// Row order follows the file. Rows are never dropped: missing cells
/// load as `None` (or as the "Biota" placeholder for a missing name, the
/// same convention the upstream pipeline uses for unidentified material).
pub fn read_occurrence_table(
    path: &Path,
    marker: &str,
    otu_db: &str,
) -> Result<Vec<OccurrenceRecord>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .from_reader(BufReader::new(file));

    let headers = reader
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let cols = locate_columns(path, &headers)?;

    let mut records = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let row = result.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        // 1-based line number counting the header, for error messages.
        let row_number = idx + 2;

        let scientific_name = non_missing(row.get(cols.scientific_name).unwrap_or(""))
            .unwrap_or("Biota")
            .to_string();
        let taxon_rank = TaxonRank::parse(row.get(cols.taxon_rank).unwrap_or(""));
        let phylum = cols
            .phylum
            .and_then(|i| row.get(i))
            .and_then(non_missing)
            .map(str::to_string);
        let event_id = non_missing(row.get(cols.event_id).unwrap_or(""))
            .unwrap_or("")
            .to_string();
        let organism_quantity = match non_missing(row.get(cols.organism_quantity).unwrap_or("")) {
            None => None,
            Some(token) => {
                let value = token.parse::<f64>().ok().filter(|q| q.is_finite() && *q >= 0.0);
                match value {
                    Some(q) => Some(q),
                    None => {
                        return Err(LoadError::BadQuantity {
                            path: path.to_path_buf(),
                            row: row_number,
                            value: token.to_string(),
                        })
                    }
                }
            }
        };

        records.push(OccurrenceRecord {
            scientific_name,
            taxon_rank,
            phylum,
            event_id,
            organism_quantity,
            marker: marker.to_string(),
            otu_db: otu_db.to_string(),
        });
    }

    Ok(records)
}

/// Loads every input named by the manifest and concatenates them, in
/// manifest order, into the unified table.
pub fn load_manifest(manifest: &RunManifest) -> Result<OccurrenceTable, LoadError> {
    let mut all = Vec::new();
    for input in &manifest.inputs {
        let records = read_occurrence_table(&input.path, &input.marker, &input.otu_db)?;
        info!(
            "loaded {} records from '{}' (marker {}, db {})",
            records.len(),
            input.path.display(),
            input.marker,
            input.otu_db
        );
        all.extend(records);
    }
    info!(
        "combined table holds {} records from {} input(s)",
        all.len(),
        manifest.inputs.len()
    );
    Ok(OccurrenceTable::new(all))
}
