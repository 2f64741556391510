//! The unified occurrence table.
//!
//! One `OccurrenceRecord` per observed taxon-unit (ASV) within one
//! sequencing run. Records are created once, at load time, by
//! concatenating the per-run input tables; the combined table is
//! immutable after construction and every downstream step derives new
//! aggregates from it.

use serde::{Deserialize, Serialize};

use crate::taxonomy::TaxonRank;

/// One row of an occurrence table: a single ASV observed in one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    /// Taxon name. May be a placeholder: "Biota" for unidentified
    /// material, "Homo sapiens" for human contamination.
    pub scientific_name: String,
    /// Rank the identification reached.
    pub taxon_rank: TaxonRank,
    /// `None` when the taxon could not be classified to a phylum.
    pub phylum: Option<String>,
    /// PCR approach/sample event, e.g. "W-8-singleplex", "W-8-multi-tot".
    pub event_id: String,
    /// Read count; `None` when the source cell was missing. Present
    /// values are validated non-negative and finite at load time.
    pub organism_quantity: Option<f64>,
    /// Genetic marker this run amplified. Tagged at load time.
    pub marker: String,
    /// Reference database the run was classified against. Tagged at
    /// load time.
    pub otu_db: String,
}

impl OccurrenceRecord {
    /// Read count with a missing cell treated as zero, the convention
    /// every sum in the aggregation layer uses.
    pub fn reads(&self) -> f64 {
        self.organism_quantity.unwrap_or(0.0)
    }
}

/// Normalizes a raw source cell: the empty string and the literal token
/// `nan` (after trimming) encode a missing value.
pub fn non_missing(field: &str) -> Option<&str> {
    let trimmed = field.trim();
    if trimmed.is_empty() || trimmed == "nan" {
        None
    } else {
        Some(trimmed)
    }
}

/// The combined table over all loaded runs.
///
/// Construction fixes record order to the concatenation order of the
/// input files, which keeps every downstream ordering reproducible.
#[derive(Debug, Default)]
pub struct OccurrenceTable {
    records: Vec<OccurrenceRecord>,
}

impl OccurrenceTable {
    pub fn new(records: Vec<OccurrenceRecord>) -> Self {
        OccurrenceTable { records }
    }

    pub fn records(&self) -> &[OccurrenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct markers in first-seen (manifest) order.
    pub fn markers(&self) -> Vec<String> {
        use itertools::Itertools;
        self.records
            .iter()
            .map(|r| r.marker.clone())
            .unique()
            .collect()
    }

    /// Distinct event ids in first-seen order.
    pub fn events(&self) -> Vec<String> {
        use itertools::Itertools;
        self.records
            .iter()
            .map(|r| r.event_id.clone())
            .unique()
            .collect()
    }

    /// Sum of all read counts, missing cells contributing zero.
    pub fn total_reads(&self) -> f64 {
        self.records.iter().map(|r| r.reads()).sum()
    }
}
