//! Read and ASV summaries grouped by taxon, event and marker.
//!
//! Two summaries live here: the per-(phylum, event, marker) activity
//! table behind the faceted bar charts, and the read quality breakdown
//! that splits every record into human, unidentified or other reads.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

use super::UNIDENTIFIED;
use crate::occurrence::OccurrenceTable;
use crate::taxonomy::TaxonRank;

/// One (phylum, event, marker) group of the combined table.
///
/// `phylum` is the display label; rows whose source phylum was missing
/// group under [`UNIDENTIFIED`] with `identified` set to false. They are
/// counted like any other group, never dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonActivityRow {
    pub phylum: String,
    pub identified: bool,
    pub event_id: String,
    pub marker: String,
    /// Sum of read counts; a missing count contributes zero.
    pub reads: f64,
    /// Number of ASV rows in the group.
    pub asv_count: usize,
    /// Distinct species names among the group's species-rank rows.
    pub species_count: usize,
}

struct ActivityAcc<'a> {
    reads: f64,
    asv_count: usize,
    species: BTreeSet<&'a str>,
}

/// Groups the table by (phylum, event, marker).
///
/// Output rows are sorted by (marker, event, reads descending, phylum)
/// so chart layout and CSV export are stable across runs.
pub fn taxon_activity(table: &OccurrenceTable) -> Vec<TaxonActivityRow> {
    let mut groups: IndexMap<(Option<&str>, &str, &str), ActivityAcc> = IndexMap::new();
    for record in table.records() {
        let key = (
            record.phylum.as_deref(),
            record.event_id.as_str(),
            record.marker.as_str(),
        );
        let acc = groups.entry(key).or_insert_with(|| ActivityAcc {
            reads: 0.0,
            asv_count: 0,
            species: BTreeSet::new(),
        });
        acc.reads += record.reads();
        acc.asv_count += 1;
        if record.taxon_rank == TaxonRank::Species {
            acc.species.insert(record.scientific_name.as_str());
        }
    }

    let mut rows: Vec<TaxonActivityRow> = groups
        .into_iter()
        .map(|((phylum, event_id, marker), acc)| TaxonActivityRow {
            phylum: phylum.unwrap_or(UNIDENTIFIED).to_string(),
            identified: phylum.is_some(),
            event_id: event_id.to_string(),
            marker: marker.to_string(),
            reads: acc.reads,
            asv_count: acc.asv_count,
            species_count: acc.species.len(),
        })
        .collect();

    rows.sort_by(|a, b| {
        a.marker
            .cmp(&b.marker)
            .then_with(|| a.event_id.cmp(&b.event_id))
            .then_with(|| b.reads.partial_cmp(&a.reads).unwrap_or(Ordering::Equal))
            .then_with(|| a.phylum.cmp(&b.phylum))
    });
    rows
}

/// Quality class of a single record, decided by its scientific name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadClass {
    /// Human contamination ("Homo sapiens").
    Human,
    /// Material the pipeline could not identify ("Biota").
    Unidentified,
    /// Everything else.
    Other,
}

impl ReadClass {
    /// Classifies a record by its scientific name. Every name falls into
    /// exactly one class.
    pub fn classify(scientific_name: &str) -> Self {
        match scientific_name {
            "Homo sapiens" => ReadClass::Human,
            "Biota" => ReadClass::Unidentified,
            _ => ReadClass::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadClass::Human => "human",
            ReadClass::Unidentified => "unidentified",
            ReadClass::Other => "other",
        }
    }
}

/// Read total for one (event, marker, class) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityRow {
    pub event_id: String,
    pub marker: String,
    pub class: ReadClass,
    pub reads: f64,
}

/// Sums reads per (event, marker, quality class).
///
/// Only observed cells appear; a class with no reads in a given
/// event/marker simply has no row.
pub fn quality_breakdown(table: &OccurrenceTable) -> Vec<QualityRow> {
    let mut groups: IndexMap<(&str, &str, ReadClass), f64> = IndexMap::new();
    for record in table.records() {
        let class = ReadClass::classify(&record.scientific_name);
        let key = (record.event_id.as_str(), record.marker.as_str(), class);
        *groups.entry(key).or_insert(0.0) += record.reads();
    }

    let mut rows: Vec<QualityRow> = groups
        .into_iter()
        .map(|((event_id, marker, class), reads)| QualityRow {
            event_id: event_id.to_string(),
            marker: marker.to_string(),
            class,
            reads,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.marker
            .cmp(&b.marker)
            .then_with(|| a.event_id.cmp(&b.event_id))
            .then_with(|| a.class.cmp(&b.class))
    });
    rows
}
