//! The wide species × marker comparison table.

use indexmap::IndexMap;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::occurrence::OccurrenceTable;

/// Wide comparison table: one row per distinct species-or-genus name,
/// one reads column per marker, plus per-event read totals.
///
/// A cell is `None` when no row of the combined table contributed to
/// that (name, marker) combination. That is distinct from `Some(0.0)`,
/// which means rows existed but recorded no reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerPivot {
    /// Reads per (species row, marker column).
    pub reads: Array2<Option<f64>>,

    /// Row index to name, rows sorted by total reads descending.
    pub species_names: Vec<String>,
    pub species_map: HashMap<String, usize>,

    /// Column index to marker, in first-seen (manifest) order.
    pub marker_names: Vec<String>,
    pub marker_map: HashMap<String, usize>,

    /// Phylum per row; the first classified record of the name wins.
    pub phyla: Vec<Option<String>>,

    /// Per-row read totals restricted to the singleplex event.
    pub single_total: Vec<Option<f64>>,
    /// Per-row read totals restricted to the multiplex event.
    pub multi_total: Vec<Option<f64>>,
}

impl MarkerPivot {
    /// Returns the dimensions of the pivot (species rows, marker columns).
    pub fn dimensions(&self) -> (usize, usize) {
        self.reads.dim()
    }

    /// Row index of a species name.
    pub fn species_row(&self, species: &str) -> Option<usize> {
        self.species_map.get(species).copied()
    }

    /// Reads cell for a (species, marker) combination. `None` covers
    /// both an unknown name/marker and an empty cell.
    pub fn cell(&self, species: &str, marker: &str) -> Option<f64> {
        let row = *self.species_map.get(species)?;
        let col = *self.marker_map.get(marker)?;
        self.reads[[row, col]]
    }

    /// Sum of the non-null marker cells of one row.
    pub fn row_total(&self, row: usize) -> f64 {
        self.reads.row(row).iter().filter_map(|cell| *cell).sum()
    }
}

struct SpeciesAcc {
    phylum: Option<String>,
    cells: HashMap<usize, f64>,
    single: Option<f64>,
    multi: Option<f64>,
}

/// Builds the wide pivot from the combined table.
///
/// Restricted to species-or-genus rank. Reads are summed per
/// (name, marker); the two event totals sum the same restricted rows
/// per event id. A total is `None` when the name never occurs in that
/// event, mirroring the cell semantics.
pub fn species_marker_pivot(
    table: &OccurrenceTable,
    singleplex_event: &str,
    multiplex_event: &str,
) -> MarkerPivot {
    let marker_names = table.markers();
    let marker_map: HashMap<String, usize> = marker_names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), i))
        .collect();

    let mut species: IndexMap<String, SpeciesAcc> = IndexMap::new();
    for record in table.records() {
        if !record.taxon_rank.is_species_or_genus() {
            continue;
        }
        let acc = species
            .entry(record.scientific_name.clone())
            .or_insert_with(|| SpeciesAcc {
                phylum: None,
                cells: HashMap::new(),
                single: None,
                multi: None,
            });
        if acc.phylum.is_none() {
            acc.phylum = record.phylum.clone();
        }

        let reads = record.reads();
        if let Some(&col) = marker_map.get(&record.marker) {
            *acc.cells.entry(col).or_insert(0.0) += reads;
        }
        if record.event_id == singleplex_event {
            acc.single = Some(acc.single.unwrap_or(0.0) + reads);
        } else if record.event_id == multiplex_event {
            acc.multi = Some(acc.multi.unwrap_or(0.0) + reads);
        }
    }

    // Rows sorted by total reads descending, names breaking ties, so
    // the heaviest species lead the exported table.
    let mut entries: Vec<(f64, String, SpeciesAcc)> = species
        .into_iter()
        .map(|(name, acc)| {
            let total: f64 = acc.cells.values().sum();
            (total, name, acc)
        })
        .collect();
    entries.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });

    let mut reads = Array2::from_elem((entries.len(), marker_names.len()), None);
    let mut species_names = Vec::with_capacity(entries.len());
    let mut phyla = Vec::with_capacity(entries.len());
    let mut single_total = Vec::with_capacity(entries.len());
    let mut multi_total = Vec::with_capacity(entries.len());

    for (row, (_, name, acc)) in entries.into_iter().enumerate() {
        for (&col, &sum) in &acc.cells {
            reads[[row, col]] = Some(sum);
        }
        species_names.push(name);
        phyla.push(acc.phylum);
        single_total.push(acc.single);
        multi_total.push(acc.multi);
    }

    let species_map = species_names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.clone(), i))
        .collect();

    MarkerPivot {
        reads,
        species_names,
        species_map,
        marker_names,
        marker_map,
        phyla,
        single_total,
        multi_total,
    }
}
