//! Top-species ranking for the headline chart.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::occurrence::OccurrenceTable;
use crate::taxonomy::TaxonRank;

/// Default number of species kept by [`top_species`].
pub const DEFAULT_TOP_N: usize = 30;

/// Summed reads and ASV count for one species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesReads {
    pub scientific_name: String,
    pub phylum: Option<String>,
    pub reads: f64,
    pub asv_count: usize,
}

/// Ranks species by total reads and keeps the top `n`.
///
/// Selection and display order are two separate stages. Species are
/// ranked by descending summed reads (ties broken by name) and the top
/// `n` are selected; the selected subset is then re-sorted by phylum
/// (missing phylum last) so the chart groups related bars together.
/// The second sort is stable, so within one phylum the reads-descending
/// order survives.
pub fn top_species(table: &OccurrenceTable, n: usize) -> Vec<SpeciesReads> {
    let mut groups: IndexMap<(Option<&str>, &str), (f64, usize)> = IndexMap::new();
    for record in table.records() {
        if record.taxon_rank != TaxonRank::Species {
            continue;
        }
        let key = (record.phylum.as_deref(), record.scientific_name.as_str());
        let entry = groups.entry(key).or_insert((0.0, 0));
        entry.0 += record.reads();
        entry.1 += 1;
    }

    let mut rows: Vec<SpeciesReads> = groups
        .into_iter()
        .map(|((phylum, name), (reads, asv_count))| SpeciesReads {
            scientific_name: name.to_string(),
            phylum: phylum.map(str::to_string),
            reads,
            asv_count,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.reads
            .partial_cmp(&a.reads)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.scientific_name.cmp(&b.scientific_name))
    });
    rows.truncate(n);

    rows.sort_by(|a, b| match (&a.phylum, &b.phylum) {
        (Some(pa), Some(pb)) => pa.cmp(pb),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::occurrence::OccurrenceRecord;
    use approx::assert_relative_eq;

    fn species(name: &str, phylum: Option<&str>, qty: f64) -> OccurrenceRecord {
        OccurrenceRecord {
            scientific_name: name.to_string(),
            taxon_rank: TaxonRank::Species,
            phylum: phylum.map(str::to_string),
            event_id: "W-8-singleplex".to_string(),
            organism_quantity: Some(qty),
            marker: "COI".to_string(),
            otu_db: "DB".to_string(),
        }
    }

    fn names(rows: &[SpeciesReads]) -> Vec<&str> {
        rows.iter().map(|r| r.scientific_name.as_str()).collect()
    }

    #[test]
    fn test_selection_happens_before_phylum_grouping() {
        // Salmo salar would sort next to Zeus faber by phylum, but the
        // reads cutoff excludes it first.
        let table = OccurrenceTable::new(vec![
            species("Zeus faber", Some("Chordata"), 100.0),
            species("Mytilus edulis", Some("Mollusca"), 90.0),
            species("Salmo salar", Some("Chordata"), 10.0),
        ]);

        let rows = top_species(&table, 2);
        assert_eq!(names(&rows), vec!["Zeus faber", "Mytilus edulis"]);
    }

    #[test]
    fn test_within_phylum_order_stays_reads_descending() {
        let table = OccurrenceTable::new(vec![
            species("Salmo salar", Some("Chordata"), 50.0),
            species("Mytilus edulis", Some("Mollusca"), 70.0),
            species("Zeus faber", Some("Chordata"), 100.0),
            species("Gadus morhua", Some("Chordata"), 20.0),
        ]);

        let rows = top_species(&table, 10);
        assert_eq!(
            names(&rows),
            vec!["Zeus faber", "Salmo salar", "Gadus morhua", "Mytilus edulis"]
        );
    }

    #[test]
    fn test_missing_phylum_sorts_last() {
        let table = OccurrenceTable::new(vec![
            species("Biota sp.", None, 1000.0),
            species("Zeus faber", Some("Chordata"), 5.0),
        ]);

        let rows = top_species(&table, 10);
        assert_eq!(names(&rows), vec!["Zeus faber", "Biota sp."]);
        assert_eq!(rows[1].phylum, None);
    }

    #[test]
    fn test_reads_ties_break_by_name() {
        let table = OccurrenceTable::new(vec![
            species("Zoarces viviparus", Some("Chordata"), 50.0),
            species("Anguilla anguilla", Some("Chordata"), 50.0),
        ]);

        let rows = top_species(&table, 1);
        assert_eq!(names(&rows), vec!["Anguilla anguilla"]);
    }

    #[test]
    fn test_sums_reads_and_counts_asvs_per_species() {
        let table = OccurrenceTable::new(vec![
            species("Gadus morhua", Some("Chordata"), 30.0),
            species("Gadus morhua", Some("Chordata"), 12.0),
        ]);

        let rows = top_species(&table, 10);
        assert_eq!(rows.len(), 1);
        assert_relative_eq!(rows[0].reads, 42.0);
        assert_eq!(rows[0].asv_count, 2);
    }

    #[test]
    fn test_caps_at_n_distinct_names() {
        let records: Vec<OccurrenceRecord> = (0..40)
            .map(|i| species(&format!("Species {i:02}"), Some("Chordata"), i as f64))
            .collect();
        let table = OccurrenceTable::new(records);

        let rows = top_species(&table, 30);
        assert_eq!(rows.len(), 30);
        // The ten smallest read totals were cut.
        assert!(rows.iter().all(|r| r.reads >= 10.0));
    }

    #[test]
    fn test_non_species_ranks_are_ignored() {
        let mut genus = species("Gadus", Some("Chordata"), 500.0);
        genus.taxon_rank = TaxonRank::Genus;
        let table = OccurrenceTable::new(vec![genus, species("Zeus faber", Some("Chordata"), 5.0)]);

        let rows = top_species(&table, 10);
        assert_eq!(names(&rows), vec!["Zeus faber"]);
    }
}
