//! Species-set construction and multi-way overlap counting.
//!
//! The comparison questions ("which species did both PCR strategies
//! find", "which species are private to one marker") reduce to set
//! algebra over the distinct species names of each partition. This
//! module builds the named sets and computes the exclusive region counts
//! the Venn-style diagrams are labeled with.

use indexmap::IndexMap;
use itertools::Itertools;
use std::collections::BTreeSet;

use crate::occurrence::OccurrenceTable;
use crate::taxonomy::TaxonRank;

/// Label under which MiFish and MiMammal merge for overlap analysis.
/// The two markers are classified against the same reference database,
/// so their species pools are compared as one group.
pub const MERGED_FISH_MAMMAL: &str = "MiFish/MiMammal";

/// How to partition the table into named species sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlapPartition {
    /// One set per sequencing event (PCR strategy).
    ByEvent,
    /// One set per marker, with MiFish and MiMammal merged.
    ByMarkerGroup,
}

/// Normalized marker label used by [`OverlapPartition::ByMarkerGroup`].
pub fn marker_group(marker: &str) -> &str {
    match marker {
        "MiFish" | "MiMammal" => MERGED_FISH_MAMMAL,
        other => other,
    }
}

/// Distinct species names per group, groups in first-seen order.
///
/// Only species-rank rows contribute. The name sets are ordered
/// (`BTreeSet`) so that identical inputs always iterate identically.
pub fn species_sets(
    table: &OccurrenceTable,
    partition: OverlapPartition,
) -> IndexMap<String, BTreeSet<String>> {
    let mut sets: IndexMap<String, BTreeSet<String>> = IndexMap::new();
    for record in table.records() {
        if record.taxon_rank != TaxonRank::Species {
            continue;
        }
        let group = match partition {
            OverlapPartition::ByEvent => record.event_id.clone(),
            OverlapPartition::ByMarkerGroup => marker_group(&record.marker).to_string(),
        };
        sets.entry(group)
            .or_default()
            .insert(record.scientific_name.clone());
    }
    sets
}

/// Names present in at least one of the sets.
pub fn union_of(sets: &IndexMap<String, BTreeSet<String>>) -> BTreeSet<String> {
    sets.values().flat_map(|set| set.iter().cloned()).collect()
}

/// Names present in every set. Empty when the map is empty.
pub fn intersection_of(sets: &IndexMap<String, BTreeSet<String>>) -> BTreeSet<String> {
    let mut values = sets.values();
    let mut common = match values.next() {
        Some(first) => first.clone(),
        None => return BTreeSet::new(),
    };
    for set in values {
        common = common.intersection(set).cloned().collect();
    }
    common
}

/// Exclusive membership count for one non-empty subset of the groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VennRegion {
    /// The groups this region belongs to, in set order.
    pub groups: Vec<String>,
    /// Number of names in every `groups` member and in no other set.
    pub count: usize,
}

impl VennRegion {
    /// Human-readable region label, e.g. "COI ∩ 16S".
    pub fn label(&self) -> String {
        self.groups.join(" ∩ ")
    }
}

/// Computes the 2^n - 1 exclusive region counts of an n-way overlap.
///
/// Regions come out singles first, then pairs, and so on, which is the
/// order the diagrams label them in. Every name of the union falls in
/// exactly one region, so region counts sum to the union size.
pub fn venn_regions(sets: &IndexMap<String, BTreeSet<String>>) -> Vec<VennRegion> {
    let entries: Vec<(&String, &BTreeSet<String>)> = sets.iter().collect();
    let all_names = union_of(sets);

    let mut regions = Vec::new();
    for subset in (0..entries.len()).powerset() {
        if subset.is_empty() {
            continue;
        }
        let count = all_names
            .iter()
            .filter(|name| {
                (0..entries.len()).all(|i| entries[i].1.contains(*name) == subset.contains(&i))
            })
            .count();
        regions.push(VennRegion {
            groups: subset.iter().map(|&i| entries[i].0.clone()).collect(),
            count,
        });
    }
    regions
}
