//! Aggregations over the combined occurrence table.
//!
//! Every function in this module is a pure transform: it takes the
//! immutable [`OccurrenceTable`](crate::occurrence::OccurrenceTable) and
//! produces a smaller summary structure for the presenter. Group-bys use
//! insertion-ordered accumulators and finish with explicit sorts, so
//! identical inputs always yield identically-ordered outputs.

pub mod overlap;
pub mod pivot;
pub mod summary;
pub mod top;

pub use overlap::{
    intersection_of, marker_group, species_sets, union_of, venn_regions, OverlapPartition,
    VennRegion, MERGED_FISH_MAMMAL,
};
pub use pivot::{species_marker_pivot, MarkerPivot};
pub use summary::{quality_breakdown, taxon_activity, QualityRow, ReadClass, TaxonActivityRow};
pub use top::{top_species, SpeciesReads, DEFAULT_TOP_N};

/// Group label for rows whose source phylum cell was missing.
pub const UNIDENTIFIED: &str = "unidentified";
