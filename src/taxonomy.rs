//! Taxonomic rank utilities.
//!
//! Occurrence tables label every row with the rank its identification
//! reached. This module provides the rank ladder and the predicates the
//! aggregation functions filter on.

use serde::{Deserialize, Serialize};

/// Taxonomic rank of an identified ASV.
///
/// The known ladder covers the ranks the reference databases assign;
/// anything else (e.g. "subspecies", or pipeline-specific placeholders)
/// is preserved verbatim in `Other` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxonRank {
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
    Other(String),
}

impl TaxonRank {
    /// Parses a rank label as written in the source tables.
    /// Case-insensitive; surrounding whitespace is ignored.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "kingdom" => TaxonRank::Kingdom,
            "phylum" => TaxonRank::Phylum,
            "class" => TaxonRank::Class,
            "order" => TaxonRank::Order,
            "family" => TaxonRank::Family,
            "genus" => TaxonRank::Genus,
            "species" => TaxonRank::Species,
            _ => TaxonRank::Other(label.trim().to_string()),
        }
    }

    /// Returns a string representation of the rank.
    pub fn as_str(&self) -> &str {
        match self {
            TaxonRank::Kingdom => "kingdom",
            TaxonRank::Phylum => "phylum",
            TaxonRank::Class => "class",
            TaxonRank::Order => "order",
            TaxonRank::Family => "family",
            TaxonRank::Genus => "genus",
            TaxonRank::Species => "species",
            TaxonRank::Other(label) => label.as_str(),
        }
    }

    /// Position on the ladder, coarsest first. `None` for ranks outside it.
    pub fn depth(&self) -> Option<usize> {
        match self {
            TaxonRank::Kingdom => Some(1),
            TaxonRank::Phylum => Some(2),
            TaxonRank::Class => Some(3),
            TaxonRank::Order => Some(4),
            TaxonRank::Family => Some(5),
            TaxonRank::Genus => Some(6),
            TaxonRank::Species => Some(7),
            TaxonRank::Other(_) => None,
        }
    }

    /// True for rows identified to species level.
    pub fn is_species(&self) -> bool {
        matches!(self, TaxonRank::Species)
    }

    /// True for rows identified to species or genus level, the restriction
    /// the wide species table applies.
    pub fn is_species_or_genus(&self) -> bool {
        self.depth() >= TaxonRank::Genus.depth()
    }
}
