//! Input/output operations.
//!
//! Reading the occurrence tables lives in [`loader`]; this module holds
//! the CSV writers for the aggregate exports. Missing values are written
//! as empty fields so a spreadsheet keeps "no reads recorded" distinct
//! from a recorded zero.

pub mod loader;

use anyhow::Result;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::aggregate::{MarkerPivot, QualityRow, SpeciesReads, TaxonActivityRow, VennRegion};

/// Writes the per-(phylum, event, marker) activity table.
pub fn write_taxon_activity(rows: &[TaxonActivityRow], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    writer.write_record([
        "phylum",
        "identified",
        "event_id",
        "marker",
        "reads",
        "asv_count",
        "species_count",
    ])?;

    for row in rows {
        writer.write_record([
            row.phylum.clone(),
            row.identified.to_string(),
            row.event_id.clone(),
            row.marker.clone(),
            row.reads.to_string(),
            row.asv_count.to_string(),
            row.species_count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the read quality breakdown.
pub fn write_quality_breakdown(rows: &[QualityRow], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    writer.write_record(["event_id", "marker", "class", "reads"])?;
    for row in rows {
        writer.write_record([
            row.event_id.clone(),
            row.marker.clone(),
            row.class.as_str().to_string(),
            row.reads.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the ranked top-species table in its display order.
pub fn write_top_species(rows: &[SpeciesReads], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    writer.write_record(["scientific_name", "phylum", "reads", "asv_count"])?;
    for row in rows {
        writer.write_record([
            row.scientific_name.clone(),
            row.phylum.clone().unwrap_or_default(),
            row.reads.to_string(),
            row.asv_count.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the wide species × marker pivot.
///
/// Column names follow the interactive table: `scientificName`,
/// `phylum`, one column per marker, then the two event totals. Null
/// cells come out as empty fields, never as zero.
pub fn write_marker_pivot(pivot: &MarkerPivot, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    let mut header = vec!["scientificName".to_string(), "phylum".to_string()];
    header.extend(pivot.marker_names.iter().cloned());
    header.push("single".to_string());
    header.push("multi".to_string());
    writer.write_record(&header)?;

    let (n_species, n_markers) = pivot.dimensions();
    let optional = |value: Option<f64>| value.map_or(String::new(), |v| v.to_string());

    for row in 0..n_species {
        let mut record = Vec::with_capacity(n_markers + 4);
        record.push(pivot.species_names[row].clone());
        record.push(pivot.phyla[row].clone().unwrap_or_default());
        for col in 0..n_markers {
            record.push(optional(pivot.reads[[row, col]]));
        }
        record.push(optional(pivot.single_total[row]));
        record.push(optional(pivot.multi_total[row]));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes the exclusive overlap region counts.
pub fn write_overlap_regions(regions: &[VennRegion], path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(file));

    writer.write_record(["groups", "species_count"])?;
    for region in regions {
        writer.write_record([region.groups.join(" + "), region.count.to_string()])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ReadClass;
    use ndarray::arr2;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_pivot() -> MarkerPivot {
        let reads = arr2(&[[Some(100.0), None], [Some(0.0), Some(2.5)]]);
        let species_names: Vec<String> = vec!["Gadus morhua", "Salmo salar"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let marker_names: Vec<String> = vec!["COI", "16S"].iter().map(|s| s.to_string()).collect();
        let species_map: HashMap<String, usize> = species_names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        let marker_map: HashMap<String, usize> = marker_names
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
            phyla: vec![Some("Chordata".to_string()), None],
            single_total: vec![Some(100.0), Some(2.5)],
            multi_total: vec![None, Some(0.0)],
        }
    }

    #[test]
    fn test_write_taxon_activity_csv() {
        let rows = vec![TaxonActivityRow {
            phylum: "Chordata".to_string(),
            identified: true,
            event_id: "W-8-singleplex".to_string(),
            marker: "COI".to_string(),
            reads: 125.0,
            asv_count: 3,
            species_count: 1,
        }];
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("activity.csv");

        write_taxon_activity(&rows, &file_path).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let expected = "\
phylum,identified,event_id,marker,reads,asv_count,species_count\n\
Chordata,true,W-8-singleplex,COI,125,3,1\n";
        assert_eq!(content, expected);

        dir.close().unwrap();
    }

    #[test]
    fn test_write_quality_breakdown_csv() {
        let rows = vec![
            QualityRow {
                event_id: "W-8-singleplex".to_string(),
                marker: "COI".to_string(),
                class: ReadClass::Human,
                reads: 50.5,
            },
            QualityRow {
                event_id: "W-8-singleplex".to_string(),
                marker: "COI".to_string(),
                class: ReadClass::Other,
                reads: 20.0,
            },
        ];
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("quality.csv");

        write_quality_breakdown(&rows, &file_path).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let expected = "\
event_id,marker,class,reads\n\
W-8-singleplex,COI,human,50.5\n\
W-8-singleplex,COI,other,20\n";
        assert_eq!(content, expected);

        dir.close().unwrap();
    }

    #[test]
    fn test_write_top_species_keeps_missing_phylum_empty() {
        let rows = vec![SpeciesReads {
            scientific_name: "Biota sp.".to_string(),
            phylum: None,
            reads: 7.0,
            asv_count: 2,
        }];
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("top.csv");

        write_top_species(&rows, &file_path).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let expected = "\
scientific_name,phylum,reads,asv_count\n\
Biota sp.,,7,2\n";
        assert_eq!(content, expected);

        dir.close().unwrap();
    }

    #[test]
    fn test_write_marker_pivot_renders_null_as_empty_field() {
        let pivot = create_test_pivot();
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("pivot.csv");

        write_marker_pivot(&pivot, &file_path).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        // A contributing row with zero reads stays "0"; an absent
        // combination stays an empty field.
        let expected = "\
scientificName,phylum,COI,16S,single,multi\n\
Gadus morhua,Chordata,100,,100,\n\
Salmo salar,,0,2.5,2.5,0\n";
        assert_eq!(content, expected);

        dir.close().unwrap();
    }

    #[test]
    fn test_write_overlap_regions_csv() {
        let regions = vec![
            VennRegion {
                groups: vec!["COI".to_string()],
                count: 12,
            },
            VennRegion {
                groups: vec!["COI".to_string(), "16S".to_string()],
                count: 3,
            },
        ];
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("overlap.csv");

        write_overlap_regions(&regions, &file_path).unwrap();

        let content = fs::read_to_string(&file_path).unwrap();
        let expected = "\
groups,species_count\n\
COI,12\n\
COI + 16S,3\n";
        assert_eq!(content, expected);

        dir.close().unwrap();
    }
}
