//! SVG chart rendering with `plotters`.
//!
//! Every chart method takes one aggregate table, draws a fixed-name file
//! under the output directory and returns the path it wrote. Charts are
//! still written when the input is empty, with a short note in place of
//! the figure, so a report always links to existing files.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use itertools::Itertools;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::aggregate::{
    venn_regions, QualityRow, ReadClass, SpeciesReads, TaxonActivityRow, UNIDENTIFIED,
};

use super::VisualizationError;

/// Bottom of the log-scaled read axes. Slightly below 1 so single-read
/// bars keep a visible height.
const READS_FLOOR: f64 = 0.8;

/// Renders SVG charts into a single output directory.
pub struct Visualizer {
    output_dir: PathBuf,
}

fn reads_of(row: &TaxonActivityRow) -> f64 {
    row.reads
}

fn asvs_of(row: &TaxonActivityRow) -> f64 {
    row.asv_count as f64
}

impl Visualizer {
    /// Creates the output directory if it does not exist yet.
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, VisualizationError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        if !output_dir.exists() {
            fs::create_dir_all(&output_dir)?;
        }
        Ok(Visualizer { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Read totals per phylum, one panel per marker, log-scaled y axis.
    pub fn taxon_reads_chart(
        &self,
        rows: &[TaxonActivityRow],
    ) -> Result<PathBuf, VisualizationError> {
        self.activity_chart(
            rows,
            "taxon_reads.svg",
            "Reads per phylum and marker",
            "Reads",
            reads_of,
        )
    }

    /// ASV counts per phylum, same layout as the read chart.
    pub fn taxon_asvs_chart(
        &self,
        rows: &[TaxonActivityRow],
    ) -> Result<PathBuf, VisualizationError> {
        self.activity_chart(
            rows,
            "taxon_asvs.svg",
            "ASVs per phylum and marker",
            "ASVs",
            asvs_of,
        )
    }

    /// Shared layout for the two phylum activity charts: one panel per
    /// marker, phyla on the x axis, one bar per sampling event.
    fn activity_chart(
        &self,
        rows: &[TaxonActivityRow],
        file_name: &str,
        caption: &str,
        y_desc: &str,
        value: fn(&TaxonActivityRow) -> f64,
    ) -> Result<PathBuf, VisualizationError> {
        let output_file = self.output_dir.join(file_name);
        let root = SVGBackend::new(&output_file, (1400, 540)).into_drawing_area();
        root.fill(&WHITE)?;

        if rows.is_empty() {
            draw_note(&root, "no occurrence data")?;
            root.present()?;
            return Ok(output_file.clone());
        }

        let root = root.titled(caption, ("sans-serif", 24))?;

        let markers: Vec<String> = rows.iter().map(|r| r.marker.clone()).unique().collect();
        let events: Vec<String> = rows.iter().map(|r| r.event_id.clone()).unique().collect();
        let mut phyla: Vec<String> = rows.iter().map(|r| r.phylum.clone()).unique().collect();
        phyla.sort_by_key(|p| (p == UNIDENTIFIED, p.clone()));

        let max_value = rows.iter().map(value).fold(f64::MIN, f64::max).max(10.0);

        let panels = root.split_evenly((1, markers.len()));
        for (panel_idx, (panel, marker)) in panels.iter().zip(&markers).enumerate() {
            let panel = panel.titled(marker.as_str(), ("sans-serif", 17))?;
            let facet: Vec<&TaxonActivityRow> =
                rows.iter().filter(|r| &r.marker == marker).collect();

            let mut chart = ChartBuilder::on(&panel)
                .margin(8)
                .x_label_area_size(95)
                .y_label_area_size(55)
                .build_cartesian_2d(
                    -0.5f64..phyla.len() as f64 - 0.5,
                    (READS_FLOOR..max_value * 2.0).log_scale(),
                )?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .y_desc(y_desc)
                .x_labels(phyla.len())
                .x_label_style(
                    ("sans-serif", 11)
                        .into_font()
                        .transform(FontTransform::Rotate90),
                )
                .x_label_formatter(&|x| {
                    let tick = x.round();
                    if tick < 0.0 {
                        return String::new();
                    }
                    phyla.get(tick as usize).cloned().unwrap_or_default()
                })
                .draw()?;

            let slot = 0.8 / events.len() as f64;
            for (event_idx, event) in events.iter().enumerate() {
                let color = index_color(event_idx);
                let series = chart.draw_series(phyla.iter().enumerate().filter_map(
                    |(phylum_idx, phylum)| {
                        let v: f64 = facet
                            .iter()
                            .filter(|r| &r.phylum == phylum && &r.event_id == event)
                            .map(|r| value(r))
                            .sum();
                        // zero-height bars disappear on the log axis anyway
                        if v < 1.0 {
                            return None;
                        }
                        let x0 = phylum_idx as f64 - 0.4 + event_idx as f64 * slot + slot * 0.1;
                        let x1 = x0 + slot * 0.8;
                        Some(Rectangle::new(
                            [(x0, READS_FLOOR), (x1, v)],
                            color.mix(0.85).filled(),
                        ))
                    },
                ))?;
                if panel_idx == 0 {
                    series.label(event.clone()).legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.mix(0.85).filled())
                    });
                }
            }

            if panel_idx == 0 {
                chart
                    .configure_series_labels()
                    .border_style(&BLACK)
                    .background_style(&WHITE.mix(0.8))
                    .draw()?;
            }
        }

        root.present()?;
        info!("Wrote {}", output_file.display());
        Ok(output_file.clone())
    }

    /// Stacked read totals per quality class, one panel per event.
    pub fn quality_chart(&self, rows: &[QualityRow]) -> Result<PathBuf, VisualizationError> {
        let output_file = self.output_dir.join("quality_breakdown.svg");
        let root = SVGBackend::new(&output_file, (1100, 540)).into_drawing_area();
        root.fill(&WHITE)?;

        if rows.is_empty() {
            draw_note(&root, "no occurrence data")?;
            root.present()?;
            return Ok(output_file.clone());
        }

        let root = root.titled("Read quality breakdown", ("sans-serif", 24))?;

        let events: Vec<String> = rows.iter().map(|r| r.event_id.clone()).unique().collect();
        let markers: Vec<String> = rows.iter().map(|r| r.marker.clone()).unique().collect();
        let classes = [ReadClass::Human, ReadClass::Unidentified, ReadClass::Other];
        let class_colors = [
            RGBColor(192, 57, 43),
            RGBColor(127, 140, 141),
            RGBColor(41, 128, 185),
        ];

        let reads_for = |event: &str, marker: &str, class: ReadClass| -> f64 {
            rows.iter()
                .filter(|r| r.event_id == event && r.marker == marker && r.class == class)
                .map(|r| r.reads)
                .sum()
        };

        let mut max_total = 10.0f64;
        for event in &events {
            for marker in &markers {
                let total: f64 = classes.iter().map(|c| reads_for(event, marker, *c)).sum();
                max_total = max_total.max(total);
            }
        }

        let panels = root.split_evenly((1, events.len()));
        for (panel_idx, (panel, event)) in panels.iter().zip(&events).enumerate() {
            let panel = panel.titled(event.as_str(), ("sans-serif", 17))?;
            let mut chart = ChartBuilder::on(&panel)
                .margin(8)
                .x_label_area_size(45)
                .y_label_area_size(70)
                .build_cartesian_2d(
                    -0.5f64..markers.len() as f64 - 0.5,
                    0.0..max_total * 1.15,
                )?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .y_desc("Reads")
                .x_labels(markers.len())
                .x_label_formatter(&|x| {
                    let tick = x.round();
                    if tick < 0.0 {
                        return String::new();
                    }
                    markers.get(tick as usize).cloned().unwrap_or_default()
                })
                .draw()?;

            for (class_idx, class) in classes.iter().enumerate() {
                let color = class_colors[class_idx];
                let series = chart.draw_series(markers.iter().enumerate().filter_map(
                    |(marker_idx, marker)| {
                        let base: f64 = classes[..class_idx]
                            .iter()
                            .map(|c| reads_for(event, marker, *c))
                            .sum();
                        let v = reads_for(event, marker, *class);
                        if v <= 0.0 {
                            return None;
                        }
                        Some(Rectangle::new(
                            [
                                (marker_idx as f64 - 0.35, base),
                                (marker_idx as f64 + 0.35, base + v),
                            ],
                            color.mix(0.9).filled(),
                        ))
                    },
                ))?;
                if panel_idx == 0 {
                    series.label(class.as_str()).legend(move |(x, y)| {
                        Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.mix(0.9).filled())
                    });
                }
            }

            if panel_idx == 0 {
                chart
                    .configure_series_labels()
                    .border_style(&BLACK)
                    .background_style(&WHITE.mix(0.8))
                    .draw()?;
            }
        }

        root.present()?;
        info!("Wrote {}", output_file.display());
        Ok(output_file.clone())
    }

    /// Horizontal bars for the highest-read species, colored by phylum.
    /// Rows are drawn in the order given, first row at the top.
    pub fn top_species_chart(&self, rows: &[SpeciesReads]) -> Result<PathBuf, VisualizationError> {
        let output_file = self.output_dir.join("top_species.svg");
        let height = 170 + 26 * rows.len().max(8) as u32;
        let root = SVGBackend::new(&output_file, (980, height)).into_drawing_area();
        root.fill(&WHITE)?;

        if rows.is_empty() {
            draw_note(&root, "no species-rank occurrences")?;
            root.present()?;
            return Ok(output_file.clone());
        }

        let n = rows.len();
        let max_reads = rows
            .iter()
            .map(|r| r.reads)
            .fold(f64::MIN, f64::max)
            .max(10.0);

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("Top {n} species by reads"), ("sans-serif", 24))
            .margin(10)
            .x_label_area_size(45)
            .y_label_area_size(235)
            .build_cartesian_2d(
                (READS_FLOOR..max_reads * 2.0).log_scale(),
                -0.5f64..n as f64 - 0.5,
            )?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .x_desc("Reads")
            .y_labels(n)
            .y_label_style(("sans-serif", 12))
            .y_label_formatter(&|y| {
                let tick = y.round();
                if tick < 0.0 {
                    return String::new();
                }
                let idx = tick as usize;
                if idx >= n {
                    return String::new();
                }
                rows[n - 1 - idx].scientific_name.clone()
            })
            .draw()?;

        let phyla: Vec<Option<String>> = rows.iter().map(|r| r.phylum.clone()).unique().collect();
        for (phylum_idx, phylum) in phyla.iter().enumerate() {
            let color = index_color(phylum_idx);
            let series = chart.draw_series(rows.iter().enumerate().filter_map(|(row_idx, r)| {
                if &r.phylum != phylum || r.reads < 1.0 {
                    return None;
                }
                let y = (n - 1 - row_idx) as f64;
                Some(Rectangle::new(
                    [(READS_FLOOR, y - 0.35), (r.reads, y + 0.35)],
                    color.mix(0.85).filled(),
                ))
            }))?;
            series
                .label(phylum.as_deref().unwrap_or(UNIDENTIFIED))
                .legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.mix(0.85).filled())
                });
        }

        chart
            .configure_series_labels()
            .border_style(&BLACK)
            .background_style(&WHITE.mix(0.8))
            .draw()?;

        root.present()?;
        info!("Wrote {}", output_file.display());
        Ok(output_file.clone())
    }

    /// Venn-style overlap figure for up to four species sets.
    ///
    /// Region counts are exclusive. With four sets the fixed geometry no
    /// longer matches every region, so counts move to a list beside the
    /// figure and the shapes stay illustrative.
    pub fn overlap_diagram(
        &self,
        sets: &IndexMap<String, BTreeSet<String>>,
        caption: &str,
        file_name: &str,
    ) -> Result<PathBuf, VisualizationError> {
        if sets.len() > 4 {
            return Err(VisualizationError::PlotError(format!(
                "overlap diagram supports at most 4 sets, got {}",
                sets.len()
            )));
        }

        let output_file = self.output_dir.join(file_name);
        let root = SVGBackend::new(&output_file, (960, 720)).into_drawing_area();
        root.fill(&WHITE)?;

        if sets.is_empty() {
            draw_note(&root, "no species sets to compare")?;
            root.present()?;
            return Ok(output_file.clone());
        }

        let root = root.titled(caption, ("sans-serif", 24))?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(0.0..1.3f64, 0.0..1.0f64)?;

        let shapes = set_shapes(sets.len());
        let labels = set_label_anchors(sets.len());
        for (set_idx, ((name, members), shape)) in sets.iter().zip(&shapes).enumerate() {
            let color = index_color(set_idx);
            let outline = ellipse_points(shape);
            chart.draw_series(std::iter::once(Polygon::new(
                outline.clone(),
                color.mix(0.30).filled(),
            )))?;
            chart.draw_series(std::iter::once(PathElement::new(
                outline,
                color.stroke_width(2),
            )))?;

            let (label_x, label_y) = labels[set_idx];
            chart.draw_series(std::iter::once(Text::new(
                format!("{} ({})", name, members.len()),
                (label_x, label_y),
                ("sans-serif", 16)
                    .into_font()
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Center, VPos::Center)),
            )))?;
        }

        let regions = venn_regions(sets);
        if sets.len() <= 3 {
            let anchors = region_anchors(sets.len());
            for (region, (x, y)) in regions.iter().zip(anchors) {
                chart.draw_series(std::iter::once(Text::new(
                    region.count.to_string(),
                    (x, y),
                    ("sans-serif", 18)
                        .into_font()
                        .color(&BLACK)
                        .pos(Pos::new(HPos::Center, VPos::Center)),
                )))?;
            }
        } else {
            for (region_idx, region) in regions.iter().enumerate() {
                chart.draw_series(std::iter::once(Text::new(
                    format!("{}: {}", region.label(), region.count),
                    (1.02, 0.92 - region_idx as f64 * 0.055),
                    ("sans-serif", 12)
                        .into_font()
                        .color(&BLACK)
                        .pos(Pos::new(HPos::Left, VPos::Center)),
                )))?;
            }
        }

        root.present()?;
        info!("Wrote {}", output_file.display());
        Ok(output_file.clone())
    }
}

/// Golden-angle palette, stable for any index.
fn index_color(index: usize) -> HSLColor {
    let hue = (index as f64 * 137.5) % 360.0;
    HSLColor(hue / 360.0, 0.55, 0.45)
}

struct VennShape {
    cx: f64,
    cy: f64,
    rx: f64,
    ry: f64,
    rotation: f64,
}

fn circle(cx: f64, cy: f64, r: f64) -> VennShape {
    VennShape {
        cx,
        cy,
        rx: r,
        ry: r,
        rotation: 0.0,
    }
}

fn ellipse(cx: f64, cy: f64, rx: f64, ry: f64, rotation: f64) -> VennShape {
    VennShape {
        cx,
        cy,
        rx,
        ry,
        rotation,
    }
}

/// Shape layout per set count, in unit chart coordinates.
fn set_shapes(n: usize) -> Vec<VennShape> {
    match n {
        1 => vec![circle(0.50, 0.46, 0.28)],
        2 => vec![circle(0.38, 0.46, 0.26), circle(0.64, 0.46, 0.26)],
        3 => vec![
            circle(0.39, 0.38, 0.24),
            circle(0.63, 0.38, 0.24),
            circle(0.51, 0.60, 0.24),
        ],
        _ => vec![
            ellipse(0.36, 0.44, 0.30, 0.15, 0.9),
            ellipse(0.45, 0.52, 0.30, 0.15, 0.9),
            ellipse(0.57, 0.52, 0.30, 0.15, -0.9),
            ellipse(0.66, 0.44, 0.30, 0.15, -0.9),
        ],
    }
}

fn set_label_anchors(n: usize) -> Vec<(f64, f64)> {
    match n {
        1 => vec![(0.50, 0.80)],
        2 => vec![(0.30, 0.78), (0.72, 0.78)],
        3 => vec![(0.24, 0.16), (0.78, 0.16), (0.51, 0.90)],
        _ => vec![(0.13, 0.14), (0.70, 0.82), (0.32, 0.82), (0.89, 0.14)],
    }
}

/// Anchors for exclusive region counts, in the order `venn_regions`
/// emits them (singletons, then pairs, then larger subsets).
fn region_anchors(n: usize) -> Vec<(f64, f64)> {
    match n {
        1 => vec![(0.50, 0.46)],
        2 => vec![(0.27, 0.46), (0.75, 0.46), (0.51, 0.46)],
        _ => vec![
            (0.30, 0.32),
            (0.72, 0.32),
            (0.51, 0.74),
            (0.51, 0.32),
            (0.41, 0.50),
            (0.61, 0.50),
            (0.51, 0.45),
        ],
    }
}

fn ellipse_points(shape: &VennShape) -> Vec<(f64, f64)> {
    let (sin_rot, cos_rot) = shape.rotation.sin_cos();
    (0..=64)
        .map(|step| {
            let theta = f64::from(step) / 64.0 * std::f64::consts::TAU;
            let (sin_theta, cos_theta) = theta.sin_cos();
            let x = shape.rx * cos_theta;
            let y = shape.ry * sin_theta;
            (
                shape.cx + x * cos_rot - y * sin_rot,
                shape.cy + x * sin_rot + y * cos_rot,
            )
        })
        .collect()
}

fn draw_note(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    note: &str,
) -> Result<(), VisualizationError> {
    let (width, height) = area.dim_in_pixel();
    area.draw(&Text::new(
        note.to_string(),
        (width as i32 / 2, height as i32 / 2),
        ("sans-serif", 20)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center)),
    ))?;
    Ok(())
}
