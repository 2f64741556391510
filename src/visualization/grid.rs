//! Interactive HTML table for the species by marker pivot.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use log::info;
use serde_json::json;

use crate::aggregate::MarkerPivot;

use super::{VisualizationError, Visualizer};

/// Standalone report page. `{{key}}` placeholders are substituted before
/// writing; everything else ships verbatim. No external assets, so the
/// file can be mailed around or opened from disk.
const GRID_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{{title}}</title>
<style>
  body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 1.5rem; color: #1c2733; }
  h1 { font-size: 1.3rem; }
  p.meta { color: #5a6b7b; font-size: 0.85rem; }
  table { border-collapse: collapse; font-size: 0.85rem; }
  th, td { border: 1px solid #d4dbe3; padding: 0.3rem 0.55rem; text-align: left; }
  th { background: #eef2f6; cursor: pointer; user-select: none; white-space: nowrap; }
  th.sorted-asc::after { content: " \2191"; }
  th.sorted-desc::after { content: " \2193"; }
  td.num { text-align: right; font-variant-numeric: tabular-nums; }
  td.null { color: #9aa7b4; text-align: center; }
  tr:hover td { background: #f6f9fc; }
</style>
</head>
<body>
<h1>{{title}}</h1>
<p class="meta">{{species_count}} species across {{marker_count}} markers.
Click a header to sort. An empty cell means the species was not detected
by that marker, which is not the same as a detection with zero reads.</p>
<table id="grid">
  <thead><tr id="header-row"></tr></thead>
  <tbody id="body-rows"></tbody>
</table>
<script>
const columns = {{columns}};
const rows = {{rows}};
const numericFrom = 2;
let sortColumn = null;
let sortAscending = false;

const maxima = columns.map(function (_, c) {
  if (c < numericFrom) return 0;
  let max = 0;
  for (const row of rows) {
    if (row[c] !== null && row[c] > max) max = row[c];
  }
  return max;
});

function orderRows() {
  const ordered = rows.slice();
  if (sortColumn === null) return ordered;
  ordered.sort(function (a, b) {
    const x = a[sortColumn];
    const y = b[sortColumn];
    if (x === null && y === null) return 0;
    if (x === null) return 1;
    if (y === null) return -1;
    let cmp;
    if (sortColumn < numericFrom) {
      cmp = String(x).localeCompare(String(y));
    } else {
      cmp = x - y;
    }
    return sortAscending ? cmp : -cmp;
  });
  return ordered;
}

function render() {
  const head = document.getElementById("header-row");
  head.innerHTML = "";
  columns.forEach(function (name, c) {
    const th = document.createElement("th");
    th.textContent = name;
    if (c === sortColumn) th.className = sortAscending ? "sorted-asc" : "sorted-desc";
    th.addEventListener("click", function () {
      if (sortColumn === c) {
        sortAscending = !sortAscending;
      } else {
        sortColumn = c;
        sortAscending = c < numericFrom;
      }
      render();
    });
    head.appendChild(th);
  });

  const body = document.getElementById("body-rows");
  body.innerHTML = "";
  for (const row of orderRows()) {
    const tr = document.createElement("tr");
    row.forEach(function (value, c) {
      const td = document.createElement("td");
      if (c < numericFrom) {
        if (c === 1 && value === null) {
          td.textContent = "unidentified";
          td.className = "null";
        } else {
          td.textContent = value === null ? "" : value;
        }
      } else if (value === null) {
        td.textContent = "—";
        td.className = "null";
      } else {
        td.textContent = value;
        td.className = "num";
        if (maxima[c] > 0 && value > 0) {
          const strength = Math.log10(value + 1) / Math.log10(maxima[c] + 1);
          td.style.background = "rgba(31, 119, 180, " + (0.08 + 0.5 * strength).toFixed(3) + ")";
        }
      }
      tr.appendChild(td);
    });
    body.appendChild(tr);
  }
}

render();
</script>
</body>
</html>
"#;

impl Visualizer {
    /// Writes the sortable species table to `species_table.html`.
    ///
    /// Pivot cells stay `null` in the embedded row payload where a
    /// species has no occurrence for a marker; the page renders those as
    /// dashes so absence never collapses into a zero-read detection.
    pub fn species_grid(
        &self,
        pivot: &MarkerPivot,
        title: &str,
    ) -> Result<PathBuf, VisualizationError> {
        let output_file = self.output_dir().join("species_table.html");

        let mut columns: Vec<String> = vec!["scientificName".to_string(), "phylum".to_string()];
        columns.extend(pivot.marker_names.iter().cloned());
        columns.push("single".to_string());
        columns.push("multi".to_string());

        let (n_species, n_markers) = pivot.dimensions();
        let mut rows = Vec::with_capacity(n_species);
        for row_idx in 0..n_species {
            let mut row = vec![
                json!(pivot.species_names[row_idx]),
                json!(pivot.phyla[row_idx]),
            ];
            for marker_idx in 0..n_markers {
                row.push(json!(pivot.reads[[row_idx, marker_idx]]));
            }
            row.push(json!(pivot.single_total[row_idx]));
            row.push(json!(pivot.multi_total[row_idx]));
            rows.push(serde_json::Value::Array(row));
        }

        let columns_json = serde_json::to_string(&columns)
            .map_err(|e| VisualizationError::TemplateError(e.to_string()))?;
        let rows_json = serde_json::to_string(&rows)
            .map_err(|e| VisualizationError::TemplateError(e.to_string()))?;

        let mut replacements: HashMap<&str, String> = HashMap::new();
        replacements.insert("title", title.to_string());
        replacements.insert("columns", columns_json);
        replacements.insert("rows", rows_json);
        replacements.insert("species_count", n_species.to_string());
        replacements.insert("marker_count", n_markers.to_string());

        let mut html = GRID_TEMPLATE.to_string();
        for (key, value) in &replacements {
            html = html.replace(&format!("{{{{{}}}}}", key), value);
        }

        let mut file = File::create(&output_file)?;
        file.write_all(html.as_bytes())?;

        info!("Wrote {}", output_file.display());
        Ok(output_file)
    }
}
