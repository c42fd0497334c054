//! Flat CSV export of a merged dataset

use std::io::Write;

use crate::catalog::IndicatorLabels;
use crate::error::Result;
use crate::model::{MergedDataset, Observation};

const BASE_COLUMNS: [&str; 6] = [
    "country",
    "country_code",
    "indicator_code",
    "indicator_label",
    "year",
    "value",
];

const NORMALIZED_COLUMN: &str = "normalized_value";

/// Header row for a dataset
pub fn csv_header(dataset: &MergedDataset) -> Vec<&'static str> {
    let mut header = BASE_COLUMNS.to_vec();
    if dataset.normalized {
        header.push(NORMALIZED_COLUMN);
    }
    header
}

/// Write `dataset` as CSV, sorted by indicator, country, then year
///
/// Absent values are written as empty fields.
pub fn write_csv<W: Write>(dataset: &MergedDataset, labels: &IndicatorLabels, mut out: W) -> Result<()> {
    writeln!(out, "{}", csv_header(dataset).join(","))?;

    let mut rows: Vec<&Observation> = dataset.rows.iter().collect();
    rows.sort_by(|a, b| {
        a.indicator_code
            .cmp(&b.indicator_code)
            .then_with(|| a.country_name.cmp(&b.country_name))
            .then_with(|| a.year.cmp(&b.year))
    });

    for obs in rows {
        let mut fields = vec![
            csv_escape(&obs.country_name),
            csv_escape(&obs.country_code),
            csv_escape(&obs.indicator_code),
            csv_escape(labels.label(&obs.indicator_code)),
            obs.year.to_string(),
            format_value(obs.value),
        ];
        if dataset.normalized {
            fields.push(format_value(obs.normalized_value));
        }
        writeln!(out, "{}", fields.join(","))?;
    }

    out.flush()?;
    Ok(())
}

/// Render `dataset` as a CSV string
pub fn to_csv_string(dataset: &MergedDataset, labels: &IndicatorLabels) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(dataset, labels, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Escape a value for CSV output.
fn csv_escape(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains('\r') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
