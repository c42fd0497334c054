//! Terminal rendering of pipeline results

use comfy_table::{ContentArrangement, Table};
use pulse_data::analytics::{self, Kpi, Trend};
use pulse_data::catalog::{self, IndicatorLabels};
use pulse_data::{CorrelationMatrix, FetchFailure, MergedDataset, WideTable};

/// Marker for a missing or undefined number
pub const MISSING: &str = "—";

/// Format an optional number, rendering `None` as [`MISSING`]
pub fn fmt_cell(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| format!("{v:.decimals$}"))
}

/// Value and signed delta of a headline figure
pub fn kpi_cells(kpi: Option<&Kpi>) -> (String, String) {
    let Some(kpi) = kpi else {
        return (MISSING.to_string(), String::new());
    };

    let value = format!("{:.2} ({})", kpi.latest, kpi.latest_year);
    let delta = match (kpi.trend(), kpi.delta) {
        (Some(Trend::Up), Some(d)) => format!("▲ {:.2}", d.abs()),
        (Some(Trend::Down), Some(d)) => format!("▼ {:.2}", d.abs()),
        _ => String::new(),
    };
    (value, delta)
}

fn table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// One warning line per failed series
pub fn failure_lines(failures: &[FetchFailure]) -> Vec<String> {
    failures.iter().map(|f| format!("warning: {f}")).collect()
}

/// Headline figures of every selected indicator for one country
pub fn kpi_table(
    dataset: &MergedDataset,
    country_code: &str,
    indicators: &[String],
    labels: &IndicatorLabels,
) -> String {
    let country = catalog::country_name(country_code).unwrap_or(country_code);

    let mut table = table();
    table.set_header(vec!["Indicator", "Country", "Latest", "Change", "Units"]);
    for code in indicators {
        let kpi = analytics::kpi(dataset, country_code, code);
        let (value, delta) = kpi_cells(kpi.as_ref());
        let units = catalog::indicator(code).map_or("", |info| info.units);
        table.add_row(vec![
            labels.label(code).to_string(),
            country.to_string(),
            value,
            delta,
            units.to_string(),
        ]);
    }
    table.to_string()
}

/// Correlation matrix rounded to two decimals
pub fn correlation_table(matrix: &CorrelationMatrix) -> String {
    let headers: Vec<String> = matrix.columns.iter().map(|c| c.header()).collect();

    let mut table = table();
    let mut header = vec![String::new()];
    header.extend(headers.iter().cloned());
    table.set_header(header);

    for (i, name) in headers.iter().enumerate() {
        let mut row = vec![name.clone()];
        row.extend((0..matrix.size()).map(|j| fmt_cell(matrix.get(i, j), 2)));
        table.add_row(row);
    }
    table.to_string()
}

/// Years × series table
pub fn wide_table(wide: &WideTable) -> String {
    let mut table = table();
    let mut header = vec!["Year".to_string()];
    header.extend(wide.columns.iter().map(|c| c.header()));
    table.set_header(header);

    for (year, cells) in wide.years.iter().zip(&wide.cells) {
        let mut row = vec![year.to_string()];
        row.extend(cells.iter().map(|v| fmt_cell(*v, 2)));
        table.add_row(row);
    }
    table.to_string()
}

/// Long-format rows, ordered by indicator, country and year
pub fn raw_table(dataset: &MergedDataset, labels: &IndicatorLabels) -> String {
    let mut rows: Vec<_> = dataset.rows.iter().collect();
    rows.sort_by(|a, b| {
        (&a.indicator_code, &a.country_name, a.year).cmp(&(&b.indicator_code, &b.country_name, b.year))
    });

    let mut table = table();
    let mut header = vec!["Country", "Code", "Indicator", "Year", "Value"];
    if dataset.normalized {
        header.push("Normalized");
    }
    table.set_header(header);

    for obs in rows {
        let mut row = vec![
            obs.country_name.clone(),
            obs.country_code.clone(),
            labels.label(&obs.indicator_code).to_string(),
            obs.year.to_string(),
            fmt_cell(obs.value, 2),
        ];
        if dataset.normalized {
            row.push(fmt_cell(obs.normalized_value, 3));
        }
        table.add_row(row);
    }
    table.to_string()
}

/// Built-in countries and indicators
pub fn catalog_table() -> String {
    let mut countries = table();
    countries.set_header(vec!["Country", "Code"]);
    for (name, code) in catalog::COUNTRIES {
        countries.add_row(vec![*name, *code]);
    }

    let mut indicators = table();
    indicators.set_header(vec!["Indicator", "Code", "Units"]);
    for info in catalog::INDICATORS {
        indicators.add_row(vec![info.label, info.code, info.units]);
    }

    format!("{countries}\n\n{indicators}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_data::analytics::{correlate, pivot};
    use pulse_data::Observation;

    #[test]
    fn test_fmt_cell() {
        assert_eq!(fmt_cell(Some(0.123_456), 2), "0.12");
        assert_eq!(fmt_cell(Some(0.0), 2), "0.00");
        assert_eq!(fmt_cell(None, 2), MISSING);
    }

    #[test]
    fn test_kpi_cells() {
        let kpi = Kpi {
            latest_year: 2020,
            latest: -3.4,
            previous: Some(2.3),
            delta: Some(-5.7),
        };
        assert_eq!(kpi_cells(Some(&kpi)), ("-3.40 (2020)".to_string(), "▼ 5.70".to_string()));
        assert_eq!(kpi_cells(None), (MISSING.to_string(), String::new()));
    }

    #[test]
    fn test_correlation_table_marks_undefined() {
        let dataset = MergedDataset::new(
            vec![
                Observation::new("United States", "USA", "A", 2000, Some(1.0)),
                Observation::new("United States", "USA", "A", 2001, Some(2.0)),
                Observation::new("Japan", "JPN", "A", 2001, Some(5.0)),
            ],
            Vec::new(),
        );
        let labels = IndicatorLabels::new().with("A", "Alpha");
        let rendered = correlation_table(&correlate(&pivot(&dataset, &labels)));

        assert!(rendered.contains("United States: Alpha"));
        assert!(rendered.contains("1.00"));
        assert!(rendered.contains(MISSING));
    }
}
