//! Wide-format pivots, correlation matrices and headline figures

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::catalog::{self, IndicatorLabels};
use crate::model::{MergedDataset, SeriesKey};

/// One column of a wide table: a (country, indicator) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnKey {
    pub country_code: String,
    pub country_name: String,
    pub indicator_code: String,
    pub indicator_label: String,
}

impl ColumnKey {
    /// Display header, e.g. `United States: GDP growth`
    pub fn header(&self) -> String {
        format!("{}: {}", self.country_name, self.indicator_label)
    }

    pub fn series_key(&self) -> SeriesKey {
        SeriesKey::new(&self.country_code, &self.indicator_code)
    }
}

/// Years × series table; a `None` cell means no observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WideTable {
    /// Row index, ascending
    pub years: Vec<i32>,
    /// Column index, in order of first appearance in the dataset
    pub columns: Vec<ColumnKey>,
    /// `cells[row][column]`
    pub cells: Vec<Vec<Option<f64>>>,
}

impl WideTable {
    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        (self.years.len(), self.columns.len())
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty() || self.columns.is_empty()
    }

    /// Cell for `year` and column index `column`
    pub fn get(&self, year: i32, column: usize) -> Option<f64> {
        let row = self.years.binary_search(&year).ok()?;
        self.cells.get(row)?.get(column).copied().flatten()
    }

    /// Column index of a series
    pub fn column_index(&self, key: &SeriesKey) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.country_code == key.country_code && c.indicator_code == key.indicator_code)
    }

    /// All cells of one column, top to bottom
    pub fn column(&self, column: usize) -> Vec<Option<f64>> {
        self.cells
            .iter()
            .map(|row| row.get(column).copied().flatten())
            .collect()
    }
}

/// Pivot long rows into a year × (country, indicator) table
///
/// Uses the normalized value when the dataset is normalized. Several
/// observations for the same cell are averaged over their present values.
pub fn pivot(dataset: &MergedDataset, labels: &IndicatorLabels) -> WideTable {
    let years: Vec<i32> = dataset
        .rows
        .iter()
        .map(|o| o.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let row_of: HashMap<i32, usize> = years.iter().enumerate().map(|(i, y)| (*y, i)).collect();

    let mut column_of: HashMap<SeriesKey, usize> = HashMap::new();
    let mut columns: Vec<ColumnKey> = Vec::new();
    let mut sums: Vec<Vec<(f64, u32)>> = Vec::new();

    for obs in &dataset.rows {
        let column = *column_of.entry(obs.key()).or_insert_with(|| {
            columns.push(ColumnKey {
                country_code: obs.country_code.clone(),
                country_name: display_country(&obs.country_name, &obs.country_code),
                indicator_code: obs.indicator_code.clone(),
                indicator_label: labels.label(&obs.indicator_code).to_string(),
            });
            columns.len() - 1
        });

        if sums.len() <= column {
            sums.push(vec![(0.0, 0); years.len()]);
        }

        if let (Some(value), Some(&row)) = (dataset.value_of(obs), row_of.get(&obs.year)) {
            let cell = &mut sums[column][row];
            cell.0 += value;
            cell.1 += 1;
        }
    }

    let cells = (0..years.len())
        .map(|row| {
            sums.iter()
                .map(|column| {
                    let (sum, count) = column[row];
                    (count > 0).then(|| sum / f64::from(count))
                })
                .collect()
        })
        .collect();

    WideTable {
        years,
        columns,
        cells,
    }
}

/// Wide view of a single indicator: one column per country
pub fn indicator_view(
    dataset: &MergedDataset,
    indicator_code: &str,
    labels: &IndicatorLabels,
) -> WideTable {
    let subset = MergedDataset {
        rows: dataset
            .rows
            .iter()
            .filter(|o| o.indicator_code == indicator_code)
            .cloned()
            .collect(),
        failures: Vec::new(),
        normalized: dataset.normalized,
    };
    pivot(&subset, labels)
}

fn display_country(name: &str, code: &str) -> String {
    if name.is_empty() {
        catalog::country_name(code).unwrap_or(code).to_string()
    } else {
        name.to_string()
    }
}

/// Pairwise Pearson correlations between the columns of a wide table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<ColumnKey>,
    /// `cells[i][j]`; `None` when the coefficient is undefined
    pub cells: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn size(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.cells.get(i)?.get(j).copied().flatten()
    }
}

/// Correlate every pair of columns over the years where both are present
///
/// A pair with fewer than two joint points, or with no spread in either
/// column over those points, is undefined. The diagonal is exactly 1.0
/// whenever the column correlates with itself at all.
pub fn correlate(table: &WideTable) -> CorrelationMatrix {
    let columns: Vec<Vec<Option<f64>>> = (0..table.columns.len()).map(|c| table.column(c)).collect();
    let n = columns.len();

    let mut cells = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pairwise_pearson(&columns[i], &columns[j]);
            let r = if i == j { r.map(|_| 1.0) } else { r };
            cells[i][j] = r;
            cells[j][i] = r;
        }
    }

    CorrelationMatrix {
        columns: table.columns.clone(),
        cells,
    }
}

/// Pearson coefficient over the positions where both inputs are present
pub fn pairwise_pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip();

    if xs.len() < 2 {
        return None;
    }

    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in xs.iter().zip(&ys) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denominator = var_x.sqrt() * var_y.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        None
    } else {
        Some((cov / denominator).clamp(-1.0, 1.0))
    }
}

/// Direction of the latest change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
}

/// Latest value of a series and its change from the previous value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub latest_year: i32,
    pub latest: f64,
    pub previous: Option<f64>,
    pub delta: Option<f64>,
}

impl Kpi {
    pub fn trend(&self) -> Option<Trend> {
        self.delta
            .map(|d| if d >= 0.0 { Trend::Up } else { Trend::Down })
    }
}

/// Headline figure for one series, from raw (not normalized) values
pub fn kpi(dataset: &MergedDataset, country_code: &str, indicator_code: &str) -> Option<Kpi> {
    let mut points: Vec<(i32, f64)> = dataset
        .rows
        .iter()
        .filter(|o| o.country_code == country_code && o.indicator_code == indicator_code)
        .filter_map(|o| o.value.map(|v| (o.year, v)))
        .collect();
    points.sort_by_key(|(year, _)| *year);

    let (latest_year, latest) = *points.last()?;
    let previous = points.len().checked_sub(2).map(|i| points[i].1);

    Some(Kpi {
        latest_year,
        latest,
        previous,
        delta: previous.map(|p| latest - p),
    })
}
