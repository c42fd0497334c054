//! Year filtering and per-series z-score normalization

use std::collections::HashMap;

use crate::model::{MergedDataset, SeriesKey};

/// Keep observations with `min_year <= year <= max_year`
pub fn filter_years(dataset: &MergedDataset, min_year: i32, max_year: i32) -> MergedDataset {
    MergedDataset {
        rows: dataset
            .rows
            .iter()
            .filter(|o| (min_year..=max_year).contains(&o.year))
            .cloned()
            .collect(),
        failures: dataset.failures.clone(),
        normalized: dataset.normalized,
    }
}

/// Mean and divisor of one series' present values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesMoments {
    pub mean: f64,
    /// Sample standard deviation, or 1.0 when it is zero or undefined
    pub scale: f64,
}

impl SeriesMoments {
    /// Moments of `values`; `None` when no value is present
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let scale = sample_std_dev(values, mean)
            .filter(|sd| *sd > 0.0 && sd.is_finite())
            .unwrap_or(1.0);

        Some(Self { mean, scale })
    }

    pub fn z_score(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// Sample (n - 1) standard deviation; undefined below two values
fn sample_std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Attach per-series z-scores when `enabled`
///
/// Absent values stay absent and are excluded from the moments. A series with
/// zero or undefined spread is only centered (divisor 1).
pub fn normalize(dataset: &MergedDataset, enabled: bool) -> MergedDataset {
    if !enabled {
        return dataset.clone();
    }

    let mut present: HashMap<SeriesKey, Vec<f64>> = HashMap::new();
    for obs in &dataset.rows {
        if let Some(value) = obs.value {
            present.entry(obs.key()).or_default().push(value);
        }
    }

    let moments: HashMap<SeriesKey, SeriesMoments> = present
        .into_iter()
        .filter_map(|(key, values)| SeriesMoments::of(&values).map(|m| (key, m)))
        .collect();

    let rows = dataset
        .rows
        .iter()
        .map(|obs| {
            let mut obs = obs.clone();
            obs.normalized_value = match (obs.value, moments.get(&obs.key())) {
                (Some(value), Some(m)) => Some(m.z_score(value)),
                _ => None,
            };
            obs
        })
        .collect();

    MergedDataset {
        rows,
        failures: dataset.failures.clone(),
        normalized: true,
    }
}
