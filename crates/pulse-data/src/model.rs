//! Core data types shared by every pipeline stage

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FetchError;

/// Identity of one (country, indicator) series
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    /// ISO3 country or aggregate code (e.g. `USA`, `EMU`)
    pub country_code: String,
    /// Indicator code (e.g. `NY.GDP.MKTP.KD.ZG`)
    pub indicator_code: String,
}

impl SeriesKey {
    pub fn new(country_code: impl Into<String>, indicator_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            indicator_code: indicator_code.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.country_code, self.indicator_code)
    }
}

/// One yearly data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub country_name: String,
    pub country_code: String,
    pub indicator_code: String,
    pub year: i32,
    /// `None` when the source published no value for the year
    pub value: Option<f64>,
    /// Z-score of `value` within its series, set by normalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_value: Option<f64>,
}

impl Observation {
    pub fn new(
        country_name: impl Into<String>,
        country_code: impl Into<String>,
        indicator_code: impl Into<String>,
        year: i32,
        value: Option<f64>,
    ) -> Self {
        Self {
            country_name: country_name.into(),
            country_code: country_code.into(),
            indicator_code: indicator_code.into(),
            year,
            value,
            normalized_value: None,
        }
    }

    /// Key of the series this observation belongs to
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(&self.country_code, &self.indicator_code)
    }
}

/// All observations of one series, ascending by year
///
/// An empty result is valid and means the source published nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesResult {
    pub key: SeriesKey,
    pub observations: Vec<Observation>,
}

impl SeriesResult {
    /// Build a result, sorting observations by year (stable)
    pub fn new(key: SeriesKey, mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.year);
        Self { key, observations }
    }

    pub fn empty(key: SeriesKey) -> Self {
        Self {
            key,
            observations: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// A series request that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub key: SeriesKey,
    pub reason: String,
}

impl FetchFailure {
    pub fn new(key: SeriesKey, error: &FetchError) -> Self {
        Self {
            key,
            reason: error.to_string(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to load {} for {}: {}",
            self.key.indicator_code, self.key.country_code, self.reason
        )
    }
}

/// Rows from every successful series of a batch plus the failed requests
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedDataset {
    pub rows: Vec<Observation>,
    pub failures: Vec<FetchFailure>,
    /// Whether `normalized_value` has been populated on the rows
    #[serde(default)]
    pub normalized: bool,
}

impl MergedDataset {
    pub fn new(rows: Vec<Observation>, failures: Vec<FetchFailure>) -> Self {
        Self {
            rows,
            failures,
            normalized: false,
        }
    }

    /// Zero rows: the "no data" condition, regardless of failures
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Value used by downstream views: the z-score when normalized
    pub fn value_of(&self, observation: &Observation) -> Option<f64> {
        if self.normalized {
            observation.normalized_value
        } else {
            observation.value
        }
    }
}
