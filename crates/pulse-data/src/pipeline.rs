//! End-to-end pipeline: aggregate, filter, normalize, pivot, correlate

use std::sync::Arc;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::analytics::{self, CorrelationMatrix, WideTable};
use crate::api::{SeriesFetcher, WorldBankClient};
use crate::cache::SeriesCache;
use crate::catalog::IndicatorLabels;
use crate::config::{PipelineParams, PulseConfig};
use crate::error::Result;
use crate::model::{FetchFailure, MergedDataset};
use crate::transform;

/// Everything the presentation layer needs for one parameter set
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Year-filtered rows, with z-scores when normalization is on
    pub dataset: MergedDataset,
    /// Years × every (country, indicator) pair
    pub wide: WideTable,
    pub correlation: CorrelationMatrix,
    /// One wide view per selected indicator that has data, in selection order
    pub indicator_views: Vec<(String, WideTable)>,
}

impl PipelineReport {
    pub fn failures(&self) -> &[FetchFailure] {
        &self.dataset.failures
    }
}

/// Result of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Nothing to show; downstream stages were skipped
    NoData { failures: Vec<FetchFailure> },
    Ready(Box<PipelineReport>),
}

impl PipelineOutcome {
    pub fn failures(&self) -> &[FetchFailure] {
        match self {
            Self::NoData { failures } => failures,
            Self::Ready(report) => report.failures(),
        }
    }

    pub fn report(&self) -> Option<&PipelineReport> {
        match self {
            Self::NoData { .. } => None,
            Self::Ready(report) => Some(report),
        }
    }
}

/// Session-scoped pipeline; the series cache lives as long as this value
#[derive(Clone)]
pub struct Pipeline {
    aggregator: Aggregator,
    labels: IndicatorLabels,
}

impl Pipeline {
    /// Pipeline fetching from the World Bank API
    pub fn new(config: &PulseConfig) -> Result<Self> {
        let client = WorldBankClient::new(config)?;
        Ok(Self::with_fetcher(Arc::new(client), config))
    }

    /// Pipeline over any series source
    pub fn with_fetcher(fetcher: Arc<dyn SeriesFetcher>, config: &PulseConfig) -> Self {
        let cache = SeriesCache::new(fetcher);
        Self {
            aggregator: Aggregator::new(cache, config.max_concurrency),
            labels: IndicatorLabels::builtin(),
        }
    }

    /// Replace the indicator labels used for column headers and export
    pub fn with_labels(mut self, labels: IndicatorLabels) -> Self {
        self.labels = labels;
        self
    }

    pub fn labels(&self) -> &IndicatorLabels {
        &self.labels
    }

    pub fn cache(&self) -> &SeriesCache {
        self.aggregator.cache()
    }

    /// Run every stage for `params`
    ///
    /// Only invalid parameters are an error. Fetch failures are carried in
    /// the outcome, and an empty dataset yields [`PipelineOutcome::NoData`].
    pub async fn run(&self, params: &PipelineParams) -> Result<PipelineOutcome> {
        params.validate()?;

        let merged = self
            .aggregator
            .aggregate(&params.countries, &params.indicators)
            .await;
        if merged.is_empty() {
            warn!("No data loaded for the selected countries and indicators");
            return Ok(PipelineOutcome::NoData {
                failures: merged.failures,
            });
        }

        let filtered = transform::filter_years(&merged, params.min_year, params.max_year);
        if filtered.is_empty() {
            warn!(
                "No observations between {} and {}",
                params.min_year, params.max_year
            );
            return Ok(PipelineOutcome::NoData {
                failures: filtered.failures,
            });
        }

        let dataset = transform::normalize(&filtered, params.normalize);
        let wide = analytics::pivot(&dataset, &self.labels);
        let correlation = analytics::correlate(&wide);
        let indicator_views = params
            .indicators
            .iter()
            .map(|code| (code.clone(), analytics::indicator_view(&dataset, code, &self.labels)))
            .filter(|(_, view)| !view.is_empty())
            .collect();

        let (rows, columns) = wide.shape();
        info!(
            "Pipeline ready: {} rows, {rows} years x {columns} series, {} failures",
            dataset.len(),
            dataset.failures.len()
        );

        Ok(PipelineOutcome::Ready(Box::new(PipelineReport {
            dataset,
            wide,
            correlation,
            indicator_views,
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryFetcher;
    use crate::error::{FetchError, PulseError};
    use crate::model::{Observation, SeriesKey};

    fn pipeline(fetcher: InMemoryFetcher) -> Pipeline {
        Pipeline::with_fetcher(Arc::new(fetcher), &PulseConfig::default())
    }

    #[tokio::test]
    async fn test_invalid_params_are_rejected() {
        let params = PipelineParams::new(["USA"], ["A"], 2020, 2010);
        let result = pipeline(InMemoryFetcher::new()).run(&params).await;
        assert!(matches!(result, Err(PulseError::InvalidParams(_))));
    }

    #[tokio::test]
    async fn test_all_failed_is_no_data() {
        let fetcher = InMemoryFetcher::new()
            .with_failure(SeriesKey::new("USA", "A"), FetchError::network("down"));

        let outcome = pipeline(fetcher)
            .run(&PipelineParams::new(["USA"], ["A"], 2000, 2020))
            .await
            .unwrap();

        assert!(outcome.report().is_none());
        assert_eq!(outcome.failures().len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_is_no_data() {
        let fetcher = InMemoryFetcher::new().with_series(
            SeriesKey::new("USA", "A"),
            vec![Observation::new("United States", "USA", "A", 1990, Some(1.0))],
        );

        let outcome = pipeline(fetcher)
            .run(&PipelineParams::new(["USA"], ["A"], 2000, 2020))
            .await
            .unwrap();

        assert!(matches!(outcome, PipelineOutcome::NoData { ref failures } if failures.is_empty()));
    }

    #[tokio::test]
    async fn test_indicator_views_follow_selection() {
        let fetcher = InMemoryFetcher::new()
            .with_series(
                SeriesKey::new("USA", "B"),
                vec![Observation::new("United States", "USA", "B", 2001, Some(1.0))],
            )
            .with_series(
                SeriesKey::new("USA", "A"),
                vec![Observation::new("United States", "USA", "A", 2001, Some(2.0))],
            );

        let outcome = pipeline(fetcher)
            .run(&PipelineParams::new(["USA"], ["B", "A", "C"], 2000, 2020))
            .await
            .unwrap();

        let report = outcome.report().unwrap();
        let codes: Vec<&str> = report.indicator_views.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(codes, vec!["B", "A"]);
    }
}
