//! Multi-series aggregation
//!
//! Fetches the cartesian product of countries × indicators through the series
//! cache with bounded parallelism and merges what succeeded. A failed pair is
//! recorded and the batch moves on.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::cache::SeriesCache;
use crate::model::{FetchFailure, MergedDataset, SeriesKey};

/// Every (country, indicator) pair, duplicates removed, in selection order
pub fn series_keys<C, I>(countries: &[C], indicators: &[I]) -> Vec<SeriesKey>
where
    C: AsRef<str>,
    I: AsRef<str>,
{
    let mut seen = HashSet::new();
    countries
        .iter()
        .flat_map(|country| {
            indicators
                .iter()
                .map(move |indicator| SeriesKey::new(country.as_ref(), indicator.as_ref()))
        })
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Batch front of the series cache
#[derive(Clone)]
pub struct Aggregator {
    cache: SeriesCache,
    max_concurrency: usize,
}

impl Aggregator {
    /// `max_concurrency` is clamped to at least one in-flight fetch
    pub fn new(cache: SeriesCache, max_concurrency: usize) -> Self {
        Self {
            cache,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    /// Fetch and merge every selected series
    ///
    /// Never fails: an all-failed batch is an empty dataset whose failure
    /// list says why. Rows keep series order, and year order within a series.
    pub async fn aggregate<C, I>(&self, countries: &[C], indicators: &[I]) -> MergedDataset
    where
        C: AsRef<str>,
        I: AsRef<str>,
    {
        let keys = series_keys(countries, indicators);
        let requested = keys.len();

        let outcomes: Vec<_> = stream::iter(keys)
            .map(|key| async move {
                let outcome = self.cache.get(&key).await;
                (key, outcome)
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut dataset = MergedDataset::default();
        for (key, outcome) in outcomes {
            match outcome {
                Ok(series) => dataset.rows.extend(series.observations.iter().cloned()),
                Err(e) => {
                    let failure = FetchFailure::new(key, &e);
                    warn!("{failure}");
                    dataset.failures.push(failure);
                }
            }
        }

        info!(
            "Aggregated {} rows from {}/{} series",
            dataset.len(),
            requested - dataset.failures.len(),
            requested
        );

        dataset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryFetcher;
    use crate::error::FetchError;
    use crate::model::Observation;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn obs(country: &str, indicator: &str, year: i32, value: f64) -> Observation {
        Observation::new(country, country, indicator, year, Some(value))
    }

    fn build(fetcher: InMemoryFetcher, max_concurrency: usize) -> (Aggregator, Arc<InMemoryFetcher>) {
        let fetcher = Arc::new(fetcher);
        let cache = SeriesCache::new(fetcher.clone());
        (Aggregator::new(cache, max_concurrency), fetcher)
    }

    #[test]
    fn test_series_keys_cartesian_product() {
        let keys = series_keys(&["USA", "GBR", "USA"], &["A", "B"]);
        assert_eq!(
            keys,
            vec![
                SeriesKey::new("USA", "A"),
                SeriesKey::new("USA", "B"),
                SeriesKey::new("GBR", "A"),
                SeriesKey::new("GBR", "B"),
            ]
        );
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_successful_rows() {
        let fetcher = InMemoryFetcher::new()
            .with_failure(SeriesKey::new("USA", "A"), FetchError::status(500, "boom"))
            .with_series(
                SeriesKey::new("USA", "B"),
                vec![obs("USA", "B", 2000, 1.0), obs("USA", "B", 2001, 2.0)],
            );
        let (aggregator, _) = build(fetcher, 4);

        let dataset = aggregator.aggregate(&["USA"], &["A", "B"]).await;

        assert_eq!(dataset.len(), 2);
        assert!(dataset.rows.iter().all(|o| o.indicator_code == "B"));
        assert_eq!(dataset.failures.len(), 1);
        assert_eq!(dataset.failures[0].key, SeriesKey::new("USA", "A"));
        assert!(dataset.failures[0].reason.contains("500"));
    }

    #[tokio::test]
    async fn test_all_failed_is_empty_not_error() {
        let fetcher = InMemoryFetcher::new()
            .with_failure(SeriesKey::new("USA", "A"), FetchError::network("down"))
            .with_failure(SeriesKey::new("GBR", "A"), FetchError::Schema("garbage".to_string()));
        let (aggregator, _) = build(fetcher, 2);

        let dataset = aggregator.aggregate(&["USA", "GBR"], &["A"]).await;

        assert!(dataset.is_empty());
        assert_eq!(dataset.failures.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_series_is_not_a_failure() {
        let (aggregator, fetcher) = build(InMemoryFetcher::new(), 2);

        let dataset = aggregator.aggregate(&["USA"], &["A"]).await;

        assert!(dataset.is_empty());
        assert!(!dataset.has_failures());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_repeat_batch_hits_cache() {
        let fetcher = InMemoryFetcher::new()
            .with_series(SeriesKey::new("USA", "A"), vec![obs("USA", "A", 2000, 1.0)]);
        let (aggregator, fetcher) = build(fetcher, 2);

        let first = aggregator.aggregate(&["USA"], &["A"]).await;
        let second = aggregator.aggregate(&["USA"], &["A"]).await;

        assert_eq!(first, second);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_fetches_run_concurrently() {
        let barrier = Arc::new(Barrier::new(2));
        let (aggregator, _) = build(InMemoryFetcher::new().with_barrier(barrier), 2);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            aggregator.aggregate(&["USA", "GBR", "JPN", "DEU"], &["A"]),
        )
        .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        // With one fetch in flight at a time nobody can pass a two-party barrier.
        let barrier = Arc::new(Barrier::new(2));
        let (aggregator, fetcher) = build(InMemoryFetcher::new().with_barrier(barrier), 1);

        let result = tokio::time::timeout(
            Duration::from_millis(200),
            aggregator.aggregate(&["USA", "GBR"], &["A"]),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(fetcher.calls(), 1);
    }
}
