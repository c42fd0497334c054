//! In-memory series source
//!
//! Serves canned series and failures without touching the network. Used for
//! offline runs and for exercising the cache and aggregator.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Barrier;

use super::SeriesFetcher;
use crate::error::FetchError;
use crate::model::{Observation, SeriesKey, SeriesResult};

/// Fetcher backed by a fixed table of outcomes
///
/// Keys without an entry resolve to an empty series.
#[derive(Default)]
pub struct InMemoryFetcher {
    outcomes: HashMap<SeriesKey, Result<SeriesResult, FetchError>>,
    delay: Duration,
    barrier: Option<Arc<Barrier>>,
    calls: AtomicUsize,
}

impl InMemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `observations` for `key`
    pub fn with_series(mut self, key: SeriesKey, observations: Vec<Observation>) -> Self {
        let result = SeriesResult::new(key.clone(), observations);
        self.outcomes.insert(key, Ok(result));
        self
    }

    /// Fail every fetch of `key` with `error`
    pub fn with_failure(mut self, key: SeriesKey, error: FetchError) -> Self {
        self.outcomes.insert(key, Err(error));
        self
    }

    /// Sleep before answering, to keep fetches in flight
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Make every fetch wait at `barrier` before answering
    #[cfg(test)]
    pub(crate) fn with_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.barrier = Some(barrier);
        self
    }

    /// Total fetches served
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

}

#[async_trait]
impl SeriesFetcher for InMemoryFetcher {
    async fn fetch(&self, key: &SeriesKey) -> Result<SeriesResult, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.outcomes
            .get(key)
            .cloned()
            .unwrap_or_else(|| Ok(SeriesResult::empty(key.clone())))
    }
}
