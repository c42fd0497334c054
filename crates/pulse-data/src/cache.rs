//! Session cache for series fetches
//!
//! Every key owns a slot that is filled exactly once. The map of slots is only
//! locked long enough to find or create a slot; the fetch itself is serialized
//! per key by the slot, so distinct keys fetch in parallel while concurrent
//! requests for the same key share one network call.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

use crate::api::SeriesFetcher;
use crate::error::FetchError;
use crate::model::{SeriesKey, SeriesResult};

/// Stored outcome of one fetch: failures are cached as well as successes
pub type CachedOutcome = Result<Arc<SeriesResult>, FetchError>;

type Slot = Arc<OnceCell<CachedOutcome>>;

/// Memoizing, single-flight front for a [`SeriesFetcher`]
pub struct SeriesCache {
    fetcher: Arc<dyn SeriesFetcher>,
    slots: Arc<RwLock<HashMap<SeriesKey, Slot>>>,
}

impl SeriesCache {
    /// Create an empty cache in front of `fetcher`
    pub fn new(fetcher: Arc<dyn SeriesFetcher>) -> Self {
        Self {
            fetcher,
            slots: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get the series for `key`, fetching it on first use
    ///
    /// The fetch runs on its own task and fills the slot itself, so a caller
    /// that is dropped mid-flight still leaves the result in the cache.
    pub async fn get(&self, key: &SeriesKey) -> CachedOutcome {
        let slot = self.slot(key).await;

        if let Some(outcome) = slot.get() {
            debug!("Cache hit for key: {key}");
            return outcome.clone();
        }

        debug!("Cache miss for key: {key}");

        let fetcher = Arc::clone(&self.fetcher);
        let owned_key = key.clone();
        let task = tokio::spawn(async move {
            slot.get_or_init(|| async move { fetcher.fetch(&owned_key).await.map(Arc::new) })
                .await
                .clone()
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(FetchError::network(format!(
                "fetch task for {key} did not complete: {e}"
            ))),
        }
    }

    /// Insert a value into the cache, replacing any stored outcome
    pub async fn insert(&self, result: SeriesResult) {
        let key = result.key.clone();
        let slot = Arc::new(OnceCell::new_with(Some(Ok(Arc::new(result)))));
        self.slots.write().await.insert(key, slot);
    }

    /// Forget the stored outcome for `key`, so the next `get` fetches again
    pub async fn invalidate(&self, key: &SeriesKey) {
        let _ = self.slots.write().await.remove(key);
    }

    /// Clear all cached entries
    pub async fn clear(&self) {
        self.slots.write().await.clear();
    }

    /// Number of keys with a completed outcome
    pub async fn len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| slot.initialized())
            .count()
    }

    /// Check if the cache is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn slot(&self, key: &SeriesKey) -> Slot {
        if let Some(slot) = self.slots.read().await.get(key) {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(key.clone()).or_default())
    }
}

impl Clone for SeriesCache {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            slots: Arc::clone(&self.slots),
        }
    }
}
