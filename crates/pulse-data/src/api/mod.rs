//! API clients for macro data providers

pub mod memory;
pub mod world_bank;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::model::{SeriesKey, SeriesResult};

pub use memory::InMemoryFetcher;
pub use world_bank::{HttpTransport, PageTransport, WorldBankClient};

/// Retrieves one complete (country, indicator) series
#[async_trait]
pub trait SeriesFetcher: Send + Sync {
    async fn fetch(&self, key: &SeriesKey) -> Result<SeriesResult, FetchError>;
}
