//! Macro time-series pipeline
//!
//! This crate acquires annual macroeconomic series for several countries and
//! indicators from the World Bank Open Data API and turns them into
//! comparative analytics. It includes:
//!
//! - A paginated series fetcher with rate limiting and transient-error retries
//! - A session cache with single-flight semantics per (country, indicator)
//! - A batch aggregator that tolerates partial failures
//! - Year filtering and per-series z-score normalization
//! - Wide pivots, pairwise-complete correlation matrices and headline figures
//! - Flat CSV export
//!
//! # Architecture
//!
//! Data flows strictly forward:
//! `WorldBankClient` → `SeriesCache` → `Aggregator` → `transform` →
//! `analytics` → presentation. [`Pipeline`] wires the stages together.
//!
//! # Example
//!
//! ```rust,ignore
//! use pulse_data::{Pipeline, PipelineOutcome, PipelineParams, PulseConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PulseConfig::default().with_env()?;
//!     let pipeline = Pipeline::new(&config)?;
//!
//!     let params = PipelineParams::new(["USA", "GBR"], ["NY.GDP.MKTP.KD.ZG"], 2000, 2024)
//!         .normalize(true);
//!
//!     match pipeline.run(&params).await? {
//!         PipelineOutcome::Ready(report) => println!("{:?}", report.correlation),
//!         PipelineOutcome::NoData { failures } => eprintln!("no data: {failures:?}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod aggregator;
pub mod analytics;
pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod pipeline;
pub mod transform;

// Re-export main types for convenience
pub use aggregator::Aggregator;
pub use analytics::{ColumnKey, CorrelationMatrix, Kpi, Trend, WideTable};
pub use api::{InMemoryFetcher, SeriesFetcher, WorldBankClient};
pub use cache::SeriesCache;
pub use catalog::IndicatorLabels;
pub use config::{PipelineParams, PulseConfig};
pub use error::{FetchError, PulseError, Result};
pub use model::{FetchFailure, MergedDataset, Observation, SeriesKey, SeriesResult};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineReport};
