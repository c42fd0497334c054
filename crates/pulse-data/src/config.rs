//! Configuration for macro data acquisition

use crate::catalog;
use crate::error::{PulseError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const WORLD_BANK_BASE_URL: &str = "https://api.worldbank.org/v2";

/// Configuration for the acquisition pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    /// API base URL, without trailing slash
    pub base_url: String,

    /// Rows requested per page
    pub per_page: u32,

    /// Pause between consecutive page requests of one series
    pub page_delay: Duration,

    /// Request timeout duration
    pub request_timeout: Duration,

    /// Maximum number of series fetched concurrently by the aggregator
    pub max_concurrency: usize,

    /// Requests per minute allowed by the client-side rate limiter
    pub rate_limit_per_minute: u32,

    /// Retries for transient transport failures
    pub max_retries: u32,

    /// Initial backoff duration for retries
    pub retry_backoff_base: Duration,
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            base_url: WORLD_BANK_BASE_URL.to_string(),
            per_page: 20_000,
            page_delay: Duration::from_millis(50),
            request_timeout: Duration::from_secs(30),
            max_concurrency: 4,
            rate_limit_per_minute: 120,
            max_retries: 2,
            retry_backoff_base: Duration::from_millis(250),
        }
    }
}

impl PulseConfig {
    /// Create a new configuration builder
    pub fn builder() -> PulseConfigBuilder {
        PulseConfigBuilder::default()
    }

    /// Apply overrides from `MARKETPULSE_*` environment variables
    pub fn with_env(mut self) -> Result<Self> {
        if let Ok(base) = std::env::var("MARKETPULSE_API_BASE") {
            self.base_url = base;
        }
        if let Ok(raw) = std::env::var("MARKETPULSE_MAX_CONCURRENCY") {
            self.max_concurrency = raw.parse().map_err(|_| {
                PulseError::ConfigError(format!("MARKETPULSE_MAX_CONCURRENCY is not a number: {raw}"))
            })?;
        }
        if let Ok(raw) = std::env::var("MARKETPULSE_PAGE_DELAY_MS") {
            let millis: u64 = raw.parse().map_err(|_| {
                PulseError::ConfigError(format!("MARKETPULSE_PAGE_DELAY_MS is not a number: {raw}"))
            })?;
            self.page_delay = Duration::from_millis(millis);
        }
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(PulseError::ConfigError(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }

        if self.per_page == 0 {
            return Err(PulseError::ConfigError(
                "per_page must be greater than 0".to_string(),
            ));
        }

        if self.max_concurrency == 0 {
            return Err(PulseError::ConfigError(
                "max_concurrency must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_per_minute == 0 {
            return Err(PulseError::ConfigError(
                "rate_limit_per_minute must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get retry backoff duration for attempt number
    ///
    /// Doubles per attempt and saturates instead of overflowing.
    pub fn retry_backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.retry_backoff_base.saturating_mul(factor)
    }

    /// Base URL with any trailing slash removed
    pub fn api_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Builder for PulseConfig
#[derive(Debug, Default)]
pub struct PulseConfigBuilder {
    base_url: Option<String>,
    per_page: Option<u32>,
    page_delay: Option<Duration>,
    request_timeout: Option<Duration>,
    max_concurrency: Option<usize>,
    rate_limit_per_minute: Option<u32>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
}

impl PulseConfigBuilder {
    /// Set the API base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set rows requested per page
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    /// Set the pause between page requests
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = Some(delay);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the aggregator's concurrency limit
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Set the client-side rate limit
    pub fn rate_limit_per_minute(mut self, limit: u32) -> Self {
        self.rate_limit_per_minute = Some(limit);
        self
    }

    /// Set maximum retries
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<PulseConfig> {
        let defaults = PulseConfig::default();

        let config = PulseConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            per_page: self.per_page.unwrap_or(defaults.per_page),
            page_delay: self.page_delay.unwrap_or(defaults.page_delay),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            max_concurrency: self.max_concurrency.unwrap_or(defaults.max_concurrency),
            rate_limit_per_minute: self
                .rate_limit_per_minute
                .unwrap_or(defaults.rate_limit_per_minute),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
        };

        config.validate()?;
        Ok(config)
    }
}

/// User-selected pipeline parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// ISO3 country codes
    pub countries: Vec<String>,
    /// Indicator codes
    pub indicators: Vec<String>,
    /// First year kept (inclusive)
    pub min_year: i32,
    /// Last year kept (inclusive)
    pub max_year: i32,
    /// Replace values with per-series z-scores
    pub normalize: bool,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            countries: catalog::DEFAULT_COUNTRIES.iter().map(ToString::to_string).collect(),
            indicators: catalog::DEFAULT_INDICATORS.iter().map(ToString::to_string).collect(),
            min_year: catalog::DEFAULT_YEAR_RANGE.0,
            max_year: catalog::DEFAULT_YEAR_RANGE.1,
            normalize: false,
        }
    }
}

impl PipelineParams {
    pub fn new(
        countries: impl IntoIterator<Item = impl Into<String>>,
        indicators: impl IntoIterator<Item = impl Into<String>>,
        min_year: i32,
        max_year: i32,
    ) -> Self {
        Self {
            countries: countries.into_iter().map(Into::into).collect(),
            indicators: indicators.into_iter().map(Into::into).collect(),
            min_year,
            max_year,
            normalize: false,
        }
    }

    /// Enable or disable z-score normalization
    pub fn normalize(mut self, enabled: bool) -> Self {
        self.normalize = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.countries.is_empty() {
            return Err(PulseError::InvalidParams(
                "at least one country is required".to_string(),
            ));
        }

        if self.indicators.is_empty() {
            return Err(PulseError::InvalidParams(
                "at least one indicator is required".to_string(),
            ));
        }

        if self.min_year > self.max_year {
            return Err(PulseError::InvalidParams(format!(
                "min_year {} is after max_year {}",
                self.min_year, self.max_year
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PulseConfig::default();
        assert_eq!(config.per_page, 20_000);
        assert_eq!(config.page_delay, Duration::from_millis(50));
        assert_eq!(config.max_concurrency, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = PulseConfig::builder()
            .base_url("http://localhost:8080/v2/")
            .max_concurrency(8)
            .request_timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.api_base(), "http://localhost:8080/v2");
    }

    #[test]
    fn test_validation_rejects_zero_limits() {
        assert!(PulseConfig::builder().per_page(0).build().is_err());
        assert!(PulseConfig::builder().max_concurrency(0).build().is_err());
        assert!(PulseConfig::builder().rate_limit_per_minute(0).build().is_err());
    }

    #[test]
    fn test_validation_rejects_non_http_base() {
        let err = PulseConfig::builder().base_url("ftp://example.org").build();
        assert!(matches!(err, Err(PulseError::ConfigError(_))));
    }

    #[test]
    fn test_retry_backoff() {
        let config = PulseConfig::default();
        assert_eq!(config.retry_backoff(0), Duration::from_millis(250));
        assert_eq!(config.retry_backoff(1), Duration::from_millis(500));
        assert_eq!(config.retry_backoff(2), Duration::from_secs(1));
    }

    #[test]
    fn test_retry_backoff_saturates() {
        let config = PulseConfig::default();
        assert_eq!(config.retry_backoff(31), Duration::from_millis(250) * (1 << 31));
        assert_eq!(config.retry_backoff(32), Duration::from_millis(250) * u32::MAX);
        assert_eq!(config.retry_backoff(u32::MAX), Duration::from_millis(250) * u32::MAX);

        let huge = PulseConfig::builder()
            .retry_backoff_base(Duration::MAX)
            .build()
            .unwrap();
        assert_eq!(huge.retry_backoff(3), Duration::MAX);
    }

    #[test]
    fn test_params_validation() {
        assert!(PipelineParams::default().validate().is_ok());

        let params = PipelineParams::new(["USA"], ["NY.GDP.MKTP.KD.ZG"], 2021, 2018);
        assert!(matches!(params.validate(), Err(PulseError::InvalidParams(_))));

        let params = PipelineParams::new(Vec::<String>::new(), ["NY.GDP.MKTP.KD.ZG"], 2000, 2001);
        assert!(params.validate().is_err());

        let params = PipelineParams::new(["USA"], Vec::<String>::new(), 2000, 2001);
        assert!(params.validate().is_err());
    }
}
