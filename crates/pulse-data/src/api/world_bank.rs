//! World Bank Open Data API client
//!
//! The v2 API serves every indicator series as paginated JSON:
//! `GET {base}/country/{iso3}/indicator/{code}?format=json&per_page=N&page=P`
//! returns `[metadata, rows]`, where metadata carries `page` and `pages`.
//!
//! API Key: none, the API is public.
//! Rate Limit: undocumented; the client paces itself with a per-minute quota
//! and a short pause between pages.

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::{debug, warn};

use super::SeriesFetcher;
use crate::config::PulseConfig;
use crate::error::{FetchError, PulseError, Result};
use crate::model::{Observation, SeriesKey, SeriesResult};

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Maximum length of an error body echoed into a transport error
const ERROR_BODY_PREVIEW: usize = 200;

/// Source of raw API pages for one series
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageTransport: Send + Sync {
    /// Fetch page `page` (1-based) of the series as raw JSON
    async fn get_page(&self, key: &SeriesKey, page: u32) -> std::result::Result<Value, FetchError>;
}

/// HTTP transport backed by reqwest
pub struct HttpTransport {
    client: Client,
    base_url: String,
    per_page: u32,
    rate_limiter: SharedRateLimiter,
}

impl HttpTransport {
    pub fn new(config: &PulseConfig) -> Result<Self> {
        let per_minute = NonZeroU32::new(config.rate_limit_per_minute).ok_or_else(|| {
            PulseError::ConfigError("rate_limit_per_minute must be greater than 0".to_string())
        })?;
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("marketpulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PulseError::ConfigError(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.api_base().to_string(),
            per_page: config.per_page,
            rate_limiter,
        })
    }

    fn series_url(&self, key: &SeriesKey) -> String {
        format!(
            "{}/country/{}/indicator/{}",
            self.base_url, key.country_code, key.indicator_code
        )
    }
}

#[async_trait]
impl PageTransport for HttpTransport {
    async fn get_page(&self, key: &SeriesKey, page: u32) -> std::result::Result<Value, FetchError> {
        self.rate_limiter.until_ready().await;

        let params = [
            ("format", "json".to_string()),
            ("per_page", self.per_page.to_string()),
            ("page", page.to_string()),
        ];

        let response = self
            .client
            .get(self.series_url(key))
            .query(&params)
            .send()
            .await
            .map_err(|e| FetchError::network(format!("World Bank request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW).collect();
            return Err(FetchError::status(status.as_u16(), preview));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Schema(format!("response is not JSON: {e}")))
    }
}

/// Pagination metadata (first element of the envelope)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageMeta {
    page: u32,
    pages: u32,
}

/// One decoded page
#[derive(Debug, Default)]
struct Page {
    /// `None` when metadata is missing or malformed
    meta: Option<PageMeta>,
    rows: Vec<Value>,
}

/// World Bank series fetcher
///
/// Walks every page of a series, pacing requests and retrying transient
/// transport failures, then parses the accumulated rows.
pub struct WorldBankClient {
    transport: Arc<dyn PageTransport>,
    config: PulseConfig,
}

impl WorldBankClient {
    /// Create a client talking HTTP to `config.base_url`
    pub fn new(config: &PulseConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config)?;
        Ok(Self::with_transport(Arc::new(transport), config))
    }

    /// Create a client over a custom transport
    pub fn with_transport(transport: Arc<dyn PageTransport>, config: &PulseConfig) -> Self {
        Self {
            transport,
            config: config.clone(),
        }
    }

    /// Fetch every page of one series
    pub async fn fetch_series(&self, key: &SeriesKey) -> std::result::Result<SeriesResult, FetchError> {
        let mut raw_rows: Vec<Value> = Vec::new();
        let mut page: u32 = 1;

        loop {
            let payload = self.get_page_with_retry(key, page).await?;
            let decoded = decode_page(&payload, key)?;

            if decoded.rows.is_empty() {
                debug!("{key}: page {page} is empty, stopping");
                break;
            }
            raw_rows.extend(decoded.rows);

            let Some(meta) = decoded.meta else {
                warn!("{key}: missing or malformed pagination metadata on page {page}, stopping");
                break;
            };

            // A server that never advances `page` still stops at `pages`
            let current = meta.page.max(page);
            if current >= meta.pages {
                break;
            }

            debug!("{key}: fetched page {current}/{}", meta.pages);
            page = current + 1;
            tokio::time::sleep(self.config.page_delay).await;
        }

        let total = raw_rows.len();
        let observations: Vec<Observation> = raw_rows
            .iter()
            .filter_map(|row| parse_row(row, key))
            .collect();

        if observations.len() < total {
            debug!(
                "{key}: dropped {} of {total} rows with unparseable year",
                total - observations.len()
            );
        }

        Ok(SeriesResult::new(key.clone(), observations))
    }

    async fn get_page_with_retry(
        &self,
        key: &SeriesKey,
        page: u32,
    ) -> std::result::Result<Value, FetchError> {
        let mut attempt = 0;
        loop {
            match self.transport.get_page(key, page).await {
                Ok(payload) => return Ok(payload),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let backoff = self.config.retry_backoff(attempt);
                    warn!(
                        "{key}: page {page} failed ({e}), retrying in {backoff:?} (attempt {}/{})",
                        attempt + 1,
                        self.config.max_retries
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl SeriesFetcher for WorldBankClient {
    async fn fetch(&self, key: &SeriesKey) -> std::result::Result<SeriesResult, FetchError> {
        self.fetch_series(key).await
    }
}

/// Split a payload into metadata and rows
///
/// A non-array payload is a schema error. An array shorter than two elements,
/// or with a null row list, is the API's way of saying "nothing here" and
/// yields an empty page.
fn decode_page(payload: &Value, key: &SeriesKey) -> std::result::Result<Page, FetchError> {
    let Some(envelope) = payload.as_array() else {
        return Err(FetchError::Schema(format!(
            "expected a JSON array envelope, got {}",
            json_kind(payload)
        )));
    };

    if envelope.len() < 2 {
        if let Some(message) = envelope.first().and_then(api_error_message) {
            warn!("{key}: World Bank API returned an error envelope: {message}");
        }
        return Ok(Page::default());
    }

    let rows = match &envelope[1] {
        Value::Null => Vec::new(),
        Value::Array(rows) => rows.clone(),
        other => {
            return Err(FetchError::Schema(format!(
                "expected a row array, got {}",
                json_kind(other)
            )));
        }
    };

    Ok(Page {
        meta: parse_meta(&envelope[0]),
        rows,
    })
}

fn parse_meta(meta: &Value) -> Option<PageMeta> {
    let page = as_u32(meta.get("page")?)?;
    let pages = as_u32(meta.get("pages")?)?;
    Some(PageMeta { page, pages })
}

/// Integer field that may arrive as a number or a numeric string
fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Text of a `[{"message": [{"value": ...}]}]` error envelope
fn api_error_message(entry: &Value) -> Option<String> {
    let messages = entry.get("message")?.as_array()?;
    let text: Vec<&str> = messages
        .iter()
        .filter_map(|m| m.get("value").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then(|| text.join("; "))
}

/// Parse one API row; rows without a well-formed integer year are dropped
fn parse_row(row: &Value, key: &SeriesKey) -> Option<Observation> {
    let year = parse_year(row.get("date")?)?;

    let country_name = row
        .pointer("/country/value")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let country_code = row
        .get("countryiso3code")
        .and_then(Value::as_str)
        .filter(|code| !code.is_empty())
        .unwrap_or(key.country_code.as_str());
    let indicator_code = row
        .pointer("/indicator/id")
        .and_then(Value::as_str)
        .filter(|code| !code.is_empty())
        .unwrap_or(key.indicator_code.as_str());

    Some(Observation::new(
        country_name,
        country_code,
        indicator_code,
        year,
        parse_value(row.get("value")),
    ))
}

fn parse_year(date: &Value) -> Option<i32> {
    let text = date.as_str()?;
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Numeric value, coercing numeric strings; anything else is absent
fn parse_value(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
