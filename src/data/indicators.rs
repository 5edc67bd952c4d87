//! Chilean economic indicators provider.
//!
//! Uses the public mindicador.cl API (no key required). Each indicator has
//! its own path; the bare path returns roughly the last month, while
//! `/{indicator}/{year}` returns a full calendar year.
//!
//! API: `https://mindicador.cl/api/{indicator}[/{year}]`
//! Shape: `{ "serie": [ { "fecha": "...", "valor": 4.31 }, ... ] }`

use std::sync::Arc;

use chrono::Datelike;
use tracing::{debug, warn};

use super::normalize;
use super::JsonSource;
use crate::config::SourcesConfig;
use crate::types::{DateRange, FetchResult, TimeSeries};

/// Copper price, USD per pound.
pub const COPPER: &str = "libra_cobre";

/// Observed dollar exchange rate, CLP per USD.
pub const DOLLAR: &str = "dolar";

/// Most calendar years fetched for a single range request.
const MAX_YEARS_PER_RANGE: i32 = 10;

#[derive(Clone)]
pub struct IndicatorClient {
    source: Arc<dyn JsonSource>,
    base_url: String,
}

impl IndicatorClient {
    pub fn new(source: Arc<dyn JsonSource>, cfg: &SourcesConfig) -> Self {
        Self::with_base_url(source, &cfg.indicators_url)
    }

    pub fn with_base_url(source: Arc<dyn JsonSource>, base_url: &str) -> Self {
        Self {
            source,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn fetch(&self, url: String) -> FetchResult<TimeSeries> {
        let raw = self.source.get_json(&url, Vec::new()).await?;
        normalize::indicator(&raw).map_err(|e| e.into_fetch_error(&url))
    }

    /// Recent observations (about the last month).
    pub async fn recent(&self, indicator: &str) -> FetchResult<TimeSeries> {
        let series = self.fetch(format!("{}/{indicator}", self.base_url)).await?;
        debug!(indicator, points = series.len(), "Recent indicator series fetched");
        Ok(series)
    }

    /// Every observation published in `year`.
    pub async fn for_year(&self, indicator: &str, year: i32) -> FetchResult<TimeSeries> {
        let series = self.fetch(format!("{}/{indicator}/{year}", self.base_url)).await?;
        debug!(indicator, year, points = series.len(), "Yearly indicator series fetched");
        Ok(series)
    }

    /// Observations inside `range`, fetched year by year and clipped.
    /// Ranges longer than ten years keep only the most recent ten.
    pub async fn between(&self, indicator: &str, range: DateRange) -> FetchResult<TimeSeries> {
        let last_year = range.end.year();
        let first_year = range.start.year().max(last_year - MAX_YEARS_PER_RANGE + 1);
        if first_year > range.start.year() {
            warn!(indicator, %range, first_year, "Range too long, older years skipped");
        }

        let mut combined = TimeSeries::empty();
        for year in first_year..=last_year {
            let yearly = self.for_year(indicator, year).await?;
            combined = combined.overlay(&yearly);
        }
        Ok(combined.clip(range.start, range.end))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockJsonSource;
    use crate::types::FetchError;
    use chrono::NaiveDate;
    use serde_json::json;

    const BASE: &str = "http://indicators.test/api/";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_recent_uses_indicator_path() {
        let mut mock = MockJsonSource::new();
        mock.expect_get_json()
            .withf(|url, query| url.ends_with("test/api/dolar") && query.is_empty())
            .times(1)
            .returning(|_, _| {
                Ok(json!({ "serie": [
                    { "fecha": "2025-03-05T03:00:00.000Z", "valor": 951.2 },
                    { "fecha": "2025-03-04T03:00:00.000Z", "valor": 948.7 }
                ]}))
            });

        let client = IndicatorClient::with_base_url(Arc::new(mock), BASE);
        let series = client.recent(DOLLAR).await.unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().value, 951.2);
    }

    #[tokio::test]
    async fn test_between_spans_years_and_clips() {
        let mut mock = MockJsonSource::new();
        mock.expect_get_json()
            .withf(|url, _| url.ends_with("/libra_cobre/2024"))
            .times(1)
            .returning(|_, _| {
                Ok(json!({ "serie": [
                    { "fecha": "2024-12-31T03:00:00.000Z", "valor": 4.02 },
                    { "fecha": "2024-12-30T03:00:00.000Z", "valor": 4.00 },
                    { "fecha": "2024-06-01T03:00:00.000Z", "valor": 4.60 }
                ]}))
            });
        mock.expect_get_json()
            .withf(|url, _| url.ends_with("/libra_cobre/2025"))
            .times(1)
            .returning(|_, _| {
                Ok(json!({ "serie": [
                    { "fecha": "2025-01-03T03:00:00.000Z", "valor": 4.10 },
                    { "fecha": "2025-01-02T03:00:00.000Z", "valor": 4.05 }
                ]}))
            });

        let client = IndicatorClient::with_base_url(Arc::new(mock), BASE);
        let range = DateRange::new(d(2024, 12, 30), d(2025, 1, 2));
        let series = client.between(COPPER, range).await.unwrap();
        let dates: Vec<_> = series.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2024, 12, 30), d(2024, 12, 31), d(2025, 1, 2)]);
    }

    #[tokio::test]
    async fn test_between_propagates_error() {
        let mut mock = MockJsonSource::new();
        mock.expect_get_json().returning(|url, _| {
            Err(FetchError::Status {
                endpoint: url.to_string(),
                status: 500,
            })
        });

        let client = IndicatorClient::with_base_url(Arc::new(mock), BASE);
        let range = DateRange::new(d(2025, 1, 1), d(2025, 1, 31));
        let err = client.between(COPPER, range).await.unwrap_err();
        assert_eq!(err.kind(), "transport");
    }
}
