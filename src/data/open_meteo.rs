//! Open-Meteo client.
//!
//! Two endpoints of the same family (no key required):
//! - archive `https://archive-api.open-meteo.com/v1/archive`: daily history,
//!   never includes the current day.
//! - forecast `https://api.open-meteo.com/v1/forecast`: daily or hourly
//!   forecast, optionally with up to 92 `past_days` of recent history.
//!
//! Both answer with parallel `time`/value arrays under `daily` or `hourly`.

use std::sync::Arc;

use tracing::debug;

use super::normalize;
use super::{param, JsonSource, QueryParams};
use crate::config::{SourcesConfig, PROVIDER_MAX_LOOKBACK_DAYS};
use crate::types::{DateRange, FetchResult, HourlyObservation, Location, TimeSeries};

/// Longest hourly forecast the dashboard requests.
pub const MAX_HOURLY_FORECAST_DAYS: u32 = 7;

/// A daily variable plus an optional reference variable requested with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyMetric {
    pub value_field: &'static str,
    pub reference_field: Option<&'static str>,
}

impl DailyMetric {
    /// Daily UV index maximum with its clear-sky counterpart.
    pub const UV_INDEX_MAX: DailyMetric = DailyMetric {
        value_field: "uv_index_max",
        reference_field: Some("uv_index_clear_sky_max"),
    };

    /// Value for the `daily=` query parameter.
    pub fn daily_param(&self) -> String {
        match self.reference_field {
            Some(reference) => format!("{},{}", self.value_field, reference),
            None => self.value_field.to_string(),
        }
    }
}

/// Typed access to the archive and forecast endpoints.
#[derive(Clone)]
pub struct OpenMeteoClient {
    source: Arc<dyn JsonSource>,
    archive_url: String,
    forecast_url: String,
}

impl OpenMeteoClient {
    pub fn new(source: Arc<dyn JsonSource>, cfg: &SourcesConfig) -> Self {
        Self::with_urls(source, &cfg.archive_url, &cfg.forecast_url)
    }

    pub fn with_urls(source: Arc<dyn JsonSource>, archive_url: &str, forecast_url: &str) -> Self {
        Self {
            source,
            archive_url: archive_url.to_string(),
            forecast_url: forecast_url.to_string(),
        }
    }

    fn location_params(location: &Location) -> QueryParams {
        vec![
            param("latitude", location.latitude),
            param("longitude", location.longitude),
        ]
    }

    /// Daily history for `range` from the archive endpoint.
    pub async fn archive_daily(
        &self,
        location: &Location,
        range: DateRange,
        metric: &DailyMetric,
    ) -> FetchResult<TimeSeries> {
        let mut query = Self::location_params(location);
        query.extend([
            param("start_date", range.start.format("%Y-%m-%d")),
            param("end_date", range.end.format("%Y-%m-%d")),
            param("daily", metric.daily_param()),
            param("timezone", "auto"),
        ]);

        let raw = self.source.get_json(&self.archive_url, query).await?;
        let series = normalize::daily(&raw, "daily", metric.value_field, metric.reference_field)
            .map_err(|e| e.into_fetch_error(&self.archive_url))?;

        debug!(city = %location.name, %range, points = series.len(), "Archive series fetched");
        Ok(series)
    }

    /// Daily series from the forecast endpoint covering `past_days` trailing
    /// days plus today. `past_days` is held to `1..=92`.
    pub async fn forecast_daily(
        &self,
        location: &Location,
        past_days: u32,
        metric: &DailyMetric,
    ) -> FetchResult<TimeSeries> {
        let past_days = past_days.clamp(1, PROVIDER_MAX_LOOKBACK_DAYS);
        let mut query = Self::location_params(location);
        query.extend([
            param("daily", metric.daily_param()),
            param("timezone", "auto"),
            param("past_days", past_days),
            param("forecast_days", 1),
        ]);

        let raw = self.source.get_json(&self.forecast_url, query).await?;
        let series = normalize::daily(&raw, "daily", metric.value_field, metric.reference_field)
            .map_err(|e| e.into_fetch_error(&self.forecast_url))?;

        debug!(city = %location.name, past_days, points = series.len(), "Forecast series fetched");
        Ok(series)
    }

    /// Hourly UV forecast for the next `days` days (held to `1..=7`).
    pub async fn forecast_hourly(
        &self,
        location: &Location,
        days: u32,
    ) -> FetchResult<Vec<HourlyObservation>> {
        let days = days.clamp(1, MAX_HOURLY_FORECAST_DAYS);
        let mut query = Self::location_params(location);
        query.extend([
            param("hourly", "uv_index,uv_index_clear_sky"),
            param("timezone", "auto"),
            param("forecast_days", days),
        ]);

        let raw = self.source.get_json(&self.forecast_url, query).await?;
        let hours = normalize::hourly(&raw, "uv_index", Some("uv_index_clear_sky"))
            .map_err(|e| e.into_fetch_error(&self.forecast_url))?;

        debug!(city = %location.name, days, hours = hours.len(), "Hourly forecast fetched");
        Ok(hours)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
