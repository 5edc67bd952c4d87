//! Dashboard API route handlers.
//!
//! All endpoints return JSON except the CSV export. State is shared via
//! `Arc<DashboardState>`.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::analysis::{self, currency, uvi::UviCategory, Kpis, MonthlySummary};
use crate::config::AppConfig;
use crate::data::cities::{find_city, City, CITIES, DEFAULT_CITY};
use crate::data::indicators::{IndicatorClient, COPPER, DOLLAR};
use crate::data::open_meteo::{DailyMetric, OpenMeteoClient, MAX_HOURLY_FORECAST_DAYS};
use crate::data::JsonSource;
use crate::engine::cache::CachedReconciler;
use crate::engine::reconciler::HistoryReconciler;
use crate::export;
use crate::types::{days_before, DailyObservation, DateRange, ReconciliationOutcome, TimeSeries};

/// Days shown by the hourly forecast panel when the caller does not ask.
pub const DEFAULT_FORECAST_DAYS: u32 = 5;

/// Trailing window of the copper panel when no range is given.
pub const DEFAULT_COPPER_DAYS: u32 = 30;

/// Rows in the "top days" table.
pub const TOP_DAYS: usize = 5;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub history: CachedReconciler,
    pub meteo: OpenMeteoClient,
    pub indicators: IndicatorClient,
    /// Length of the history window when no start is given.
    pub default_days: u32,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl DashboardState {
    pub fn new(source: Arc<dyn JsonSource>, cfg: &AppConfig) -> Self {
        let meteo = OpenMeteoClient::new(source.clone(), &cfg.sources);
        let reconciler = HistoryReconciler::new(meteo.clone(), DailyMetric::UV_INDEX_MAX)
            .with_max_lookback(cfg.history.lookback_ceiling());
        let history = if cfg.cache.enabled {
            CachedReconciler::new(reconciler, Duration::minutes(cfg.cache.ttl_mins))
        } else {
            CachedReconciler::uncached(reconciler)
        };

        Self {
            history,
            meteo,
            indicators: IndicatorClient::new(source, &cfg.sources),
            default_days: cfg.history.default_days,
            today: local_today,
        }
    }

    /// Pin the clock, for tests and reproducible exports.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Handler failure rendered as a status code plus `ErrorBody`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn unknown_city(name: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: format!("Unknown city: {name}"),
        }
    }

    fn internal(message: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }

    fn upstream(message: impl ToString) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

fn resolve_city(name: Option<&str>) -> Result<&'static City, ApiError> {
    let name = name.unwrap_or(DEFAULT_CITY);
    find_city(name).ok_or_else(|| ApiError::unknown_city(name))
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CityInfo {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CitiesResponse {
    pub default: &'static str,
    pub cities: Vec<CityInfo>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryResponse {
    pub city: &'static str,
    #[serde(flatten)]
    pub outcome: ReconciliationOutcome,
    pub kpis: Kpis,
    /// Risk band of the peak day.
    pub peak_category: UviCategory,
    pub monthly: Vec<MonthlySummary>,
    pub top_days: Vec<DailyObservation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourlyPoint {
    pub time: NaiveDateTime,
    pub uv_index: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clear_sky: Option<f64>,
    pub category: UviCategory,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastResponse {
    pub city: &'static str,
    pub days: u32,
    pub hours: Vec<HourlyPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CopperResponse {
    pub range: DateRange,
    /// USD per pound.
    pub usd: TimeSeries,
    /// CLP per pound, when an exchange rate was available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clp: Option<TimeSeries>,
    /// Exchange-rate observation used for `clp`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<DailyObservation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub city: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    /// Trailing window ending at `end` (or yesterday); overrides `start`.
    pub window_days: Option<u32>,
}

impl HistoryQuery {
    /// Requested `(start, end)` before the reconciler normalises it.
    fn bounds(&self, today: NaiveDate, default_days: u32) -> (NaiveDate, NaiveDate) {
        let yesterday = days_before(today, 1);
        let end = self.end.unwrap_or(yesterday);
        let anchor = end.min(yesterday);
        let start = match self.window_days {
            Some(days) => days_before(anchor, days),
            None => self
                .start
                .unwrap_or_else(|| days_before(anchor, default_days)),
        };
        (start, end)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastQuery {
    pub city: Option<String>,
    pub days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CopperQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /api/cities
pub async fn get_cities() -> Json<CitiesResponse> {
    Json(CitiesResponse {
        default: DEFAULT_CITY,
        cities: CITIES
            .iter()
            .map(|c| CityInfo {
                name: c.name,
                latitude: c.latitude,
                longitude: c.longitude,
            })
            .collect(),
    })
}

async fn reconcile_for(
    state: &DashboardState,
    query: &HistoryQuery,
) -> Result<(&'static City, ReconciliationOutcome), ApiError> {
    let city = resolve_city(query.city.as_deref())?;
    let today = state.today();
    let (start, end) = query.bounds(today, state.default_days);
    let outcome = state
        .history
        .reconcile(&city.location(), start, end, today)
        .await;
    Ok((city, outcome))
}

/// GET /api/uv/history
pub async fn get_uv_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (city, outcome) = reconcile_for(&state, &query).await?;

    let kpis = analysis::kpis(&outcome.series);
    let response = HistoryResponse {
        city: city.name,
        peak_category: UviCategory::classify(kpis.peak),
        monthly: analysis::monthly_aggregate(&outcome.series),
        top_days: analysis::top_n(&outcome.series, TOP_DAYS),
        kpis,
        outcome,
    };
    info!(
        city = city.name,
        provenance = %response.outcome.provenance,
        days = response.kpis.days,
        "History served"
    );
    Ok(Json(response))
}

/// GET /api/uv/history.csv
pub async fn get_uv_history_csv(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Response, ApiError> {
    let (city, outcome) = reconcile_for(&state, &query).await?;
    let body = export::to_csv(&outcome.series).map_err(|e| {
        warn!(city = city.name, error = %e, "CSV export failed");
        ApiError::internal(e)
    })?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::csv_filename("uv", city.name)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// GET /api/uv/forecast
pub async fn get_uv_forecast(
    State(state): State<AppState>,
    Query(query): Query<ForecastQuery>,
) -> Result<Json<ForecastResponse>, ApiError> {
    let city = resolve_city(query.city.as_deref())?;
    let days = query
        .days
        .unwrap_or(DEFAULT_FORECAST_DAYS)
        .clamp(1, MAX_HOURLY_FORECAST_DAYS);

    let hours = state
        .meteo
        .forecast_hourly(&city.location(), days)
        .await
        .map_err(|e| {
            warn!(city = city.name, kind = e.kind(), error = %e, "Hourly forecast failed");
            ApiError::upstream(e)
        })?;

    Ok(Json(ForecastResponse {
        city: city.name,
        days,
        hours: hours
            .into_iter()
            .map(|h| {
                let category = UviCategory::classify(Some(h.uv_index));
                HourlyPoint {
                    time: h.time,
                    uv_index: h.uv_index,
                    clear_sky: h.clear_sky,
                    category,
                    color: category.color(),
                }
            })
            .collect(),
    }))
}

/// GET /api/copper
pub async fn get_copper(
    State(state): State<AppState>,
    Query(query): Query<CopperQuery>,
) -> Result<Json<CopperResponse>, ApiError> {
    let today = state.today();
    let end = query.end.unwrap_or(today);
    let start = query
        .start
        .unwrap_or_else(|| days_before(end, DEFAULT_COPPER_DAYS));
    let range = DateRange::new(start, end);

    let (copper, dollar) = tokio::join!(
        state.indicators.between(COPPER, range),
        state.indicators.recent(DOLLAR),
    );

    let usd = copper.map_err(|e| {
        warn!(indicator = COPPER, kind = e.kind(), error = %e, "Copper fetch failed");
        ApiError::upstream(e)
    })?;

    let (clp, rate, error) = match dollar {
        Ok(rates) => {
            let pair = currency::CurrencyPair::new(usd.clone(), rates);
            match pair.converted(range) {
                Ok(clp) => (Some(clp), pair.latest_rate(), None),
                Err(e) => (None, None, Some(e.to_string())),
            }
        }
        Err(e) => {
            warn!(indicator = DOLLAR, kind = e.kind(), error = %e, "Exchange rate fetch failed");
            (None, None, Some(e.to_string()))
        }
    };

    Ok(Json(CopperResponse {
        range,
        usd,
        clp,
        rate,
        error,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
