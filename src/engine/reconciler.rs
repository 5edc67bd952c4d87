//! Historical series reconciliation.
//!
//! Assembles a complete daily series for a location and date range from
//! two Open-Meteo endpoints:
//!
//! 1. The archive, authoritative but lagging: it never has the current day
//!    and is often several days behind.
//! 2. The forecast endpoint, which can report up to 92 trailing days. It is
//!    only asked for the days after the archive's last date.
//!
//! The archive always wins for any date it returns. Upstream failures are
//! folded into the outcome as diagnostics; nothing here returns an error.

use chrono::{Duration, Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::config::PROVIDER_MAX_LOOKBACK_DAYS;
use crate::data::open_meteo::{DailyMetric, OpenMeteoClient};
use crate::types::{
    days_before, DateRange, Location, Provenance, RangeAdjustment, ReconciliationOutcome,
    TimeSeries,
};

/// Normalise a requested window against `today`.
///
/// The end is clamped to yesterday (the archive has no same-day data) and
/// reversed bounds are swapped. Every change is reported as an adjustment.
pub fn effective_range(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> (DateRange, Vec<RangeAdjustment>) {
    let yesterday = days_before(today, 1);
    let mut adjustments = Vec::new();
    let (mut start, mut end) = (start, end);

    if end > yesterday {
        adjustments.push(RangeAdjustment::EndClamped {
            requested: end,
            applied: yesterday,
        });
        end = yesterday;
    }

    if start > end {
        std::mem::swap(&mut start, &mut end);
        if end > yesterday {
            adjustments.push(RangeAdjustment::EndClamped {
                requested: end,
                applied: yesterday,
            });
            end = yesterday;
        }
        adjustments.push(RangeAdjustment::Swapped { start, end });
    }

    (DateRange { start, end }, adjustments)
}

/// Stateless reconciler over an Open-Meteo client.
///
/// Each call is independent; identical inputs and identical upstream
/// responses always produce the same outcome.
#[derive(Clone)]
pub struct HistoryReconciler {
    meteo: OpenMeteoClient,
    metric: DailyMetric,
    max_lookback: u32,
}

impl HistoryReconciler {
    pub fn new(meteo: OpenMeteoClient, metric: DailyMetric) -> Self {
        Self {
            meteo,
            metric,
            max_lookback: PROVIDER_MAX_LOOKBACK_DAYS,
        }
    }

    /// Lower the lookback ceiling. Never raised above the provider's 92 days.
    pub fn with_max_lookback(mut self, days: u32) -> Self {
        self.max_lookback = days.clamp(1, PROVIDER_MAX_LOOKBACK_DAYS);
        self
    }

    pub fn max_lookback(&self) -> u32 {
        self.max_lookback
    }

    /// `reconcile` against the local calendar date.
    pub async fn reconcile_now(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ReconciliationOutcome {
        self.reconcile(location, start, end, Local::now().date_naive()).await
    }

    /// Assemble the daily series for `[start, end]` as seen on `today`.
    pub async fn reconcile(
        &self,
        location: &Location,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> ReconciliationOutcome {
        let (range, mut adjustments) = effective_range(start, end, today);
        for adj in &adjustments {
            debug!(city = %location.name, adjustment = %adj, "Range adjusted");
        }

        let (archive, archive_error) = match self.meteo.archive_daily(location, range, &self.metric).await {
            Ok(series) => (series, None),
            Err(e) => {
                warn!(city = %location.name, %range, kind = e.kind(), error = %e, "Archive fetch failed");
                (TimeSeries::empty(), Some(e.to_string()))
            }
        };

        let (series, error, provenance) = match archive.last_date() {
            Some(last) => self.fill_tail(location, range, archive, last, &mut adjustments).await,
            None => {
                self.forecast_only(location, range, archive_error, &mut adjustments)
                    .await
            }
        };

        info!(
            city = %location.name,
            %range,
            provenance = %provenance,
            points = series.len(),
            error = error.as_deref().unwrap_or(""),
            "History reconciled"
        );

        ReconciliationOutcome {
            series,
            error,
            provenance,
            range,
            adjustments,
        }
    }

    /// Archive returned data: use it as is, or fill the days after `last`.
    async fn fill_tail(
        &self,
        location: &Location,
        range: DateRange,
        archive: TimeSeries,
        last: NaiveDate,
        adjustments: &mut Vec<RangeAdjustment>,
    ) -> (TimeSeries, Option<String>, Provenance) {
        let archived = archive.clip(range.start, range.end);
        if last >= range.end {
            return (archived, None, Provenance::Archive);
        }

        let gap_start = last + Duration::days(1);
        let gap_days = (range.end - gap_start).num_days() + 1;
        let lookback = self.lookback_for(gap_days, adjustments);
        debug!(city = %location.name, %last, gap_days, lookback, "Archive behind, querying forecast");

        let recent = match self.meteo.forecast_daily(location, lookback, &self.metric).await {
            Ok(series) => series,
            Err(e) => {
                warn!(city = %location.name, kind = e.kind(), error = %e, "Forecast fallback failed");
                return (archived, Some(e.to_string()), Provenance::Archive);
            }
        };

        let fill = recent.clip(gap_start, range.end);
        if fill.is_empty() {
            let note = format!("No data after {last}; the forecast source had nothing for {gap_start} → {}", range.end);
            return (archived, Some(note), Provenance::Archive);
        }

        let merged = archive.overlay(&fill).clip(range.start, range.end);
        (merged, None, Provenance::ArchiveAndForecast(lookback))
    }

    /// Archive returned nothing: try the forecast source for the whole window.
    async fn forecast_only(
        &self,
        location: &Location,
        range: DateRange,
        archive_error: Option<String>,
        adjustments: &mut Vec<RangeAdjustment>,
    ) -> (TimeSeries, Option<String>, Provenance) {
        let lookback = self.lookback_for(range.days(), adjustments);
        debug!(city = %location.name, %range, lookback, "Archive empty, querying forecast");

        let with_archive_error = |message: String| match &archive_error {
            Some(archive) => format!("{message} (archive: {archive})"),
            None => message,
        };

        let recent = match self.meteo.forecast_daily(location, lookback, &self.metric).await {
            Ok(series) => series,
            Err(e) => {
                warn!(city = %location.name, kind = e.kind(), error = %e, "Forecast fallback failed");
                return (TimeSeries::empty(), Some(with_archive_error(e.to_string())), Provenance::None);
            }
        };

        let clipped = recent.clip(range.start, range.end);
        if clipped.is_empty() {
            let message = format!("No data available for {} between {range}", location.name);
            return (TimeSeries::empty(), Some(with_archive_error(message)), Provenance::Empty);
        }

        (clipped, None, Provenance::Forecast(lookback))
    }

    /// Clamp a day count to `1..=max_lookback`, noting when it had to be cut.
    fn lookback_for(&self, needed_days: i64, adjustments: &mut Vec<RangeAdjustment>) -> u32 {
        let ceiling = i64::from(self.max_lookback);
        if needed_days > ceiling {
            adjustments.push(RangeAdjustment::LookbackCapped {
                needed_days,
                applied_days: self.max_lookback,
            });
        }
        // Bounded by the clamp above, so the cast cannot truncate.
        needed_days.clamp(1, ceiling) as u32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
