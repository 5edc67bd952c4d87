//! Shared types for UVDASH.
//!
//! These types form the data model used across all modules: the daily
//! series that the normalizer produces, the outcome the reconciler hands
//! back to callers, and the error enums threaded through both.

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A named point the upstream sources can be queried for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.4}, {:.4})", self.name, self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// Daily series
// ---------------------------------------------------------------------------

/// One value per calendar day: a UV index maximum or an indicator price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyObservation {
    pub date: NaiveDate,
    pub value: f64,
    /// Clear-sky reference for the same day, when the source reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<f64>,
}

impl DailyObservation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self {
            date,
            value,
            reference: None,
        }
    }

    pub fn with_reference(mut self, reference: Option<f64>) -> Self {
        self.reference = reference;
        self
    }
}

/// Ordered daily series, strictly increasing by date.
///
/// The only constructors sort and deduplicate, so every `TimeSeries` in
/// the program upholds the ordering invariant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: Vec<DailyObservation>,
}

impl TimeSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a series from observations in any order.
    /// When a date repeats, the first occurrence wins.
    pub fn from_observations(observations: impl IntoIterator<Item = DailyObservation>) -> Self {
        let mut by_date = BTreeMap::new();
        for obs in observations {
            by_date.entry(obs.date).or_insert(obs);
        }
        Self {
            points: by_date.into_values().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DailyObservation> {
        self.points.iter()
    }

    pub fn as_slice(&self) -> &[DailyObservation] {
        &self.points
    }

    pub fn first(&self) -> Option<&DailyObservation> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&DailyObservation> {
        self.points.last()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last().map(|o| o.date)
    }

    /// Look up the observation for a given day.
    pub fn get(&self, date: NaiveDate) -> Option<&DailyObservation> {
        self.points
            .binary_search_by_key(&date, |o| o.date)
            .ok()
            .map(|i| &self.points[i])
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|o| o.value)
    }

    /// Observations with `start <= date <= end`. An inverted window is empty.
    pub fn clip(&self, start: NaiveDate, end: NaiveDate) -> TimeSeries {
        let points = self
            .points
            .iter()
            .filter(|o| o.date >= start && o.date <= end)
            .copied()
            .collect();
        TimeSeries { points }
    }

    /// Layer `other` on top of this series. Where both carry the same date,
    /// the value from `other` is kept.
    pub fn overlay(&self, other: &TimeSeries) -> TimeSeries {
        let mut by_date: BTreeMap<NaiveDate, DailyObservation> =
            self.points.iter().map(|o| (o.date, *o)).collect();
        for obs in &other.points {
            by_date.insert(obs.date, *obs);
        }
        TimeSeries {
            points: by_date.into_values().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TimeSeries {
    type Item = &'a DailyObservation;
    type IntoIter = std::slice::Iter<'a, DailyObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// One hourly point from the short-range forecast.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourlyObservation {
    pub time: NaiveDateTime,
    pub uv_index: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clear_sky: Option<f64>,
}

impl HourlyObservation {
    pub fn date(&self) -> NaiveDate {
        self.time.date()
    }
}

// ---------------------------------------------------------------------------
// Date ranges
// ---------------------------------------------------------------------------

/// `date - days`, saturating at `NaiveDate::MIN` instead of overflowing.
pub fn days_before(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Inclusive calendar window with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Build a range from two bounds in either order.
    pub fn new(a: NaiveDate, b: NaiveDate) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    /// The window of `days` days ending at `end` (`start = end - days`).
    /// `start` saturates at the earliest representable date.
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        Self {
            start: days_before(end, days),
            end,
        }
    }

    /// Number of calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

/// Informational note about how a requested range was normalised before
/// querying. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RangeAdjustment {
    /// The requested end was past yesterday; archive data stops there.
    EndClamped { requested: NaiveDate, applied: NaiveDate },
    /// The bounds arrived in reverse order and were swapped.
    Swapped { start: NaiveDate, end: NaiveDate },
    /// The gap to fill needed more lookback than the provider allows.
    LookbackCapped { needed_days: i64, applied_days: u32 },
}

impl fmt::Display for RangeAdjustment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeAdjustment::EndClamped { requested, applied } => write!(
                f,
                "History only reaches yesterday; end moved from {requested} to {applied}"
            ),
            RangeAdjustment::Swapped { start, end } => {
                write!(f, "Start was after end; range swapped to {start} → {end}")
            }
            RangeAdjustment::LookbackCapped {
                needed_days,
                applied_days,
            } => write!(
                f,
                "Gap of {needed_days} days exceeds the {applied_days}-day lookback limit; older days stay missing"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Reconciliation outcome
// ---------------------------------------------------------------------------

/// Which upstream source(s) contributed to a reconciled series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "source", content = "lookback_days", rename_all = "snake_case")]
pub enum Provenance {
    Archive,
    Forecast(u32),
    ArchiveAndForecast(u32),
    Empty,
    None,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Archive => write!(f, "archive"),
            Provenance::Forecast(days) => write!(f, "forecast (past_days={days})"),
            Provenance::ArchiveAndForecast(days) => {
                write!(f, "archive+forecast (past_days={days})")
            }
            Provenance::Empty => write!(f, "empty"),
            Provenance::None => write!(f, "none"),
        }
    }
}

/// Result of assembling a historical series for one location and range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationOutcome {
    pub series: TimeSeries,
    /// Human-readable diagnostic when data is incomplete or absent.
    pub error: Option<String>,
    pub provenance: Provenance,
    /// The range actually queried, after clamping and swapping.
    pub range: DateRange,
    pub adjustments: Vec<RangeAdjustment>,
}

impl ReconciliationOutcome {
    pub fn has_data(&self) -> bool {
        !self.series.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Failure of a single upstream request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("Transport error ({endpoint}): {message}")]
    Transport { endpoint: String, message: String },

    #[error("HTTP {status} from {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Parse error ({endpoint}): {message}")]
    Parse { endpoint: String, message: String },
}

impl FetchError {
    /// Short failure class, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } | FetchError::Status { .. } => "transport",
            FetchError::Parse { .. } => "parse",
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

/// Currency conversion could not be performed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("No exchange rate available: the rate series is empty")]
    NoRate,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn obs(date: NaiveDate, value: f64) -> DailyObservation {
        DailyObservation::new(date, value)
    }

    // -- TimeSeries --

    #[test]
    fn test_from_observations_sorts_and_keeps_first() {
        let series = TimeSeries::from_observations(vec![
            obs(d(2025, 1, 3), 9.0),
            obs(d(2025, 1, 1), 7.0),
            obs(d(2025, 1, 3), 1.0),
            obs(d(2025, 1, 2), 8.0),
        ]);
        let dates: Vec<_> = series.iter().map(|o| o.date).collect();
        assert_eq!(dates, vec![d(2025, 1, 1), d(2025, 1, 2), d(2025, 1, 3)]);
        assert_eq!(series.get(d(2025, 1, 3)).unwrap().value, 9.0);
    }

    #[test]
    fn test_clip_inclusive_both_ends() {
        let series = TimeSeries::from_observations(
            (1..=10).map(|day| obs(d(2025, 3, day), day as f64)),
        );
        let clipped = series.clip(d(2025, 3, 3), d(2025, 3, 6));
        assert_eq!(clipped.len(), 4);
        assert_eq!(clipped.first_date(), Some(d(2025, 3, 3)));
        assert_eq!(clipped.last_date(), Some(d(2025, 3, 6)));
    }

    #[test]
    fn test_clip_idempotent() {
        let series = TimeSeries::from_observations(
            (1..=20).map(|day| obs(d(2025, 4, day), 2.0 * day as f64)),
        );
        let (s, e) = (d(2025, 4, 5), d(2025, 4, 12));
        let once = series.clip(s, e);
        assert_eq!(once.clip(s, e), once);
    }

    #[test]
    fn test_clip_inverted_window_is_empty() {
        let series = TimeSeries::from_observations(vec![obs(d(2025, 1, 1), 1.0)]);
        assert!(series.clip(d(2025, 2, 1), d(2025, 1, 1)).is_empty());
    }

    #[test]
    fn test_overlay_prefers_other() {
        let base = TimeSeries::from_observations(vec![
            obs(d(2025, 1, 1), 1.0),
            obs(d(2025, 1, 2), 2.0),
        ]);
        let top = TimeSeries::from_observations(vec![
            obs(d(2025, 1, 2), 20.0),
            obs(d(2025, 1, 3), 30.0),
        ]);
        let merged = base.overlay(&top);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get(d(2025, 1, 1)).unwrap().value, 1.0);
        assert_eq!(merged.get(d(2025, 1, 2)).unwrap().value, 20.0);
    }

    #[test]
    fn test_series_serializes_as_array() {
        let series = TimeSeries::from_observations(vec![
            obs(d(2025, 1, 1), 5.5).with_reference(Some(6.0)),
            obs(d(2025, 1, 2), 4.0),
        ]);
        let json = serde_json::to_value(&series).unwrap();
        assert_eq!(json[0]["date"], "2025-01-01");
        assert_eq!(json[0]["reference"], 6.0);
        assert!(json[1].get("reference").is_none());
    }

    // -- DateRange --

    #[test]
    fn test_date_range_new_swaps() {
        let r = DateRange::new(d(2025, 5, 10), d(2025, 5, 1));
        assert_eq!(r.start, d(2025, 5, 1));
        assert_eq!(r.end, d(2025, 5, 10));
        assert_eq!(r.days(), 10);
    }

    #[test]
    fn test_date_range_trailing() {
        let r = DateRange::trailing(d(2025, 7, 1), 180);
        assert_eq!(r.start, d(2025, 1, 2));
        assert!(r.contains(d(2025, 3, 1)));
        assert!(!r.contains(d(2025, 7, 2)));
    }

    #[test]
    fn test_days_before_saturates_at_min() {
        assert_eq!(days_before(d(2025, 3, 1), 1), d(2025, 2, 28));
        assert_eq!(days_before(d(2025, 3, 1), u32::MAX), NaiveDate::MIN);
        assert_eq!(days_before(NaiveDate::MIN, 30), NaiveDate::MIN);
        assert_eq!(DateRange::trailing(NaiveDate::MIN, 10).start, NaiveDate::MIN);
    }

    // -- Provenance --

    #[test]
    fn test_provenance_display() {
        assert_eq!(format!("{}", Provenance::Archive), "archive");
        assert_eq!(format!("{}", Provenance::Forecast(7)), "forecast (past_days=7)");
        assert_eq!(
            format!("{}", Provenance::ArchiveAndForecast(5)),
            "archive+forecast (past_days=5)"
        );
        assert_eq!(format!("{}", Provenance::None), "none");
    }

    #[test]
    fn test_provenance_serializes_with_lookback() {
        let json = serde_json::to_value(Provenance::ArchiveAndForecast(11)).unwrap();
        assert_eq!(json["source"], "archive_and_forecast");
        assert_eq!(json["lookback_days"], 11);

        let json = serde_json::to_value(Provenance::Empty).unwrap();
        assert_eq!(json["source"], "empty");
    }

    // -- Errors --

    #[test]
    fn test_fetch_error_kind_and_message() {
        let err = FetchError::Status {
            endpoint: "archive".into(),
            status: 503,
        };
        assert_eq!(err.kind(), "transport");
        assert_eq!(err.to_string(), "HTTP 503 from archive");

        let err = FetchError::Parse {
            endpoint: "forecast".into(),
            message: "expected value".into(),
        };
        assert_eq!(err.kind(), "parse");
        assert!(err.to_string().contains("expected value"));
    }

    #[test]
    fn test_range_adjustment_display() {
        let adj = RangeAdjustment::LookbackCapped {
            needed_days: 200,
            applied_days: 92,
        };
        assert!(adj.to_string().contains("200"));
        assert!(adj.to_string().contains("92"));
    }
}
