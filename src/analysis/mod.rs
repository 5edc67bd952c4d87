//! Derived metrics over daily series.
//!
//! Read-only helpers used by the dashboard: top days, monthly summaries,
//! headline KPIs, plus the UVI risk bands (`uvi`) and currency conversion
//! (`currency`).

pub mod currency;
pub mod uvi;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::{DailyObservation, TimeSeries};

/// Up to `n` observations with the largest values, highest first.
/// Ties keep date order (earlier first).
pub fn top_n(series: &TimeSeries, n: usize) -> Vec<DailyObservation> {
    let mut ranked = series.as_slice().to_vec();
    ranked.sort_by(|a, b| b.value.total_cmp(&a.value));
    ranked.truncate(n);
    ranked
}

/// The most recent observation.
pub fn last_value(series: &TimeSeries) -> Option<DailyObservation> {
    series.last().copied()
}

/// Observations with `start <= date <= end`.
pub fn clip(series: &TimeSeries, start: NaiveDate, end: NaiveDate) -> TimeSeries {
    series.clip(start, end)
}

/// Aggregates for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    /// First day of the month.
    pub month: NaiveDate,
    pub days: usize,
    pub mean: f64,
    pub max: f64,
    /// Mean of the clear-sky reference over the days that report one.
    pub reference_mean: Option<f64>,
}

#[derive(Default)]
struct MonthAcc {
    days: usize,
    sum: f64,
    max: f64,
    ref_sum: f64,
    ref_days: usize,
}

/// Group by calendar month, oldest first.
pub fn monthly_aggregate(series: &TimeSeries) -> Vec<MonthlySummary> {
    let mut months: BTreeMap<(i32, u32), MonthAcc> = BTreeMap::new();
    for obs in series {
        let acc = months.entry((obs.date.year(), obs.date.month())).or_default();
        acc.max = if acc.days == 0 { obs.value } else { acc.max.max(obs.value) };
        acc.days += 1;
        acc.sum += obs.value;
        if let Some(r) = obs.reference {
            acc.ref_sum += r;
            acc.ref_days += 1;
        }
    }

    months
        .into_iter()
        .filter_map(|((year, month), acc)| {
            Some(MonthlySummary {
                month: NaiveDate::from_ymd_opt(year, month, 1)?,
                days: acc.days,
                mean: acc.sum / acc.days as f64,
                max: acc.max,
                reference_mean: (acc.ref_days > 0).then(|| acc.ref_sum / acc.ref_days as f64),
            })
        })
        .collect()
}

/// Headline figures for a history panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub days: usize,
    /// Mean daily value, rounded to one decimal.
    pub mean: Option<f64>,
    /// Highest daily value, rounded to one decimal.
    pub peak: Option<f64>,
    /// Date of the peak (earliest one on ties).
    pub peak_date: Option<NaiveDate>,
}

pub fn kpis(series: &TimeSeries) -> Kpis {
    if series.is_empty() {
        return Kpis {
            days: 0,
            mean: None,
            peak: None,
            peak_date: None,
        };
    }
    let mean = series.values().sum::<f64>() / series.len() as f64;
    let peak = top_n(series, 1).into_iter().next();
    Kpis {
        days: series.len(),
        mean: Some(round1(mean)),
        peak: peak.map(|o| round1(o.value)),
        peak_date: peak.map(|o| o.date),
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
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

    fn series(points: &[(NaiveDate, f64)]) -> TimeSeries {
        TimeSeries::from_observations(points.iter().map(|&(date, v)| DailyObservation::new(date, v)))
    }

    #[test]
    fn test_top_n_shorter_series_returns_all_descending() {
        let s = series(&[(d(2025, 1, 1), 4.0), (d(2025, 1, 2), 9.0), (d(2025, 1, 3), 6.5)]);
        let top = top_n(&s, 5);
        let values: Vec<f64> = top.iter().map(|o| o.value).collect();
        assert_eq!(values, vec![9.0, 6.5, 4.0]);
    }

    #[test]
    fn test_top_n_ties_keep_earlier_date() {
        let s = series(&[
            (d(2025, 1, 3), 8.0),
            (d(2025, 1, 1), 8.0),
            (d(2025, 1, 2), 3.0),
        ]);
        let top = top_n(&s, 2);
        assert_eq!(top[0].date, d(2025, 1, 1));
        assert_eq!(top[1].date, d(2025, 1, 3));
    }

    #[test]
    fn test_top_n_zero() {
        let s = series(&[(d(2025, 1, 1), 4.0)]);
        assert!(top_n(&s, 0).is_empty());
    }

    #[test]
    fn test_last_value() {
        let s = series(&[(d(2025, 1, 5), 1.0), (d(2025, 1, 9), 2.0)]);
        assert_eq!(last_value(&s).unwrap().date, d(2025, 1, 9));
        assert!(last_value(&TimeSeries::empty()).is_none());
    }

    #[test]
    fn test_clip_twice_same_as_once() {
        let s = series(&[(d(2025, 1, 1), 1.0), (d(2025, 1, 5), 2.0), (d(2025, 1, 9), 3.0)]);
        let once = clip(&s, d(2025, 1, 2), d(2025, 1, 9));
        assert_eq!(clip(&once, d(2025, 1, 2), d(2025, 1, 9)), once);
        assert_eq!(once.len(), 2);
    }

    #[test]
    fn test_monthly_aggregate() {
        let s = TimeSeries::from_observations(vec![
            DailyObservation::new(d(2025, 1, 30), 10.0).with_reference(Some(11.0)),
            DailyObservation::new(d(2025, 1, 31), 12.0).with_reference(Some(13.0)),
            DailyObservation::new(d(2025, 2, 1), 8.0),
        ]);
        let months = monthly_aggregate(&s);
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, d(2025, 1, 1));
        assert_eq!(months[0].days, 2);
        assert!((months[0].mean - 11.0).abs() < 1e-10);
        assert_eq!(months[0].max, 12.0);
        assert_eq!(months[0].reference_mean, Some(12.0));
        assert_eq!(months[1].max, 8.0);
        assert_eq!(months[1].reference_mean, None);
    }

    #[test]
    fn test_monthly_aggregate_empty() {
        assert!(monthly_aggregate(&TimeSeries::empty()).is_empty());
    }

    #[test]
    fn test_kpis() {
        let s = series(&[(d(2025, 1, 1), 10.04), (d(2025, 1, 2), 13.26), (d(2025, 1, 3), 11.0)]);
        let k = kpis(&s);
        assert_eq!(k.days, 3);
        assert_eq!(k.mean, Some(11.4));
        assert_eq!(k.peak, Some(13.3));
        assert_eq!(k.peak_date, Some(d(2025, 1, 2)));
    }

    #[test]
    fn test_kpis_empty() {
        let k = kpis(&TimeSeries::empty());
        assert_eq!(k.days, 0);
        assert!(k.mean.is_none());
        assert!(k.peak_date.is_none());
    }
}
