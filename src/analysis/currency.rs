//! Currency conversion for indicator panels.
//!
//! A commodity quoted in USD is converted with the single most recent
//! exchange rate, not a rate matched per date.

use crate::types::{ConversionError, DailyObservation, DateRange, TimeSeries};

/// Multiply every value in `primary` by the latest value in `rates`.
///
/// Clip `primary` before calling if only a window is wanted. An empty
/// `rates` series is an error.
pub fn convert(primary: &TimeSeries, rates: &TimeSeries) -> Result<TimeSeries, ConversionError> {
    let rate = rates.last().ok_or(ConversionError::NoRate)?.value;
    Ok(TimeSeries::from_observations(primary.iter().map(|o| {
        DailyObservation::new(o.date, o.value * rate).with_reference(o.reference.map(|r| r * rate))
    })))
}

/// A commodity price series and the exchange-rate series used to convert it.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencyPair {
    /// Commodity price in the source currency (USD).
    pub commodity: TimeSeries,
    /// Target units per source unit (CLP per USD).
    pub rate: TimeSeries,
}

impl CurrencyPair {
    pub fn new(commodity: TimeSeries, rate: TimeSeries) -> Self {
        Self { commodity, rate }
    }

    /// The rate every conversion uses.
    pub fn latest_rate(&self) -> Option<DailyObservation> {
        self.rate.last().copied()
    }

    /// Commodity observations inside `range`, converted.
    pub fn converted(&self, range: DateRange) -> Result<TimeSeries, ConversionError> {
        convert(&self.commodity.clip(range.start, range.end), &self.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn series(points: &[(NaiveDate, f64)]) -> TimeSeries {
        TimeSeries::from_observations(points.iter().map(|&(date, v)| DailyObservation::new(date, v)))
    }

    #[test]
    fn test_convert_uses_latest_rate_only() {
        let copper = series(&[(d(2025, 3, 3), 4.0), (d(2025, 3, 4), 4.5)]);
        let dollar = series(&[(d(2025, 3, 1), 900.0), (d(2025, 3, 3), 950.0), (d(2025, 3, 4), 1000.0)]);
        let clp = convert(&copper, &dollar).unwrap();
        assert_eq!(clp.get(d(2025, 3, 3)).unwrap().value, 4000.0);
        assert_eq!(clp.get(d(2025, 3, 4)).unwrap().value, 4500.0);
    }

    #[test]
    fn test_convert_empty_rates_is_error() {
        let copper = series(&[(d(2025, 3, 3), 4.0)]);
        assert_eq!(convert(&copper, &TimeSeries::empty()), Err(ConversionError::NoRate));
    }

    #[test]
    fn test_convert_empty_primary_is_empty() {
        let dollar = series(&[(d(2025, 3, 1), 900.0)]);
        assert!(convert(&TimeSeries::empty(), &dollar).unwrap().is_empty());
    }

    #[test]
    fn test_pair_converted_clips_first() {
        let pair = CurrencyPair::new(
            series(&[(d(2025, 2, 27), 4.2), (d(2025, 3, 3), 4.0), (d(2025, 3, 10), 4.4)]),
            series(&[(d(2025, 3, 9), 940.0), (d(2025, 3, 10), 950.0)]),
        );
        let clp = pair.converted(DateRange::new(d(2025, 3, 1), d(2025, 3, 5))).unwrap();
        assert_eq!(clp.len(), 1);
        assert_eq!(clp.first().unwrap().value, 3800.0);
        assert_eq!(pair.latest_rate().unwrap().value, 950.0);
    }
}
