//! Series normalizer.
//!
//! Converts raw upstream payloads into ordered series. Every value is read
//! as `Option<f64>`: JSON numbers and numeric strings parse, while nulls,
//! text, negatives and non-finite numbers count as missing. A missing
//! value drops its date entirely.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::types::{DailyObservation, FetchError, HourlyObservation, TimeSeries};

/// The payload did not have the shape a normalizer expects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ShapeError(String);

impl ShapeError {
    pub fn into_fetch_error(self, endpoint: &str) -> FetchError {
        FetchError::Parse {
            endpoint: endpoint.to_string(),
            message: self.0,
        }
    }
}

/// Read one value cell.
pub fn parse_value(raw: &Value) -> Option<f64> {
    let v = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (v.is_finite() && v >= 0.0).then_some(v)
}

/// Parse `YYYY-MM-DD`, ignoring any time suffix (`2024-05-02T04:00:00.000Z`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_hour(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
}

/// Borrow the named container and its `time` array.
///
/// `Ok(None)` means the container is absent, which callers treat as
/// "no data" rather than a malformed payload.
fn columns<'a>(
    raw: &'a Value,
    container: &str,
) -> Result<Option<(&'a serde_json::Map<String, Value>, &'a Vec<Value>)>, ShapeError> {
    let block = match raw.get(container) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(block)) => block,
        Some(_) => return Err(ShapeError(format!("'{container}' is not an object"))),
    };
    let time = block
        .get("time")
        .and_then(Value::as_array)
        .ok_or_else(|| ShapeError(format!("'{container}' has no 'time' array")))?;
    Ok(Some((block, time)))
}

fn column<'a>(
    block: &'a serde_json::Map<String, Value>,
    container: &str,
    field: &str,
) -> Result<Option<&'a Vec<Value>>, ShapeError> {
    match block.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(values)) => Ok(Some(values)),
        Some(_) => Err(ShapeError(format!("'{container}.{field}' is not an array"))),
    }
}

/// Normalize a daily block: `{ <container>: { time: [...], <field>: [...] } }`.
///
/// `reference_field`, when given, fills `DailyObservation::reference` and
/// never causes a date to be dropped.
pub fn daily(
    raw: &Value,
    container: &str,
    value_field: &str,
    reference_field: Option<&str>,
) -> Result<TimeSeries, ShapeError> {
    let Some((block, time)) = columns(raw, container)? else {
        debug!(container, "Container absent, treating as no data");
        return Ok(TimeSeries::empty());
    };
    let Some(values) = column(block, container, value_field)? else {
        debug!(container, field = value_field, "Value column absent");
        return Ok(TimeSeries::empty());
    };
    let references = match reference_field {
        Some(field) => column(block, container, field)?,
        None => None,
    };

    let mut dropped = 0usize;
    let observations: Vec<DailyObservation> = time
        .iter()
        .enumerate()
        .filter_map(|(i, t)| {
            let date = t.as_str().and_then(parse_date);
            let value = values.get(i).and_then(parse_value);
            match (date, value) {
                (Some(date), Some(value)) => {
                    let reference = references.and_then(|r| r.get(i)).and_then(parse_value);
                    Some(DailyObservation::new(date, value).with_reference(reference))
                }
                _ => {
                    dropped += 1;
                    None
                }
            }
        })
        .collect();

    if dropped > 0 {
        debug!(container, field = value_field, dropped, "Dropped days with missing values");
    }
    Ok(TimeSeries::from_observations(observations))
}

/// Normalize the hourly forecast block, sorted by time with duplicates
/// removed (first seen wins).
pub fn hourly(
    raw: &Value,
    value_field: &str,
    reference_field: Option<&str>,
) -> Result<Vec<HourlyObservation>, ShapeError> {
    let Some((block, time)) = columns(raw, "hourly")? else {
        return Ok(Vec::new());
    };
    let Some(values) = column(block, "hourly", value_field)? else {
        return Ok(Vec::new());
    };
    let references = match reference_field {
        Some(field) => column(block, "hourly", field)?,
        None => None,
    };

    let mut by_time = BTreeMap::new();
    for (i, t) in time.iter().enumerate() {
        let Some(at) = t.as_str().and_then(parse_hour) else { continue };
        let Some(uv_index) = values.get(i).and_then(parse_value) else { continue };
        let clear_sky = references.and_then(|r| r.get(i)).and_then(parse_value);
        by_time.entry(at).or_insert(HourlyObservation {
            time: at,
            uv_index,
            clear_sky,
        });
    }
    Ok(by_time.into_values().collect())
}

#[derive(Debug, Deserialize)]
struct IndicatorResponse {
    #[serde(default)]
    serie: Vec<IndicatorPoint>,
}

#[derive(Debug, Deserialize)]
struct IndicatorPoint {
    fecha: String,
    #[serde(default)]
    valor: Value,
}

/// Normalize an indicator payload: `{ serie: [ { fecha, valor }, ... ] }`.
/// The upstream lists newest first; the result is ascending.
pub fn indicator(raw: &Value) -> Result<TimeSeries, ShapeError> {
    let resp = IndicatorResponse::deserialize(raw)
        .map_err(|e| ShapeError(format!("unexpected indicator payload: {e}")))?;
    let observations = resp.serie.iter().filter_map(|p| {
        let date = parse_date(&p.fecha)?;
        let value = parse_value(&p.valor)?;
        Some(DailyObservation::new(date, value))
    });
    Ok(TimeSeries::from_observations(observations))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
