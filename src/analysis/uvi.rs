//! UV index risk bands (WHO scale).
//!
//! Values are rounded to the nearest integer before banding, so 2.4 is
//! Low and 2.5 is Moderate.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UviCategory {
    Low,
    Moderate,
    High,
    VeryHigh,
    Extreme,
    NoData,
}

impl UviCategory {
    pub const ALL: &'static [UviCategory] = &[
        UviCategory::Low,
        UviCategory::Moderate,
        UviCategory::High,
        UviCategory::VeryHigh,
        UviCategory::Extreme,
    ];

    pub fn classify(uvi: Option<f64>) -> Self {
        let Some(v) = uvi.filter(|v| v.is_finite() && *v >= 0.0) else {
            return UviCategory::NoData;
        };
        match v.round() {
            r if r <= 2.0 => UviCategory::Low,
            r if r <= 5.0 => UviCategory::Moderate,
            r if r <= 7.0 => UviCategory::High,
            r if r <= 10.0 => UviCategory::VeryHigh,
            _ => UviCategory::Extreme,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UviCategory::Low => "Low",
            UviCategory::Moderate => "Moderate",
            UviCategory::High => "High",
            UviCategory::VeryHigh => "Very high",
            UviCategory::Extreme => "Extreme",
            UviCategory::NoData => "No data",
        }
    }

    /// Display colour used by the charts.
    pub fn color(&self) -> &'static str {
        match self {
            UviCategory::Low => "#2DC653",
            UviCategory::Moderate => "#FFD43B",
            UviCategory::High => "#FF922B",
            UviCategory::VeryHigh => "#FA5252",
            UviCategory::Extreme => "#862E9C",
            UviCategory::NoData => "#ADB5BD",
        }
    }
}

impl fmt::Display for UviCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
