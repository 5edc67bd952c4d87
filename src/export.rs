//! Export a daily series to CSV.
//!
//! One `date,value` row per observation under a header, ready for
//! spreadsheets or downstream scripts.

use crate::types::TimeSeries;

pub const CSV_HEADER: [&str; 2] = ["date", "value"];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV flush failed: {0}")]
    Flush(String),

    #[error("CSV output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Render `series` as CSV text.
pub fn to_csv(series: &TimeSeries) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for obs in series {
        writer.serialize((obs.date, obs.value))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}

/// File name for a city export, e.g. `uv_San_Pedro_de_Atacama.csv`.
pub fn csv_filename(prefix: &str, city: &str) -> String {
    let city = city.split_whitespace().collect::<Vec<_>>().join("_");
    format!("{prefix}_{city}.csv")
}
