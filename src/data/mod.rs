//! Historical weather data
//!
//! - CSV ingestion into a [`FeatureFrame`], tolerant of missing weather columns
//! - Strict [`WeatherRecord`] CSV round trip
//! - Seeded synthetic history for training without a dataset

mod synthetic;

pub use synthetic::{synthetic_history, DEFAULT_LATITUDE, DEFAULT_LONGITUDE};

use crate::error::{ForecastError, Result};
use crate::features::FeatureFrame;
use crate::types::WeatherRecord;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::StringRecord;
use std::path::Path;
use tracing::{debug, warn};

const DATE_COLUMN: &str = "date";

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ForecastError::InputUnavailable(format!(
            "{} does not exist",
            path.display()
        )))
    }
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339 timestamps
fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").ok().map(|dt| dt.date()))
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// Load a CSV with a `date` column into a frame sorted by date
///
/// Other columns are kept when every non-empty cell parses as a number;
/// empty cells and `NaN`/`inf` become undefined.
pub fn load_frame(path: &Path) -> Result<FeatureFrame> {
    ensure_exists(path)?;

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let date_idx = headers
        .iter()
        .position(|h| h.trim() == DATE_COLUMN)
        .ok_or_else(|| ForecastError::MissingDate(format!("{} has no '{}' column", path.display(), DATE_COLUMN)))?;

    let mut rows = reader
        .records()
        .enumerate()
        .map(|(i, record)| -> Result<(NaiveDate, StringRecord)> {
            let record = record?;
            let raw = record.get(date_idx).map(str::trim).unwrap_or_default();
            if raw.is_empty() {
                return Err(ForecastError::MissingDate(format!("row {} has no date", i + 1)));
            }
            let date = parse_date(raw)
                .ok_or_else(|| ForecastError::MissingDate(format!("row {}: unparseable date '{}'", i + 1, raw)))?;
            Ok((date, record))
        })
        .collect::<Result<Vec<(NaiveDate, StringRecord)>>>()?;
    rows.sort_by_key(|(date, _)| *date);

    let mut frame = FeatureFrame::new(rows.iter().map(|(date, _)| *date).collect())?;

    for (idx, name) in headers.iter().enumerate() {
        if idx == date_idx {
            continue;
        }
        match numeric_column(&rows, idx) {
            Some(values) => frame = frame.with_column(name.trim(), values)?,
            None => warn!(column = %name, "Skipping non-numeric column"),
        }
    }

    debug!(path = %path.display(), rows = frame.len(), columns = frame.n_columns(), "Loaded CSV frame");
    Ok(frame)
}

fn numeric_column(rows: &[(NaiveDate, StringRecord)], idx: usize) -> Option<Vec<Option<f64>>> {
    rows.iter()
        .map(|(_, record)| match record.get(idx).map(str::trim) {
            None | Some("") => Some(None),
            Some(cell) => cell.parse::<f64>().ok().map(|v| v.is_finite().then_some(v)),
        })
        .collect()
}

/// Read strictly typed records
pub fn load_records(path: &Path) -> Result<Vec<WeatherRecord>> {
    ensure_exists(path)?;
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<WeatherRecord>, csv::Error>>()?;
    debug!(path = %path.display(), rows = records.len(), "Loaded weather records");
    Ok(records)
}

pub fn write_records(path: &Path, records: &[WeatherRecord]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
