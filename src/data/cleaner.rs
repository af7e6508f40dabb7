use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::model::{CellValue, MeasurementTable};
use super::resolver::ColumnMap;
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Date parsing
// ---------------------------------------------------------------------------

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%Y%m%d",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Parse the date representations commonly found in exported sensor data.
/// Offsets (RFC 3339) are normalised to UTC wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Trimmed text as a float. NaN counts as non-numeric.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn to_timestamp(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::Timestamp(t) => CellValue::Timestamp(*t),
        CellValue::Text(s) => parse_timestamp(s).map_or(CellValue::Missing, CellValue::Timestamp),
        _ => CellValue::Missing,
    }
}

fn to_number(cell: &CellValue) -> CellValue {
    match cell {
        CellValue::Number(v) if !v.is_nan() => CellValue::Number(*v),
        CellValue::Text(s) => parse_number(s).map_or(CellValue::Missing, CellValue::Number),
        _ => CellValue::Missing,
    }
}

// ---------------------------------------------------------------------------
// Cleaning
// ---------------------------------------------------------------------------

/// Mean imputation applied to one pollutant column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImputedColumn {
    pub column: String,
    pub mean: f64,
    pub filled: usize,
}

/// What `clean` did to the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningSummary {
    pub rows_loaded: usize,
    pub rows_dropped: usize,
    pub imputed: Vec<ImputedColumn>,
    /// Pollutant columns without a single numeric value; left all-missing.
    pub empty_columns: Vec<String>,
}

/// Clean `table` in place.
///
/// 1. parse the date column (unparseable → missing)
/// 2. drop rows without a date, stable-sort by date
/// 3. keep only the date and resolved pollutant columns
/// 4. coerce pollutants to numbers and fill gaps with the column mean
pub fn clean(table: &mut MeasurementTable, columns: &ColumnMap) -> Result<CleaningSummary> {
    let date_idx = table
        .column_index(&columns.date)
        .ok_or_else(|| PipelineError::DateColumnMissing {
            requested: Some(columns.date.clone()),
        })?;

    let mut summary = CleaningSummary {
        rows_loaded: table.len(),
        ..Default::default()
    };

    for row in &mut table.rows {
        row[date_idx] = to_timestamp(&row[date_idx]);
    }

    table.rows.retain(|row| !row[date_idx].is_missing());
    table.rows.sort_by_key(|row| row[date_idx].as_timestamp());
    summary.rows_dropped = summary.rows_loaded - table.len();
    if summary.rows_dropped > 0 {
        log::info!(
            "dropped {} of {} rows with unparseable dates in '{}'",
            summary.rows_dropped,
            summary.rows_loaded,
            columns.date
        );
    }

    let mut keep: Vec<&str> = vec![columns.date.as_str()];
    keep.extend(columns.pollutants().into_iter().map(|(_, name)| name));
    table.retain_columns(&keep);

    // Index 0 is now the date column.
    for idx in 1..table.columns.len() {
        let name = table.columns[idx].clone();

        let mut sum = 0.0;
        let mut present = 0usize;
        for row in &mut table.rows {
            row[idx] = to_number(&row[idx]);
            if let Some(v) = row[idx].as_f64() {
                sum += v;
                present += 1;
            }
        }

        if present == 0 {
            log::warn!("column '{name}' has no numeric values; leaving it empty");
            summary.empty_columns.push(name);
            continue;
        }

        let mean = sum / present as f64;
        let mut filled = 0;
        for row in &mut table.rows {
            if row[idx].is_missing() {
                row[idx] = CellValue::Number(mean);
                filled += 1;
            }
        }
        log::debug!("'{name}': filled {filled} gaps with mean {mean:.4}");
        summary.imputed.push(ImputedColumn {
            column: name,
            mean,
            filled,
        });
    }

    Ok(summary)
}
