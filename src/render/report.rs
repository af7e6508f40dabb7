use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::data::model::MeasurementTable;
use crate::data::resolver::ColumnMap;

// ---------------------------------------------------------------------------
// Summary figures
// ---------------------------------------------------------------------------

/// Figures written to `report.txt`. A `None` field means the column was not
/// resolved or is not in the table; a present column without numbers gives
/// `NaN` (serialized as `null`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AirQualityReport {
    pub rows: usize,
    pub mean_pm25: Option<f64>,
    pub mean_pm10: Option<f64>,
    pub aqi_min: Option<f64>,
    pub aqi_max: Option<f64>,
}

impl AirQualityReport {
    pub fn from_table(table: &MeasurementTable, columns: &ColumnMap) -> Self {
        let values = |name: Option<&str>| -> Option<Vec<f64>> {
            let col = table.numeric_column(name?)?;
            Some(col.into_iter().flatten().collect())
        };

        let aqi = values(columns.aqi.as_deref());
        AirQualityReport {
            rows: table.len(),
            mean_pm25: values(columns.pm25.as_deref()).map(|v| mean(&v)),
            mean_pm10: values(columns.pm10.as_deref()).map(|v| mean(&v)),
            aqi_min: aqi.as_ref().map(|v| extreme(v, f64::min)),
            aqi_max: aqi.as_ref().map(|v| extreme(v, f64::max)),
        }
    }

    /// The fixed-format text report.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("Simple Air Quality Report\n");
        out.push_str("=========================\n");
        let _ = writeln!(out, "Rows after cleaning: {}\n", self.rows);

        if let Some(v) = self.mean_pm25 {
            let _ = writeln!(out, "Mean PM2.5: {}", two_places(v));
        }
        if let Some(v) = self.mean_pm10 {
            let _ = writeln!(out, "Mean PM10: {}", two_places(v));
        }
        if let (Some(lo), Some(hi)) = (self.aqi_min, self.aqi_max) {
            let _ = writeln!(out, "AQI Min/Max: {} / {}", two_places(lo), two_places(hi));
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render())
            .with_context(|| format!("writing report {}", path.display()))
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing report")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
    }
}

/// Two decimals; a column without numbers shows `nan`.
fn two_places(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else {
        format!("{v:.2}")
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn extreme(values: &[f64], pick: fn(f64, f64) -> f64) -> f64 {
    values.iter().copied().reduce(pick).unwrap_or(f64::NAN)
}
