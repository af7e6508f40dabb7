use std::fmt;

use serde::Serialize;

use crate::config::ColumnOverrides;
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// Target fields
// ---------------------------------------------------------------------------

/// The columns the pipeline knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Date,
    Pm25,
    Pm10,
    Aqi,
}

impl Field {
    /// Lowercase substrings to look for, highest priority first.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            Field::Date => &["date", "time", "timestamp"],
            Field::Pm25 => &["pm2.5", "pm25", "pm_2_5", "pm2"],
            Field::Pm10 => &["pm10", "pm_10"],
            Field::Aqi => &["aqi", "air quality", "air_quality"],
        }
    }

    pub fn prompt_text(self) -> &'static str {
        match self {
            Field::Date => "Enter date/time column",
            Field::Pm25 => "Enter PM2.5 column (or leave blank)",
            Field::Pm10 => "Enter PM10 column (or leave blank)",
            Field::Aqi => "Enter AQI column (or leave blank)",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Date => write!(f, "Date"),
            Field::Pm25 => write!(f, "PM2.5"),
            Field::Pm10 => write!(f, "PM10"),
            Field::Aqi => write!(f, "AQI"),
        }
    }
}

// ---------------------------------------------------------------------------
// Heuristic matching
// ---------------------------------------------------------------------------

/// First column whose lowercased name contains one of `candidates`.
///
/// Candidates are tried in order; for each candidate the columns are scanned
/// in their original order. So `["pm10", "pm_10"]` prefers any column
/// containing `pm10` over an earlier column containing only `pm_10`.
pub fn pick_column<'a>(columns: &'a [String], candidates: &[&str]) -> Option<&'a str> {
    let lowered: Vec<String> = columns.iter().map(|c| c.to_lowercase()).collect();
    candidates.iter().find_map(|cand| {
        lowered
            .iter()
            .position(|name| name.contains(cand))
            .map(|i| columns[i].as_str())
    })
}

// ---------------------------------------------------------------------------
// Resolved mapping
// ---------------------------------------------------------------------------

/// The columns chosen for each field. Only the date column is mandatory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    pub date: String,
    pub pm25: Option<String>,
    pub pm10: Option<String>,
    pub aqi: Option<String>,
}

impl ColumnMap {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Date => Some(self.date.as_str()),
            Field::Pm25 => self.pm25.as_deref(),
            Field::Pm10 => self.pm10.as_deref(),
            Field::Aqi => self.aqi.as_deref(),
        }
    }

    /// Resolved pollutant columns in PM2.5, PM10, AQI order.
    pub fn pollutants(&self) -> Vec<(Field, &str)> {
        [Field::Pm25, Field::Pm10, Field::Aqi]
            .into_iter()
            .filter_map(|f| self.get(f).map(|name| (f, name)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Fallback when auto-detection fails
// ---------------------------------------------------------------------------

/// Asked once for any field that neither the config nor the heuristics
/// resolved. `Ok(None)` or a blank answer means "not available".
pub trait ColumnPrompt {
    fn ask(&mut self, field: Field, columns: &[String]) -> anyhow::Result<Option<String>>;
}

/// Never asks; every unresolved field stays unresolved.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl ColumnPrompt for NoPrompt {
    fn ask(&mut self, _field: Field, _columns: &[String]) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}

/// Resolve every field against the table's columns.
///
/// Order per field: configured override, then [`pick_column`], then the
/// prompt. All four fields are settled before the date column is checked; a
/// date column that is unresolved or names a column that does not exist is
/// fatal. Pollutant names that do not exist are dropped.
pub fn resolve_columns(
    columns: &[String],
    overrides: &ColumnOverrides,
    prompt: &mut dyn ColumnPrompt,
) -> anyhow::Result<ColumnMap> {
    let date = choose(Field::Date, columns, overrides, prompt)?;
    let pm25 = choose_pollutant(Field::Pm25, columns, overrides, prompt)?;
    let pm10 = choose_pollutant(Field::Pm10, columns, overrides, prompt)?;
    let aqi = choose_pollutant(Field::Aqi, columns, overrides, prompt)?;

    let date = match date {
        Some(name) if contains(columns, &name) => name,
        requested => return Err(PipelineError::DateColumnMissing { requested }.into()),
    };

    Ok(ColumnMap {
        date,
        pm25,
        pm10,
        aqi,
    })
}

/// The name picked for `field`, whether or not the file has it.
fn choose(
    field: Field,
    columns: &[String],
    overrides: &ColumnOverrides,
    prompt: &mut dyn ColumnPrompt,
) -> anyhow::Result<Option<String>> {
    if let Some(name) = non_blank(overrides.get(field)) {
        log::debug!("{field}: using configured column '{name}'");
        return Ok(Some(name));
    }
    if let Some(name) = pick_column(columns, field.candidates()) {
        log::debug!("{field}: auto-detected column '{name}'");
        return Ok(Some(name.to_string()));
    }
    Ok(non_blank(prompt.ask(field, columns)?.as_deref()))
}

fn choose_pollutant(
    field: Field,
    columns: &[String],
    overrides: &ColumnOverrides,
    prompt: &mut dyn ColumnPrompt,
) -> anyhow::Result<Option<String>> {
    Ok(match choose(field, columns, overrides, prompt)? {
        Some(name) if contains(columns, &name) => Some(name),
        Some(name) => {
            log::warn!("{field} column '{name}' not in file; skipping {field}");
            None
        }
        None => {
            log::info!("{field} not available");
            None
        }
    })
}

fn contains(columns: &[String], name: &str) -> bool {
    columns.iter().any(|c| c == name)
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}
