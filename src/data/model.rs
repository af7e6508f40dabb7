use std::fmt;

use chrono::{NaiveDateTime, Timelike};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the measurement table
// ---------------------------------------------------------------------------

/// Tokens read as "no value", mirroring the usual dataframe NA defaults.
pub const NA_TOKENS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A dynamically-typed cell. Everything is `Text` or `Missing` right after
/// loading; the cleaner turns the date column into `Timestamp` and the
/// pollutant columns into `Number`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Timestamp(NaiveDateTime),
    Missing,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Number(v) => write!(f, "{}", format_number(*v)),
            CellValue::Timestamp(t) => write!(f, "{}", t.format(DATETIME_FORMAT)),
            CellValue::Missing => Ok(()),
        }
    }
}

/// Format used when a timestamp column carries a time of day.
/// Sub-second parts are kept when present.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
/// Format used when every timestamp in a column falls on midnight.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Whole numbers keep a trailing `.0` so a re-read column stays float-looking.
pub fn format_number(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{v:.1}")
    } else {
        format!("{v}")
    }
}

impl CellValue {
    /// Build a cell from raw CSV text.
    pub fn from_raw(s: &str) -> Self {
        if s.is_empty() || NA_TOKENS.contains(&s) {
            CellValue::Missing
        } else {
            CellValue::Text(s.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// Numeric view of the cell. NaN counts as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Whether the cell is a timestamp with no time-of-day component.
    pub fn is_midnight(&self) -> bool {
        self.as_timestamp()
            .is_some_and(|t| t.num_seconds_from_midnight() == 0 && t.nanosecond() == 0)
    }
}

// ---------------------------------------------------------------------------
// MeasurementTable – the whole loaded CSV
// ---------------------------------------------------------------------------

/// Row-oriented table: `rows[i][j]` is the cell of row `i` in `columns[j]`.
/// Every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasurementTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl MeasurementTable {
    pub fn new(columns: Vec<String>) -> Self {
        MeasurementTable {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// All cells of one column, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows.iter().map(move |row| &row[idx])
    }

    /// Numeric view of a named column (`None` if the column does not exist).
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let idx = self.column_index(name)?;
        Some(self.column(idx).map(CellValue::as_f64).collect())
    }

    /// Narrow the table to `keep`, in that order. Names that are not columns
    /// are ignored, as are repeats.
    pub fn retain_columns(&mut self, keep: &[&str]) {
        let mut indices: Vec<usize> = Vec::with_capacity(keep.len());
        for name in keep {
            if let Some(idx) = self.column_index(name) {
                if !indices.contains(&idx) {
                    indices.push(idx);
                }
            }
        }

        self.columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        for row in &mut self.rows {
            let mut old = std::mem::take(row);
            *row = indices
                .iter()
                .map(|&i| std::mem::replace(&mut old[i], CellValue::Missing))
                .collect();
        }
    }
}
