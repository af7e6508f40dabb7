use std::collections::HashSet;
use std::path::Path;

use csv::ReaderBuilder;

use super::model::{CellValue, MeasurementTable};
use crate::error::PipelineError;

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Read a measurement CSV with a header row.
///
/// Every cell comes back as [`CellValue::Text`] or [`CellValue::Missing`];
/// typing is left to the cleaner. Short rows are padded with `Missing`,
/// rows with more fields than the header make the whole file unreadable.
pub fn load_csv(path: &Path) -> Result<MeasurementTable, PipelineError> {
    let unreadable = |source: csv::Error| PipelineError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(unreadable)?;

    let raw_headers: Vec<String> = reader
        .headers()
        .map_err(unreadable)?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if raw_headers.is_empty() || raw_headers.iter().all(|h| h.is_empty()) {
        return Err(PipelineError::EmptyInput {
            path: path.to_path_buf(),
        });
    }

    let columns = dedupe_headers(raw_headers);
    let width = columns.len();
    let mut table = MeasurementTable::new(columns);

    for result in reader.records() {
        let record = result.map_err(unreadable)?;

        if record.len() > width {
            return Err(PipelineError::MalformedRow {
                path: path.to_path_buf(),
                line: record.position().map(|p| p.line()).unwrap_or(0),
                expected: width,
                found: record.len(),
            });
        }

        let mut row: Vec<CellValue> = record.iter().map(CellValue::from_raw).collect();
        row.resize(width, CellValue::Missing);
        table.rows.push(row);
    }

    log::info!(
        "loaded {} rows x {} columns from {}",
        table.len(),
        table.columns.len(),
        path.display()
    );
    Ok(table)
}

/// Make repeated header names unique: `a, a, a` → `a, a.1, a.2`.
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(headers.len());

    for name in headers {
        let mut candidate = name.clone();
        let mut n = 1;
        while seen.contains(&candidate) {
            candidate = format!("{name}.{n}");
            n += 1;
        }
        if candidate != name {
            log::debug!("renamed duplicate column '{name}' to '{candidate}'");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_text_and_missing_cells() {
        let file = csv_file("Date,PM2.5,AQI\n2024-01-01,12.5,NA\n2024-01-02,,80\n");

        let table = load_csv(file.path()).unwrap();

        assert_eq!(table.columns, vec!["Date", "PM2.5", "AQI"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][1], CellValue::Text("12.5".into()));
        assert!(table.rows[0][2].is_missing());
        assert!(table.rows[1][1].is_missing());
    }

    #[test]
    fn short_rows_are_padded() {
        let file = csv_file("Date,PM10,AQI\n2024-01-01,40\n");

        let table = load_csv(file.path()).unwrap();

        assert_eq!(table.rows[0].len(), 3);
        assert!(table.rows[0][2].is_missing());
    }

    #[test]
    fn long_rows_are_rejected() {
        let file = csv_file("Date,AQI\n2024-01-01,50\n2024-01-02,60,extra\n");

        let err = load_csv(file.path()).unwrap_err();

        match err {
            PipelineError::MalformedRow {
                line,
                expected,
                found,
                ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_headers_get_suffixes() {
        let file = csv_file("aqi,aqi,aqi\n1,2,3\n");

        let table = load_csv(file.path()).unwrap();

        assert_eq!(table.columns, vec!["aqi", "aqi.1", "aqi.2"]);
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.csv");

        let err = load_csv(&path).unwrap_err();

        assert!(matches!(err, PipelineError::Unreadable { .. }));
        assert!(err.to_string().starts_with("Could not read file:"));
    }

    #[test]
    fn empty_file_has_no_header() {
        let file = csv_file("");

        let err = load_csv(file.path()).unwrap_err();

        assert!(matches!(err, PipelineError::EmptyInput { .. }));
    }
}
