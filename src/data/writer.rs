use std::path::Path;

use anyhow::{Context, Result};

use super::model::{CellValue, MeasurementTable, DATETIME_FORMAT, DATE_FORMAT};

/// Write the table as CSV with a header row, replacing `path`.
///
/// Timestamp columns whose values all fall on midnight are written as plain
/// dates so a daily file keeps looking like a daily file.
pub fn write_csv(table: &MeasurementTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    writer
        .write_record(&table.columns)
        .context("writing CSV header")?;

    let date_only: Vec<bool> = (0..table.columns.len())
        .map(|idx| {
            let mut stamps = table
                .column(idx)
                .filter(|c| c.as_timestamp().is_some())
                .peekable();
            stamps.peek().is_some() && stamps.all(CellValue::is_midnight)
        })
        .collect();

    for (row_no, row) in table.rows.iter().enumerate() {
        let fields: Vec<String> = row
            .iter()
            .zip(&date_only)
            .map(|(cell, &date_only)| match cell {
                CellValue::Timestamp(t) if date_only => t.format(DATE_FORMAT).to_string(),
                CellValue::Timestamp(t) => t.format(DATETIME_FORMAT).to_string(),
                other => other.to_string(),
            })
            .collect();
        writer
            .write_record(&fields)
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }

    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    log::info!("wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cleaner::clean;
    use crate::data::loader::load_csv;
    use crate::data::resolver::ColumnMap;
    use chrono::NaiveDate;

    #[test]
    fn daily_dates_are_written_without_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut table = MeasurementTable::new(vec!["Date".into(), "Hour".into(), "AQI".into()]);
        table.rows.push(vec![
            CellValue::Timestamp(day.and_hms_opt(0, 0, 0).unwrap()),
            CellValue::Timestamp(day.and_hms_opt(7, 15, 0).unwrap()),
            CellValue::Number(42.0),
        ]);
        table.rows.push(vec![
            CellValue::Timestamp(day.and_hms_opt(0, 0, 0).unwrap()),
            CellValue::Missing,
            CellValue::Number(3.5),
        ]);

        write_csv(&table, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "Date,Hour,AQI\n2024-05-01,2024-05-01 07:15:00,42.0\n2024-05-01,,3.5\n"
        );
    }

    #[test]
    fn fractional_seconds_are_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut table = MeasurementTable::new(vec!["Time".into()]);
        table.rows.push(vec![CellValue::Timestamp(
            day.and_hms_milli_opt(7, 15, 0, 250).unwrap(),
        )]);
        table.rows.push(vec![CellValue::Timestamp(day.and_hms_opt(7, 16, 0).unwrap())]);

        write_csv(&table, &path).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Time\n2024-05-01 07:15:00.250\n2024-05-01 07:16:00\n"
        );
        let columns = ColumnMap {
            date: "Time".into(),
            ..Default::default()
        };
        let mut reread = load_csv(&path).unwrap();
        clean(&mut reread, &columns).unwrap();
        assert_eq!(reread, table);
    }

    #[test]
    fn cleaned_file_survives_a_second_pass_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pollution.csv");
        std::fs::write(
            &path,
            "Date,PM2.5,PM10\n2024-01-03,9,\n2024-01-01,,40\nnope,1,1\n2024-01-02,15,60\n",
        )
        .unwrap();
        let columns = ColumnMap {
            date: "Date".into(),
            pm25: Some("PM2.5".into()),
            pm10: Some("PM10".into()),
            aqi: None,
        };

        let mut first = load_csv(&path).unwrap();
        clean(&mut first, &columns).unwrap();
        write_csv(&first, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();

        let mut second = load_csv(&path).unwrap();
        clean(&mut second, &columns).unwrap();
        write_csv(&second, &path).unwrap();

        assert_eq!(second, first);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
    }
}
