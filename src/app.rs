use anyhow::Result;

use crate::config::Config;
use crate::data::cleaner::{clean, CleaningSummary};
use crate::data::loader::load_csv;
use crate::data::resolver::{resolve_columns, ColumnMap, ColumnPrompt};
use crate::data::writer::write_csv;
use crate::render::plot::{render_all, ChartOutcome};
use crate::render::report::AirQualityReport;

// ---------------------------------------------------------------------------
// Pipeline driver
// ---------------------------------------------------------------------------

pub struct AirQualityApp {
    pub config: Config,
}

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub columns: ColumnMap,
    pub summary: CleaningSummary,
    pub charts: Vec<ChartOutcome>,
    pub report: AirQualityReport,
}

impl AirQualityApp {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// load → resolve → clean → save CSV → charts → report.
    ///
    /// Nothing is written until the table has been loaded and the date column
    /// resolved; those failures come back as [`crate::error::PipelineError`].
    pub fn run(&self, prompt: &mut dyn ColumnPrompt) -> Result<RunOutcome> {
        let config = &self.config;

        let mut table = load_csv(&config.input)?;
        println!("Columns found: {:?}", table.columns);
        if config.interactive {
            println!("If auto-detection fails, you will manually type column names.\n");
        }

        let columns = resolve_columns(&table.columns, &config.columns, prompt)?;
        println!("\nUsing:");
        println!(" Date: {}", columns.date);
        println!(" PM2.5: {}", columns.pm25.as_deref().unwrap_or("None"));
        println!(" PM10: {}", columns.pm10.as_deref().unwrap_or("None"));
        println!(" AQI: {}", columns.aqi.as_deref().unwrap_or("None"));

        let summary = clean(&mut table, &columns)?;
        if table.is_empty() {
            log::warn!("no rows left after cleaning {}", config.input.display());
        }
        for name in &summary.empty_columns {
            println!("Warning: column '{name}' has NO numeric values.");
        }

        let csv_path = config.cleaned_csv_path();
        write_csv(&table, &csv_path)?;
        println!("Saved {}", csv_path.display());

        std::fs::create_dir_all(&config.out_dir)?;
        let charts = render_all(&table, &columns, &config.out_dir);
        for chart in &charts {
            match &chart.result {
                Ok(()) => println!("Saved {}", chart.path.display()),
                Err(e) => println!("Error while plotting {}: {e}", chart.chart),
            }
        }

        let report = AirQualityReport::from_table(&table, &columns);
        let report_path = config.report_path();
        report.write(&report_path)?;
        println!("Saved {}", report_path.display());

        if let Some(json_path) = &config.json_report {
            report.write_json(json_path)?;
            println!("Saved {}", json_path.display());
        }

        Ok(RunOutcome {
            columns,
            summary,
            charts,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::resolver::{Field, NoPrompt};
    use crate::error::PipelineError;
    use crate::prompt::TerminalPrompt;
    use std::io::Cursor;
    use std::path::Path;

    /// Answers every question with the same text.
    struct Answer(&'static str);

    impl ColumnPrompt for Answer {
        fn ask(&mut self, _field: Field, _columns: &[String]) -> Result<Option<String>> {
            Ok(Some(self.0.to_string()))
        }
    }

    fn config_in(dir: &Path, csv: &str) -> Config {
        let input = dir.join("pollution.csv");
        std::fs::write(&input, csv).unwrap();
        Config {
            input,
            out_dir: dir.join("out"),
            interactive: false,
            ..Default::default()
        }
    }

    #[test]
    fn three_valid_rows_produce_every_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(
            dir.path(),
            "Date,PM2.5,PM10,AQI\n\
             2024-02-03,30,60,120\n\
             2024-01-15,10,40,80\n\
             2024-02-01,20,,100\n",
        );
        let app = AirQualityApp::new(config.clone());

        let outcome = app.run(&mut NoPrompt).unwrap();

        let cleaned = std::fs::read_to_string(&config.input).unwrap();
        assert_eq!(
            cleaned,
            "Date,PM2.5,PM10,AQI\n\
             2024-01-15,10.0,40.0,80.0\n\
             2024-02-01,20.0,50.0,100.0\n\
             2024-02-03,30.0,60.0,120.0\n"
        );

        let report = std::fs::read_to_string(config.report_path()).unwrap();
        assert!(report.contains("Rows after cleaning: 3"));
        assert!(report.contains("Mean PM10: 50.00"));
        assert!(report.contains("AQI Min/Max: 80.00 / 120.00"));

        assert_eq!(outcome.charts.len(), 3);
        for chart in &outcome.charts {
            assert!(chart.result.is_ok(), "{}: {:?}", chart.chart, chart.result);
            assert!(chart.path.exists(), "{}", chart.path.display());
        }
        assert_eq!(outcome.summary.rows_dropped, 0);
    }

    #[test]
    fn unanswerable_prompt_skips_the_missing_pollutant() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(
            dir.path(),
            "Date,PM2.5,PM10
2024-01-02,12,30
2024-01-01,8,20
",
        );

        // Empty stdin: the AQI question gets no answer.
        let mut prompt = TerminalPrompt::from_reader(Cursor::new(""));
        let outcome = AirQualityApp::new(config.clone()).run(&mut prompt).unwrap();

        assert_eq!(outcome.columns.aqi, None);
        assert_eq!(
            std::fs::read_to_string(&config.input).unwrap(),
            "Date,PM2.5,PM10\n2024-01-01,8.0,20.0\n2024-01-02,12.0,30.0\n"
        );
        let report = std::fs::read_to_string(config.report_path()).unwrap();
        assert!(report.contains("Mean PM2.5: 10.00"));
        assert!(!report.contains("AQI"));
    }

    #[test]
    fn output_path_leaves_input_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let raw = "Time,aqi\n2024-01-02,5\n2024-01-01,\n";
        let mut config = config_in(dir.path(), raw);
        config.output = Some(dir.path().join("clean.csv"));
        config.json_report = Some(dir.path().join("report.json"));

        AirQualityApp::new(config.clone())
            .run(&mut NoPrompt)
            .unwrap();

        assert_eq!(std::fs::read_to_string(&config.input).unwrap(), raw);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("clean.csv")).unwrap(),
            "Time,aqi\n2024-01-01,5.0\n2024-01-02,5.0\n"
        );
        assert!(dir.path().join("report.json").exists());
    }

    #[test]
    fn missing_date_column_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let raw = "Station,PM10\nA,40\n";
        let config = config_in(dir.path(), raw);

        let err = AirQualityApp::new(config.clone())
            .run(&mut Answer(""))
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::DateColumnMissing { .. })
        ));
        assert_eq!(std::fs::read_to_string(&config.input).unwrap(), raw);
        assert!(!config.out_dir.exists());
        assert!(!config.report_path().exists());
    }

    #[test]
    fn unreadable_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            input: dir.path().join("absent.csv"),
            out_dir: dir.path().join("out"),
            ..Default::default()
        };

        let err = AirQualityApp::new(config.clone())
            .run(&mut NoPrompt)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Unreadable { .. })
        ));
        assert!(!config.out_dir.exists());
        assert!(!config.input.exists());
    }
}
