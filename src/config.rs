use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::Cli;
use crate::data::resolver::Field;

// ---------------------------------------------------------------------------
// Column overrides
// ---------------------------------------------------------------------------

/// Explicit column names that bypass auto-detection. `None` means "detect".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ColumnOverrides {
    pub date: Option<String>,
    pub pm25: Option<String>,
    pub pm10: Option<String>,
    pub aqi: Option<String>,
}

impl ColumnOverrides {
    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Date => self.date.as_deref(),
            Field::Pm25 => self.pm25.as_deref(),
            Field::Pm10 => self.pm10.as_deref(),
            Field::Aqi => self.aqi.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_INPUT: &str = "cleaned_pollution.csv";
pub const REPORT_FILE: &str = "report.txt";

/// Everything a run needs to know, independent of where it came from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// CSV to read.
    pub input: PathBuf,

    /// Cleaned CSV destination. Falls back to `input`.
    pub output: Option<PathBuf>,

    /// Directory for charts and the report.
    pub out_dir: PathBuf,

    /// Ask on the terminal for columns that could not be detected.
    pub interactive: bool,

    /// Optional JSON copy of the report.
    pub json_report: Option<PathBuf>,

    pub columns: ColumnOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT),
            output: None,
            out_dir: PathBuf::from("."),
            interactive: true,
            json_report: None,
            columns: ColumnOverrides::default(),
        }
    }
}

impl Config {
    /// Parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Defaults, then the `--config` file if any, then the remaining flags.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_cli(cli);
        Ok(config)
    }

    /// Overlay command-line flags on top of this config.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(input) = &cli.input {
            self.input = input.clone();
        }
        if let Some(output) = &cli.output {
            self.output = Some(output.clone());
        }
        if let Some(dir) = &cli.out_dir {
            self.out_dir = dir.clone();
        }
        if let Some(path) = &cli.json_report {
            self.json_report = Some(path.clone());
        }
        if cli.no_prompt {
            self.interactive = false;
        }

        let flags = [
            (&mut self.columns.date, &cli.date_column),
            (&mut self.columns.pm25, &cli.pm25_column),
            (&mut self.columns.pm10, &cli.pm10_column),
            (&mut self.columns.aqi, &cli.aqi_column),
        ];
        for (slot, flag) in flags {
            if flag.is_some() {
                *slot = flag.clone();
            }
        }
    }

    /// Where the cleaned CSV goes. Same as the input unless redirected.
    pub fn cleaned_csv_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| self.input.clone())
    }

    pub fn report_path(&self) -> PathBuf {
        self.out_dir.join(REPORT_FILE)
    }
}
