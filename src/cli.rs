use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};

/// Command-line flags. Anything given here wins over the config file.
#[derive(Parser, Debug, Default)]
#[command(
    author,
    version,
    about = "Clean an air-quality CSV, chart it and write a summary report",
    long_about = None
)]
pub struct Cli {
    /// Measurement CSV to clean (overwritten unless --output is given).
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// TOML config file.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Where to write the cleaned CSV.
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Directory for charts and the report.
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,

    #[arg(long)]
    pub date_column: Option<String>,

    #[arg(long)]
    pub pm25_column: Option<String>,

    #[arg(long)]
    pub pm10_column: Option<String>,

    #[arg(long)]
    pub aqi_column: Option<String>,

    /// Never ask for columns; unresolved fields are skipped.
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_prompt: bool,

    /// Also write the report figures as JSON.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub json_report: Option<PathBuf>,
}
