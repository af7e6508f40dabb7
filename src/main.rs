mod app;
mod cli;
mod color;
mod config;
mod data;
mod error;
mod prompt;
mod render;

use anyhow::Result;
use clap::Parser;

use app::AirQualityApp;
use cli::Cli;
use config::Config;
use data::resolver::{ColumnPrompt, NoPrompt};
use error::PipelineError;
use prompt::TerminalPrompt;

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_cli(&cli)?;
    log::debug!("{config:?}");

    let mut prompt: Box<dyn ColumnPrompt> = if config.interactive {
        Box::new(TerminalPrompt::default())
    } else {
        Box::new(NoPrompt)
    };

    match AirQualityApp::new(config).run(prompt.as_mut()) {
        Ok(outcome) => {
            log::info!(
                "columns {:?}; {} rows kept, {} dropped; {} charts; {} columns imputed",
                outcome.columns,
                outcome.report.rows,
                outcome.summary.rows_dropped,
                outcome.charts.len(),
                outcome.summary.imputed.len()
            );
            println!("Done!");
            Ok(())
        }
        // Fatal input problems are reported, not treated as a crash.
        Err(err) => match err.downcast_ref::<PipelineError>() {
            Some(fatal) => {
                log::debug!("stopping: {err:#}");
                println!("{fatal}");
                Ok(())
            }
            None => Err(err),
        },
    }
}
