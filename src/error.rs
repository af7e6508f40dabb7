use std::path::PathBuf;

use thiserror::Error;

/// Conditions that stop the pipeline before any output is written.
///
/// The `Display` text is what gets shown to the user.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Could not read file: {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Could not read file: {} (no header row)", path.display())]
    EmptyInput { path: PathBuf },

    #[error(
        "Could not read file: {} (line {line}: expected {expected} fields, found {found})",
        path.display()
    )]
    MalformedRow {
        path: PathBuf,
        line: u64,
        expected: usize,
        found: usize,
    },

    /// `requested` is the name the user typed or configured, if any.
    #[error("ERROR: date column not found. Stopping.")]
    DateColumnMissing { requested: Option<String> },
}
